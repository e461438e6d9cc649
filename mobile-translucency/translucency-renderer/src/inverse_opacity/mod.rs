//! Inverse opacity pass: renders translucent coverage into scene colour alpha for scene captures.
//! Self-contained: opens and closes its own render pass and must not be nested.

use translucency_rhi::{
    ColorAttachment, DepthStencilAccess, DepthStencilAttachment, DepthStencilTargetActions, RenderPassDescriptor,
    RenderTargetActions, ResourceAccess,
};

use crate::downsample::FAR_DEPTH;
use crate::error::TranslucencyResult;
use crate::frame::FrameContext;
use crate::mesh_pass::MeshPass;
use crate::sequencer::should_render_translucency;
use crate::uniforms::SceneUniformBuffers;
use crate::view::ViewInfo;

pub const INVERSE_OPACITY_PASS_LABEL: &str = "RenderInverseOpacity";

#[derive(Debug, Default)]
pub struct InverseOpacityPass;

impl InverseOpacityPass {
    pub fn new() -> Self {
        Self
    }

    /// Returns whether any inverse opacity geometry was drawn. Scene colour is readable on return.
    pub fn encode(&self, ctx: &mut FrameContext<'_>, uniforms: &mut SceneUniformBuffers, view: &ViewInfo) -> TranslucencyResult<bool> {
        ctx.require_outside_render_pass("inverse opacity")?;
        ctx.debug_group("RenderInverseOpacity", |ctx| {
            let scene_color = ctx.targets.alloc_scene_color()?;
            let scene_depth = ctx.targets.scene_depth()?;
            let msaa = scene_color.is_multisampled();

            ctx.transition(scene_color.surface, ResourceAccess::Writable)?;
            ctx.transition(scene_depth, ResourceAccess::Writable)?;
            if let Some(resolve) = scene_color.resolve {
                ctx.transition(resolve, ResourceAccess::Writable)?;
            }

            uniforms.sync_view(ctx.encoder, view)?;

            ctx.begin_render_pass(RenderPassDescriptor {
                label: INVERSE_OPACITY_PASS_LABEL,
                color_attachments: vec![ColorAttachment {
                    texture: scene_color.surface,
                    resolve_target: scene_color.resolve,
                    actions: if msaa { RenderTargetActions::CLEAR_RESOLVE } else { RenderTargetActions::CLEAR_STORE },
                    clear_value: ctx.settings.config.inverse_opacity_clear,
                }],
                depth_stencil_attachment: Some(DepthStencilAttachment {
                    texture: scene_depth,
                    actions: DepthStencilTargetActions::CLEAR_DEPTH_STENCIL_DONT_STORE,
                    access: DepthStencilAccess::DepthReadStencilRead,
                    clear_depth: FAR_DEPTH,
                    clear_stencil: 0,
                }),
            })?;

            let mut dirty = false;
            if should_render_translucency(ctx.mesh_passes, &ctx.family.views, MeshPass::TranslucencyAll) {
                let viewport = ctx.family.translucent_viewport_rect(view);
                ctx.encoder.set_viewport(viewport.viewport())?;
                ctx.mesh_passes.dispatch_draws(MeshPass::MobileInverseOpacity, view.id, ctx.encoder)?;
                dirty |= ctx.mesh_passes.has_any_draws(MeshPass::MobileInverseOpacity, view.id);
            }

            ctx.end_render_pass()?;
            ctx.transition(scene_color.texture(), ResourceAccess::Readable)?;
            log::debug!("inverse opacity for view {:?}: dirty={}", view.id, dirty);
            Ok(dirty)
        })
    }
}
