//! Pass sequencer: picks the translucency pass and the resolution path for the frame and drives
//! the downsample, draw and upsample stages for every view.

use crate::config::FrameSettings;
use crate::downsample::DownsamplePass;
use crate::error::TranslucencyResult;
use crate::frame::FrameContext;
use crate::mesh_pass::{MeshPass, MeshPassDispatch};
use crate::resources::downsampled_extent;
use crate::translucency_draw::TranslucencyDrawStage;
use crate::uniforms::SceneUniformBuffers;
use crate::upsample::UpsamplePass;
use crate::view::{ViewFamily, ViewInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranslucencyPass {
    AllTranslucency,
    /// Standard translucency only; after-DOF translucency is left to post processing.
    StandardTranslucency,
}

impl TranslucencyPass {
    pub fn mesh_pass(self) -> MeshPass {
        match self {
            Self::AllTranslucency => MeshPass::TranslucencyAll,
            Self::StandardTranslucency => MeshPass::TranslucencyStandard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranslucencyPlan {
    pub pass: TranslucencyPass,
    /// Render at reduced resolution and upsample. Only taken when frame buffer fetch is unavailable.
    pub use_downsample_pipeline: bool,
    pub downsampling_scale: f32,
}

impl TranslucencyPlan {
    pub fn resolve(settings: &FrameSettings) -> Self {
        let pass = if settings.config.allow_translucency_after_dof {
            TranslucencyPass::StandardTranslucency
        } else {
            TranslucencyPass::AllTranslucency
        };
        Self {
            pass,
            use_downsample_pipeline: !settings.capabilities.supports_frame_buffer_fetch,
            downsampling_scale: settings.downsampling_scale(),
        }
    }
}

/// True when any view that renders this frame has queued draws for `pass`.
pub fn should_render_translucency(mesh_passes: &dyn MeshPassDispatch, views: &[ViewInfo], pass: MeshPass) -> bool {
    views.iter().any(|view| view.should_render_view() && mesh_passes.has_any_draws(pass, view.id))
}

#[derive(Debug, Default)]
pub struct PassSequencer {
    downsample: DownsamplePass,
    draw: TranslucencyDrawStage,
    upsample: UpsamplePass,
}

impl PassSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record translucency for every view of the family. Returns false, having recorded nothing,
    /// when no rendered view has translucent draws.
    ///
    /// Full-resolution path: the caller's scene colour + depth pass must be open and stays open.
    /// Downsample path: the caller's pass is closed first, and the last upsample pass is left open.
    pub fn encode(&self, ctx: &mut FrameContext<'_>, uniforms: &mut SceneUniformBuffers) -> TranslucencyResult<bool> {
        let plan = TranslucencyPlan::resolve(ctx.settings);
        let mesh_pass = plan.pass.mesh_pass();
        let family = ctx.family;
        if family.views.is_empty() {
            log::warn!("render_translucency called with no views");
            return Ok(false);
        }
        if !should_render_translucency(ctx.mesh_passes, &family.views, mesh_pass) {
            log::trace!("no {:?} draws, skipping translucency", plan.pass);
            return Ok(false);
        }
        log::debug!(
            "translucency: {:?}, {} path, scale {}",
            plan.pass,
            if plan.use_downsample_pipeline { "downsample" } else { "full resolution" },
            plan.downsampling_scale
        );

        // Groups open outside any pass so they may close inside the upsample pass.
        if plan.use_downsample_pipeline {
            ctx.end_render_pass()?;
        }
        ctx.debug_group("Translucency", |ctx| {
            for (index, view) in family.views.iter().enumerate() {
                if plan.use_downsample_pipeline && view.should_render_view() {
                    // the previous view's upsample pass
                    ctx.end_render_pass()?;
                }
                if family.views.len() > 1 {
                    let label = format!("View{index}");
                    ctx.debug_group(&label, |ctx| self.encode_view(ctx, uniforms, family, view, &plan))?;
                } else {
                    self.encode_view(ctx, uniforms, family, view, &plan)?;
                }
            }
            Ok(true)
        })
    }

    fn encode_view(
        &self,
        ctx: &mut FrameContext<'_>,
        uniforms: &mut SceneUniformBuffers,
        family: &ViewFamily,
        view: &ViewInfo,
        plan: &TranslucencyPlan,
    ) -> TranslucencyResult<()> {
        if !view.should_render_view() {
            log::trace!("view {:?} not rendered", view.id);
            return Ok(());
        }
        let mesh_pass = plan.pass.mesh_pass();
        let debug_view_shaders = ctx.settings.capabilities.debug_view_shaders;

        if !plan.use_downsample_pipeline {
            ctx.require_inside_render_pass("translucency draw")?;
            if !debug_view_shaders {
                uniforms.sync_view(ctx.encoder, view)?;
            }
            return self.draw.encode(ctx, view, mesh_pass, family.translucent_viewport_rect(view));
        }

        // Each view downsamples and composites its own region, multi-view or not.
        let viewport = view.view_rect;
        let scale = plan.downsampling_scale;
        if !debug_view_shaders {
            uniforms.sync_view(ctx.encoder, view)?;
        }
        let scaled_rect = viewport.scale(scale);
        let scaled_uniforms = view.scaled_uniforms(downsampled_extent(ctx.targets.buffer_size(), scale), scaled_rect);
        let low_res = uniforms.with_view_override(ctx, |ctx| &mut *ctx.encoder, view, &scaled_uniforms, |ctx| {
            let low_res = self.downsample.encode(ctx, viewport, scale)?;
            self.draw.encode(ctx, view, mesh_pass, low_res.view_rect)?;
            ctx.end_render_pass()?;
            Ok(low_res)
        })?;
        self.upsample.encode(ctx, &low_res, viewport, scale)
    }
}
