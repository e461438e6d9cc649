//! Scene alpha copy: gives materials that read scene colour a texture that is not bound for writing.

use translucency_rhi::{
    ColorAttachment, RectangleDraw, RenderPassDescriptor, RenderTargetActions, ResolveRect, ResourceAccess, TextureHandle,
};

use crate::error::TranslucencyResult;
use crate::frame::FrameContext;
use crate::shaders::{draw_screen_pass, SceneTextureParameters, SceneTextureSetupMode, ScreenPassShader};
use crate::view::{IntRect, ViewInfo};

pub const SCENE_ALPHA_COPY_PASS_LABEL: &str = "CopySceneAlpha";

#[derive(Debug, Default)]
pub struct SceneAlphaCopyPass;

impl SceneAlphaCopyPass {
    pub fn new() -> Self {
        Self
    }

    /// Resolve scene colour, then copy it over the whole buffer into the scene alpha copy target.
    /// Returns the copy, left readable.
    pub fn encode(&self, ctx: &mut FrameContext<'_>, view: &ViewInfo) -> TranslucencyResult<TextureHandle> {
        ctx.require_outside_render_pass("scene alpha copy")?;
        ctx.debug_group("CopySceneAlpha", |ctx| {
            let buffer_size = ctx.targets.buffer_size();
            let scene_color = ctx.targets.alloc_scene_color()?;
            if let Some(resolve) = scene_color.resolve {
                let family = ctx.family.buffer_size;
                ctx.encoder.copy_to_resolve_target(
                    scene_color.surface,
                    resolve,
                    ResolveRect { x1: 0, y1: 0, x2: family.width as i32, y2: family.height as i32 },
                )?;
            }

            let scene_depth = ctx.targets.scene_depth()?;
            let copy = ctx.targets.scene_alpha_copy()?;
            ctx.transition(scene_color.texture(), ResourceAccess::Readable)?;
            ctx.transition(scene_depth, ResourceAccess::Readable)?;
            ctx.transition(copy, ResourceAccess::Writable)?;

            ctx.begin_render_pass(RenderPassDescriptor {
                label: SCENE_ALPHA_COPY_PASS_LABEL,
                color_attachments: vec![ColorAttachment {
                    texture: copy,
                    resolve_target: None,
                    actions: RenderTargetActions::DONT_LOAD_STORE,
                    clear_value: ctx.settings.config.separate_translucency_clear,
                }],
                depth_stencil_attachment: None,
            })?;

            let shader = ScreenPassShader::CopySceneAlpha(SceneTextureParameters {
                scene_color: scene_color.texture(),
                scene_depth,
                feature_level: view.feature_level,
                setup_mode: SceneTextureSetupMode::All,
            });
            let (width, height) = (buffer_size.width as f32, buffer_size.height as f32);
            let rect = RectangleDraw {
                dest_x: 0.0,
                dest_y: 0.0,
                dest_width: width,
                dest_height: height,
                source_u: 0.0,
                source_v: 0.0,
                source_width: width,
                source_height: height,
                target_size: buffer_size,
                texture_size: buffer_size,
            };
            draw_screen_pass(ctx.encoder, &shader, IntRect::from_extent(buffer_size), &rect)?;

            ctx.end_render_pass()?;
            ctx.transition(copy, ResourceAccess::Readable)?;
            log::debug!("scene alpha copy for view {:?}: {}x{}", view.id, buffer_size.width, buffer_size.height);
            Ok(copy)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrameCapabilities, FrameSettings, TranslucencyConfig};
    use crate::frame::NoMeshDraws;
    use crate::resources::SceneRenderTargets;
    use crate::view::{ViewFamily, ViewId, ViewMatrices};
    use translucency_rhi::{Extent2d, RecordedCommand, RecordingEncoder};

    fn run(config: &TranslucencyConfig) -> (RecordingEncoder, TextureHandle) {
        let buffer = Extent2d::new(320, 200);
        let view = ViewInfo::new(ViewId(0), IntRect::from_extent(buffer), buffer, ViewMatrices::default());
        let family = ViewFamily::new(buffer).with_view(view);
        let settings = FrameSettings::resolve(config, FrameCapabilities::default()).unwrap();
        let mut targets = SceneRenderTargets::new(config, buffer);
        let mut enc = RecordingEncoder::new();
        let copy = SceneAlphaCopyPass::new()
            .encode(
                &mut FrameContext {
                    encoder: &mut enc,
                    targets: &mut targets,
                    mesh_passes: &NoMeshDraws,
                    settings: &settings,
                    family: &family,
                },
                &family.views[0],
            )
            .unwrap();
        (enc, copy)
    }

    #[test]
    fn single_sample_skips_resolve_and_copies_full_buffer() {
        let (enc, copy) = run(&TranslucencyConfig::default());
        assert!(!enc.commands().iter().any(|c| matches!(c, RecordedCommand::CopyToResolveTarget { .. })));
        assert_eq!(enc.render_pass_labels(), vec![SCENE_ALPHA_COPY_PASS_LABEL]);
        let rect = enc.rectangles()[0];
        assert_eq!((rect.dest_width, rect.dest_height, rect.source_width, rect.source_height), (320.0, 200.0, 320.0, 200.0));
        assert_eq!(enc.transitions().last(), Some(&(copy, ResourceAccess::Readable)));
        let binds = enc.commands().iter().filter(|c| matches!(c, RecordedCommand::BindTexture { .. })).count();
        assert_eq!(binds, 2);
    }

    #[test]
    fn msaa_resolves_over_family_rect_first() {
        let (enc, _) = run(&TranslucencyConfig { msaa_samples: 2, ..Default::default() });
        assert!(matches!(
            enc.commands().iter().find(|c| !matches!(c, RecordedCommand::PushDebugGroup(_))),
            Some(RecordedCommand::CopyToResolveTarget { rect: ResolveRect { x1: 0, y1: 0, x2: 320, y2: 200 }, .. })
        ));
    }
}
