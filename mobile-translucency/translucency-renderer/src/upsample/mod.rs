//! Upsample pass: composites the reduced-resolution translucency onto full-resolution scene colour
//! with a nearest-depth-neighbour reconstruction.

use translucency_rhi::{ColorAttachment, RectangleDraw, RenderPassDescriptor, RenderTargetActions, ResourceAccess};

use crate::downsample::DownsampledTargets;
use crate::error::{TranslucencyError, TranslucencyResult};
use crate::frame::FrameContext;
use crate::resources::{downsampled_extent, TargetSemantic};
use crate::shaders::{draw_screen_pass, ScreenPassShader, UpsamplingParameters};
use crate::view::IntRect;

pub const UPSAMPLE_PASS_LABEL: &str = "UpsampleTranslucency";

#[derive(Debug, Default)]
pub struct UpsamplePass;

impl UpsamplePass {
    pub fn new() -> Self {
        Self
    }

    /// Composite `low_res` over scene colour inside the full-resolution `view_rect`.
    /// The scene colour pass is left open on return.
    pub fn encode(
        &self,
        ctx: &mut FrameContext<'_>,
        low_res: &DownsampledTargets,
        view_rect: IntRect,
        scale: f32,
    ) -> TranslucencyResult<()> {
        ctx.require_outside_render_pass("upsample")?;
        self.check_resolution(ctx, low_res, scale)?;

        ctx.transition(low_res.depth, ResourceAccess::Readable)?;
        ctx.transition(low_res.color, ResourceAccess::Readable)?;
        let scene_color = ctx.targets.alloc_scene_color()?;
        ctx.transition(scene_color.surface, ResourceAccess::Writable)?;

        ctx.begin_render_pass(RenderPassDescriptor {
            label: UPSAMPLE_PASS_LABEL,
            color_attachments: vec![ColorAttachment {
                texture: scene_color.surface,
                resolve_target: None,
                actions: RenderTargetActions::LOAD_STORE,
                clear_value: ctx.settings.config.separate_translucency_clear,
            }],
            depth_stencil_attachment: None,
        })?;

        let source = low_res.view_rect;
        let rect = RectangleDraw {
            dest_x: 0.0,
            dest_y: 0.0,
            dest_width: view_rect.width() as f32,
            dest_height: view_rect.height() as f32,
            source_u: source.min_x as f32,
            source_v: source.min_y as f32,
            source_width: source.width() as f32,
            source_height: source.height() as f32,
            target_size: view_rect.size(),
            texture_size: low_res.extent,
        };
        let shader = ScreenPassShader::NearestDepthNeighborUpsampling(UpsamplingParameters {
            low_res_color: low_res.color,
            low_res_depth: low_res.depth,
        });
        ctx.debug_group("UpsampleTranslucency", |ctx| draw_screen_pass(ctx.encoder, &shader, view_rect, &rect))
    }

    /// Both reduced-resolution buffers must still have the size the downsample used for this scale.
    fn check_resolution(&self, ctx: &FrameContext<'_>, low_res: &DownsampledTargets, scale: f32) -> TranslucencyResult<()> {
        let expected = downsampled_extent(ctx.targets.buffer_size(), scale);
        let pool = ctx.targets.pool();
        let checks = [
            (TargetSemantic::SeparateTranslucency, pool.desc(low_res.color)?.extent),
            (TargetSemantic::DownsampledTranslucencyDepth, pool.desc(low_res.depth)?.extent),
        ];
        for (semantic, actual) in checks {
            if actual != expected || low_res.extent != expected {
                log::error!("{} is {:?}, upsample expects {:?}", semantic.name(), actual, expected);
                return Err(TranslucencyError::ResolutionMismatch { name: semantic.name(), expected, actual });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrameCapabilities, FrameSettings, TranslucencyConfig};
    use crate::downsample::DownsamplePass;
    use crate::frame::NoMeshDraws;
    use crate::resources::SceneRenderTargets;
    use crate::view::ViewFamily;
    use translucency_rhi::{CommandEncoder, Extent2d, RecordingEncoder};

    fn with_ctx<R>(buffer: Extent2d, f: impl FnOnce(&mut FrameContext<'_>) -> R) -> (RecordingEncoder, R) {
        let config = TranslucencyConfig::default();
        let settings = FrameSettings::resolve(&config, FrameCapabilities::default()).unwrap();
        let family = ViewFamily::new(buffer);
        let mut targets = SceneRenderTargets::new(&config, buffer);
        let mut enc = RecordingEncoder::new();
        let out = f(&mut FrameContext {
            encoder: &mut enc,
            targets: &mut targets,
            mesh_passes: &NoMeshDraws,
            settings: &settings,
            family: &family,
        });
        (enc, out)
    }

    #[test]
    fn source_is_low_res_rect_and_dest_is_full_rect() {
        let buffer = Extent2d::new(1024, 768);
        let (enc, result) = with_ctx(buffer, |ctx| {
            let low_res = DownsamplePass::new().encode(ctx, IntRect::from_extent(buffer), 0.5)?;
            ctx.end_render_pass()?;
            UpsamplePass::new().encode(ctx, &low_res, IntRect::from_extent(buffer), 0.5)
        });
        result.unwrap();
        assert_eq!(enc.active_render_pass(), Some(UPSAMPLE_PASS_LABEL));

        let upsample = enc.rectangles()[1];
        assert_eq!((upsample.source_width, upsample.source_height), (512.0, 384.0));
        assert_eq!((upsample.dest_width, upsample.dest_height), (1024.0, 768.0));
        assert_eq!(upsample.texture_size, Extent2d::new(512, 384));
        assert_eq!(enc.render_passes()[1].color_attachments[0].actions, RenderTargetActions::LOAD_STORE);
    }

    #[test]
    fn mismatched_scale_is_rejected() {
        let buffer = Extent2d::new(1024, 768);
        let (enc, result) = with_ctx(buffer, |ctx| {
            let low_res = DownsamplePass::new().encode(ctx, IntRect::from_extent(buffer), 0.5)?;
            ctx.end_render_pass()?;
            UpsamplePass::new().encode(ctx, &low_res, IntRect::from_extent(buffer), 0.25)
        });
        assert_eq!(
            result,
            Err(TranslucencyError::ResolutionMismatch {
                name: "separate_translucency",
                expected: Extent2d::new(256, 192),
                actual: Extent2d::new(512, 384),
            })
        );
        assert!(!enc.is_inside_render_pass());
    }

    #[test]
    fn refuses_to_nest_inside_open_pass() {
        let buffer = Extent2d::new(64, 64);
        let (_, result) = with_ctx(buffer, |ctx| {
            let low_res = DownsamplePass::new().encode(ctx, IntRect::from_extent(buffer), 0.5)?;
            UpsamplePass::new().encode(ctx, &low_res, IntRect::from_extent(buffer), 0.5)
        });
        assert!(matches!(result, Err(TranslucencyError::NestedRenderPass { stage: "upsample", .. })));
    }
}
