//! Downsample pass: point-resamples full-resolution depth into the separate translucency depth buffer
//! and opens the reduced-resolution render pass the translucency draw records into.

use translucency_rhi::{
    ColorAttachment, DepthStencilAccess, DepthStencilAttachment, DepthStencilTargetActions, Extent2d, RectangleDraw,
    RenderPassDescriptor, RenderTargetActions, ResourceAccess, TextureHandle,
};

use crate::error::TranslucencyResult;
use crate::frame::FrameContext;
use crate::resources::downsampled_extent;
use crate::shaders::{draw_screen_pass, DepthSource, ScreenPassShader};
use crate::view::IntRect;

pub const DOWNSAMPLE_PASS_LABEL: &str = "DownsampleDepthAndSeparatePass";

/// Far plane under reversed Z.
pub const FAR_DEPTH: f32 = 0.0;

/// The reduced-resolution target set for one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownsampledTargets {
    pub color: TextureHandle,
    pub depth: TextureHandle,
    pub extent: Extent2d,
    /// Scaled view rectangle inside `extent`.
    pub view_rect: IntRect,
}

#[derive(Debug, Default)]
pub struct DownsamplePass;

impl DownsamplePass {
    pub fn new() -> Self {
        Self
    }

    /// Record the depth downsample for the full-resolution `view_rect`. Returns with the
    /// reduced-resolution pass still open; the caller closes it after drawing translucency.
    pub fn encode(&self, ctx: &mut FrameContext<'_>, view_rect: IntRect, scale: f32) -> TranslucencyResult<DownsampledTargets> {
        ctx.require_outside_render_pass("downsample")?;

        let buffer_size = ctx.targets.buffer_size();
        let extent = downsampled_extent(buffer_size, scale);
        let scaled_rect = view_rect.scale(scale);
        let color = ctx.targets.separate_translucency(extent)?;
        let depth = ctx.targets.downsampled_translucency_depth(extent)?;

        let source = if ctx.settings.capabilities.supports_depth_fetch {
            DepthSource::SceneDepth(ctx.targets.scene_depth()?)
        } else {
            DepthSource::SceneColorAlpha(ctx.targets.alloc_scene_color()?.texture())
        };
        let (DepthSource::SceneDepth(source_texture) | DepthSource::SceneColorAlpha(source_texture)) = source;

        ctx.transition(source_texture, ResourceAccess::Readable)?;
        ctx.transition(color, ResourceAccess::Writable)?;
        ctx.transition(depth, ResourceAccess::Writable)?;

        ctx.begin_render_pass(RenderPassDescriptor {
            label: DOWNSAMPLE_PASS_LABEL,
            color_attachments: vec![ColorAttachment {
                texture: color,
                resolve_target: None,
                actions: RenderTargetActions::CLEAR_STORE,
                clear_value: ctx.settings.config.separate_translucency_clear,
            }],
            depth_stencil_attachment: Some(DepthStencilAttachment {
                texture: depth,
                actions: DepthStencilTargetActions::CLEAR_DEPTH_STENCIL_STORE,
                access: DepthStencilAccess::DepthWriteStencilWrite,
                clear_depth: FAR_DEPTH,
                clear_stencil: 0,
            }),
        })?;

        ctx.debug_group("DownsampleDepth", |ctx| {
            let rect = RectangleDraw {
                dest_x: 0.0,
                dest_y: 0.0,
                dest_width: scaled_rect.width() as f32,
                dest_height: scaled_rect.height() as f32,
                source_u: view_rect.min_x as f32,
                source_v: view_rect.min_y as f32,
                source_width: view_rect.width() as f32,
                source_height: view_rect.height() as f32,
                target_size: scaled_rect.size(),
                texture_size: buffer_size,
            };
            draw_screen_pass(ctx.encoder, &ScreenPassShader::DownsampleSceneDepth(source), scaled_rect, &rect)
        })?;

        log::trace!("downsampled {:?} -> {:?} (target {:?})", view_rect, scaled_rect, extent);
        Ok(DownsampledTargets { color, depth, extent, view_rect: scaled_rect })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrameCapabilities, FrameSettings, TranslucencyConfig};
    use crate::frame::NoMeshDraws;
    use crate::resources::SceneRenderTargets;
    use crate::view::ViewFamily;
    use translucency_rhi::{CommandEncoder, RecordedCommand, RecordingEncoder};

    fn run(capabilities: FrameCapabilities) -> (RecordingEncoder, SceneRenderTargets, DownsampledTargets) {
        let config = TranslucencyConfig::default();
        let settings = FrameSettings::resolve(&config, capabilities).unwrap();
        let buffer = Extent2d::new(1024, 768);
        let family = ViewFamily::new(buffer);
        let mut targets = SceneRenderTargets::new(&config, buffer);
        let mut enc = RecordingEncoder::new();
        let out = {
            let mut ctx = FrameContext {
                encoder: &mut enc,
                targets: &mut targets,
                mesh_passes: &NoMeshDraws,
                settings: &settings,
                family: &family,
            };
            DownsamplePass::new().encode(&mut ctx, IntRect::from_extent(buffer), 0.5).unwrap()
        };
        (enc, targets, out)
    }

    #[test]
    fn half_scale_target_and_open_pass() {
        let (enc, targets, out) = run(FrameCapabilities::default());
        assert_eq!(out.extent, Extent2d::new(512, 384));
        assert_eq!(targets.pool().desc(out.depth).unwrap().extent, Extent2d::new(512, 384));
        assert_eq!(enc.active_render_pass(), Some(DOWNSAMPLE_PASS_LABEL));
        assert_eq!(enc.viewports()[0].width, 512.0);

        let rect = enc.rectangles()[0];
        assert_eq!((rect.dest_width, rect.dest_height), (512.0, 384.0));
        assert_eq!((rect.source_width, rect.source_height), (1024.0, 768.0));
    }

    #[test]
    fn depth_source_follows_depth_fetch_capability() {
        let bound = |enc: &RecordingEncoder| {
            enc.commands().iter().find_map(|c| match c {
                RecordedCommand::BindTexture { texture, .. } => Some(*texture),
                _ => None,
            })
        };

        let (enc, mut targets, _) = run(FrameCapabilities { supports_depth_fetch: true, ..Default::default() });
        assert_eq!(bound(&enc), Some(targets.scene_depth().unwrap()));

        let (enc, mut targets, _) = run(FrameCapabilities::default());
        assert_eq!(bound(&enc), Some(targets.alloc_scene_color().unwrap().texture()));
    }

    #[test]
    fn targets_transitioned_before_pass_opens() {
        let (enc, _, out) = run(FrameCapabilities::default());
        let begin = enc.commands().iter().position(|c| matches!(c, RecordedCommand::BeginRenderPass(_))).unwrap();
        let transitions = &enc.commands()[..begin];
        assert!(transitions.contains(&RecordedCommand::Transition { texture: out.color, access: ResourceAccess::Writable }));
        assert!(transitions.contains(&RecordedCommand::Transition { texture: out.depth, access: ResourceAccess::Writable }));
    }
}
