//! Translucency draw stage: flushes a view's prebuilt translucent draw list into the open render pass.

use crate::error::TranslucencyResult;
use crate::frame::FrameContext;
use crate::mesh_pass::MeshPass;
use crate::view::{IntRect, ViewInfo};

#[derive(Debug, Default)]
pub struct TranslucencyDrawStage;

impl TranslucencyDrawStage {
    pub fn new() -> Self {
        Self
    }

    /// Set `viewport` and dispatch `pass` for `view`. Never opens or closes a render pass; one must be open,
    /// either the caller's scene pass or the reduced-resolution pass opened by the downsample.
    pub fn encode(&self, ctx: &mut FrameContext<'_>, view: &ViewInfo, pass: MeshPass, viewport: IntRect) -> TranslucencyResult<()> {
        ctx.require_inside_render_pass("translucency draw")?;
        ctx.encoder.set_viewport(viewport.viewport())?;
        if ctx.settings.capabilities.debug_view_shaders {
            log::trace!("view {:?}: debug view shaders, skipping {:?}", view.id, pass);
            return Ok(());
        }
        log::trace!("view {:?}: dispatching {:?} at {:?}", view.id, pass, viewport);
        ctx.mesh_passes.dispatch_draws(pass, view.id, ctx.encoder)
    }
}
