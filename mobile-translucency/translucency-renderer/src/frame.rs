//! Per-frame context handed to every stage.

use translucency_rhi::{CommandEncoder, RenderPassDescriptor, ResourceAccess, TextureHandle};

use crate::config::FrameSettings;
use crate::error::{TranslucencyError, TranslucencyResult};
use crate::mesh_pass::{MeshPass, MeshPassDispatch};
use crate::resources::SceneRenderTargets;
use crate::view::{ViewFamily, ViewId};

pub struct FrameContext<'a> {
    pub encoder: &'a mut dyn CommandEncoder,
    pub targets: &'a mut SceneRenderTargets,
    pub mesh_passes: &'a dyn MeshPassDispatch,
    pub settings: &'a FrameSettings,
    pub family: &'a ViewFamily,
}

impl<'a> FrameContext<'a> {
    /// Fails with [`TranslucencyError::NestedRenderPass`] when a render pass is open.
    pub fn require_outside_render_pass(&self, stage: &'static str) -> TranslucencyResult<()> {
        match self.encoder.active_render_pass() {
            Some(active) => {
                log::error!("{stage} entered while render pass `{active}` is open");
                Err(TranslucencyError::NestedRenderPass { stage, active })
            }
            None => Ok(()),
        }
    }

    pub fn require_inside_render_pass(&self, stage: &'static str) -> TranslucencyResult<()> {
        if self.encoder.is_inside_render_pass() {
            Ok(())
        } else {
            log::error!("{stage} needs an open render pass");
            Err(TranslucencyError::MissingRenderPass { stage })
        }
    }

    pub fn transition(&mut self, texture: TextureHandle, access: ResourceAccess) -> TranslucencyResult<()> {
        self.targets.pool_mut().transition(self.encoder, texture, access)
    }

    pub fn begin_render_pass(&mut self, desc: RenderPassDescriptor) -> TranslucencyResult<()> {
        log::debug!("begin `{}`", desc.label);
        self.encoder.begin_render_pass(desc)?;
        Ok(())
    }

    pub fn end_render_pass(&mut self) -> TranslucencyResult<()> {
        if let Some(label) = self.encoder.end_render_pass_if_open()? {
            log::debug!("end `{label}`");
        }
        Ok(())
    }

    /// Run `f` inside a debug group. The group is popped whatever `f` returns.
    pub fn debug_group<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> TranslucencyResult<R>) -> TranslucencyResult<R> {
        self.encoder.push_debug_group(label);
        let result = f(self);
        self.encoder.pop_debug_group();
        result
    }
}

/// Stand-in for stages that never dispatch mesh draws.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMeshDraws;

impl MeshPassDispatch for NoMeshDraws {
    fn has_any_draws(&self, _pass: MeshPass, _view: ViewId) -> bool {
        false
    }

    fn dispatch_draws(&self, _pass: MeshPass, _view: ViewId, _encoder: &mut dyn CommandEncoder) -> TranslucencyResult<()> {
        Ok(())
    }
}
