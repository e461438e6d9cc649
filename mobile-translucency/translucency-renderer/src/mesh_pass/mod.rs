//! Mesh draw command passes: prebuilt, sorted per-(view, pass) draw lists dispatched by the draw stages.

mod processor;

pub use processor::{
    inverse_opacity_render_state, translucent_render_state, BlendMode, InverseOpacityMeshProcessor, MaterialDesc, MeshBatch,
    MeshPassProcessor, TranslucencyMeshProcessor,
};

use std::collections::HashMap;

use translucency_rhi::{CommandEncoder, GraphicsPipelineState};

use crate::error::TranslucencyResult;
use crate::view::ViewId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshPass {
    /// Every translucent material.
    TranslucencyAll,
    /// Translucent materials not deferred until after depth of field.
    TranslucencyStandard,
    /// Opacity-only pass for scene captures; only built when a capture asks for it.
    MobileInverseOpacity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDrawCommand {
    pub pipeline_state: GraphicsPipelineState,
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    pub primitive_id: u32,
    /// Ascending order is draw order.
    pub sort_key: u64,
}

/// A finished, sorted draw list. Built once during scene setup, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshDrawCommandPass {
    commands: Vec<MeshDrawCommand>,
}

impl MeshDrawCommandPass {
    pub fn from_commands(mut commands: Vec<MeshDrawCommand>) -> Self {
        commands.sort_by_key(|c| c.sort_key);
        Self { commands }
    }

    pub fn commands(&self) -> &[MeshDrawCommand] {
        &self.commands
    }

    pub fn has_any_draw(&self) -> bool {
        !self.commands.is_empty()
    }

    /// Submit every command into the active render pass, skipping redundant pipeline binds.
    pub fn dispatch_draw(&self, encoder: &mut dyn CommandEncoder) -> TranslucencyResult<()> {
        let mut bound: Option<&GraphicsPipelineState> = None;
        for command in &self.commands {
            if bound != Some(&command.pipeline_state) {
                encoder.set_graphics_pipeline_state(&command.pipeline_state)?;
                bound = Some(&command.pipeline_state);
            }
            encoder.draw_indexed(command.index_count, command.instance_count, command.first_index, command.base_vertex, 0)?;
        }
        Ok(())
    }
}

/// What the draw stages need from the mesh pass framework.
pub trait MeshPassDispatch {
    fn has_any_draws(&self, pass: MeshPass, view: ViewId) -> bool;
    fn dispatch_draws(&self, pass: MeshPass, view: ViewId, encoder: &mut dyn CommandEncoder) -> TranslucencyResult<()>;
}

#[derive(Debug, Default)]
pub struct MeshDrawCommandPasses {
    passes: HashMap<(ViewId, MeshPass), MeshDrawCommandPass>,
}

impl MeshDrawCommandPasses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, view: ViewId, pass: MeshPass, commands: MeshDrawCommandPass) {
        self.passes.insert((view, pass), commands);
    }

    pub fn get(&self, view: ViewId, pass: MeshPass) -> Option<&MeshDrawCommandPass> {
        self.passes.get(&(view, pass))
    }

    /// Run `batches` through both translucency processors, and the inverse opacity processor when
    /// `with_inverse_opacity` is set, storing the resulting passes for `view`.
    pub fn build_view(&mut self, view: ViewId, batches: &[MeshBatch], with_inverse_opacity: bool) {
        let mut all = TranslucencyMeshProcessor::new(MeshPass::TranslucencyAll);
        let mut standard = TranslucencyMeshProcessor::new(MeshPass::TranslucencyStandard);
        let mut inverse_opacity = InverseOpacityMeshProcessor::new();
        for batch in batches {
            all.add_mesh_batch(batch);
            standard.add_mesh_batch(batch);
            if with_inverse_opacity {
                inverse_opacity.add_mesh_batch(batch);
            }
        }
        self.insert(view, MeshPass::TranslucencyAll, all.finish());
        self.insert(view, MeshPass::TranslucencyStandard, standard.finish());
        if with_inverse_opacity {
            self.insert(view, MeshPass::MobileInverseOpacity, inverse_opacity.finish());
        }
        log::trace!(
            "view {:?}: {} translucent / {} standard draws",
            view,
            self.get(view, MeshPass::TranslucencyAll).map_or(0, |p| p.commands().len()),
            self.get(view, MeshPass::TranslucencyStandard).map_or(0, |p| p.commands().len())
        );
    }

    /// Drop every pass. Called at end of frame.
    pub fn clear(&mut self) {
        self.passes.clear();
    }
}

impl MeshPassDispatch for MeshDrawCommandPasses {
    fn has_any_draws(&self, pass: MeshPass, view: ViewId) -> bool {
        self.get(view, pass).is_some_and(MeshDrawCommandPass::has_any_draw)
    }

    fn dispatch_draws(&self, pass: MeshPass, view: ViewId, encoder: &mut dyn CommandEncoder) -> TranslucencyResult<()> {
        match self.get(view, pass) {
            Some(commands) => commands.dispatch_draw(encoder),
            None => Ok(()),
        }
    }
}
