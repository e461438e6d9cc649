//! In-memory encoder: validates the scope protocol and keeps the recorded command stream.
//! Used headless (tests, traces) and as the reference a GPU backend replays.

use crate::{
    CommandEncoder, GraphicsPipelineState, RectangleDraw, RenderPassDescriptor, ResolveRect, ResourceAccess, RhiError,
    SamplerState, TextureHandle, Viewport,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass(RenderPassDescriptor),
    EndRenderPass { label: &'static str },
    Transition { texture: TextureHandle, access: ResourceAccess },
    CopyToResolveTarget { source: TextureHandle, dest: TextureHandle, rect: ResolveRect },
    SetViewport(Viewport),
    SetPipelineState(GraphicsPipelineState),
    BindTexture { slot: &'static str, texture: TextureHandle, sampler: SamplerState },
    DrawRectangle(RectangleDraw),
    DrawIndexed { index_count: u32, instance_count: u32, first_index: u32, base_vertex: i32, first_instance: u32 },
    UpdateUniformBuffer { name: &'static str, data: Vec<u8> },
    PushDebugGroup(String),
    PopDebugGroup,
}

#[derive(Debug, Default)]
pub struct RecordingEncoder {
    commands: Vec<RecordedCommand>,
    active: Option<&'static str>,
    debug_depth: usize,
}

impl RecordingEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<RecordedCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn debug_group_depth(&self) -> usize {
        self.debug_depth
    }

    pub fn render_pass_labels(&self) -> Vec<&'static str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BeginRenderPass(desc) => Some(desc.label),
                _ => None,
            })
            .collect()
    }

    pub fn render_passes(&self) -> Vec<&RenderPassDescriptor> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::BeginRenderPass(desc) => Some(desc),
                _ => None,
            })
            .collect()
    }

    pub fn transitions(&self) -> Vec<(TextureHandle, ResourceAccess)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::Transition { texture, access } => Some((*texture, *access)),
                _ => None,
            })
            .collect()
    }

    pub fn viewports(&self) -> Vec<Viewport> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::SetViewport(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn rectangles(&self) -> Vec<RectangleDraw> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::DrawRectangle(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    pub fn indexed_draw_count(&self) -> usize {
        self.commands.iter().filter(|c| matches!(c, RecordedCommand::DrawIndexed { .. })).count()
    }

    fn require_outside(&self, operation: &'static str) -> Result<(), RhiError> {
        match self.active {
            Some(active) => Err(RhiError::InsideRenderPass { operation, active }),
            None => Ok(()),
        }
    }

    fn require_inside(&self, operation: &'static str) -> Result<(), RhiError> {
        match self.active {
            Some(_) => Ok(()),
            None => Err(RhiError::OutsideRenderPass { operation }),
        }
    }
}

impl CommandEncoder for RecordingEncoder {
    fn begin_render_pass(&mut self, desc: RenderPassDescriptor) -> Result<(), RhiError> {
        if let Some(active) = self.active {
            return Err(RhiError::RenderPassAlreadyActive { active, requested: desc.label });
        }
        if desc.color_attachments.is_empty() && desc.depth_stencil_attachment.is_none() {
            return Err(RhiError::EmptyRenderPass { label: desc.label });
        }
        log::trace!("begin render pass `{}`", desc.label);
        self.active = Some(desc.label);
        self.commands.push(RecordedCommand::BeginRenderPass(desc));
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<(), RhiError> {
        let label = self.active.take().ok_or(RhiError::NoActiveRenderPass)?;
        log::trace!("end render pass `{label}`");
        self.commands.push(RecordedCommand::EndRenderPass { label });
        Ok(())
    }

    fn active_render_pass(&self) -> Option<&'static str> {
        self.active
    }

    fn transition_resource(&mut self, texture: TextureHandle, access: ResourceAccess) -> Result<(), RhiError> {
        self.require_outside("transition_resource")?;
        self.commands.push(RecordedCommand::Transition { texture, access });
        Ok(())
    }

    fn copy_to_resolve_target(
        &mut self,
        source: TextureHandle,
        dest: TextureHandle,
        rect: ResolveRect,
    ) -> Result<(), RhiError> {
        self.require_outside("copy_to_resolve_target")?;
        self.commands.push(RecordedCommand::CopyToResolveTarget { source, dest, rect });
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RhiError> {
        self.require_inside("set_viewport")?;
        self.commands.push(RecordedCommand::SetViewport(viewport));
        Ok(())
    }

    fn set_graphics_pipeline_state(&mut self, state: &GraphicsPipelineState) -> Result<(), RhiError> {
        self.require_inside("set_graphics_pipeline_state")?;
        self.commands.push(RecordedCommand::SetPipelineState(state.clone()));
        Ok(())
    }

    fn bind_texture(&mut self, slot: &'static str, texture: TextureHandle, sampler: SamplerState) -> Result<(), RhiError> {
        self.require_inside("bind_texture")?;
        self.commands.push(RecordedCommand::BindTexture { slot, texture, sampler });
        Ok(())
    }

    fn draw_rectangle(&mut self, rect: &RectangleDraw) -> Result<(), RhiError> {
        self.require_inside("draw_rectangle")?;
        self.commands.push(RecordedCommand::DrawRectangle(*rect));
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), RhiError> {
        self.require_inside("draw_indexed")?;
        self.commands.push(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            base_vertex,
            first_instance,
        });
        Ok(())
    }

    fn update_uniform_buffer(&mut self, name: &'static str, data: &[u8]) -> Result<(), RhiError> {
        self.commands.push(RecordedCommand::UpdateUniformBuffer { name, data: data.to_vec() });
        Ok(())
    }

    fn push_debug_group(&mut self, label: &str) {
        self.debug_depth += 1;
        self.commands.push(RecordedCommand::PushDebugGroup(label.to_string()));
    }

    fn pop_debug_group(&mut self) {
        if self.debug_depth == 0 {
            log::warn!("pop_debug_group without a matching push");
            return;
        }
        self.debug_depth -= 1;
        self.commands.push(RecordedCommand::PopDebugGroup);
    }
}
