//! Scene uniform buffers the translucency passes bind: the view buffer and the two buffers derived from it.

use translucency_rhi::CommandEncoder;

use crate::error::TranslucencyResult;
use crate::view::{ViewId, ViewInfo, ViewUniformParameters};

pub const VIEW_UNIFORM_BUFFER: &str = "View";
pub const TRANSLUCENT_BASE_PASS_UNIFORM_BUFFER: &str = "MobileTranslucentBasePass";
pub const DIRECTIONAL_LIGHT_UNIFORM_BUFFER: &str = "MobileDirectionalLight";

/// Per-view data of the translucent base pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TranslucentBasePassUniformParameters {
    pub view_size_and_inv_size: [f32; 4],
    pub buffer_size_and_inv_size: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightUniformParameters {
    /// xyz = direction towards the light, w = intensity.
    pub direction_and_intensity: [f32; 4],
    pub color: [f32; 4],
    /// The view the light data was last bound for.
    pub view_rect_min: [f32; 4],
}

impl Default for DirectionalLightUniformParameters {
    fn default() -> Self {
        Self {
            direction_and_intensity: [0.0, 0.0, 1.0, 1.0],
            color: [1.0, 1.0, 1.0, 1.0],
            view_rect_min: [0.0; 4],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CommittedView {
    view: ViewId,
    params: ViewUniformParameters,
}

/// Shadow copy of what the GPU view buffer currently holds, so writes happen only on change.
#[derive(Debug, Default)]
pub struct SceneUniformBuffers {
    committed: Option<CommittedView>,
    directional_light: DirectionalLightUniformParameters,
    view_buffer_writes: u64,
}

impl SceneUniformBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_directional_light(&mut self, direction: [f32; 3], intensity: f32, color: [f32; 3]) {
        self.directional_light.direction_and_intensity = [direction[0], direction[1], direction[2], intensity];
        self.directional_light.color = [color[0], color[1], color[2], 1.0];
    }

    /// Bytes the view buffer currently holds, if anything was committed.
    pub fn view_uniforms(&self) -> Option<&ViewUniformParameters> {
        self.committed.as_ref().map(|c| &c.params)
    }

    pub fn view_buffer_writes(&self) -> u64 {
        self.view_buffer_writes
    }

    /// Commit `view`'s cached uniform block unless the buffer already holds it. Returns whether a write happened.
    pub fn update_view_uniform_buffer(&mut self, encoder: &mut dyn CommandEncoder, view: &ViewInfo) -> TranslucencyResult<bool> {
        if let Some(committed) = &self.committed {
            if committed.view == view.id && committed.params == view.cached_uniforms {
                return Ok(false);
            }
        }
        self.write_view(encoder, view.id, view.cached_uniforms)?;
        Ok(true)
    }

    /// Bring the view buffer up to date for `view`; the dependent buffers are rewritten only when it changed.
    pub fn sync_view(&mut self, encoder: &mut dyn CommandEncoder, view: &ViewInfo) -> TranslucencyResult<bool> {
        if !self.update_view_uniform_buffer(encoder, view)? {
            return Ok(false);
        }
        log::trace!("view {:?}: rewriting dependent uniform buffers", view.id);
        let base_pass = TranslucentBasePassUniformParameters {
            view_size_and_inv_size: view.cached_uniforms.view_size_and_inv_size,
            buffer_size_and_inv_size: view.cached_uniforms.buffer_size_and_inv_size,
        };
        encoder.update_uniform_buffer(TRANSLUCENT_BASE_PASS_UNIFORM_BUFFER, bytemuck::bytes_of(&base_pass))?;
        self.directional_light.view_rect_min = view.cached_uniforms.view_rect_min;
        encoder.update_uniform_buffer(DIRECTIONAL_LIGHT_UNIFORM_BUFFER, bytemuck::bytes_of(&self.directional_light))?;
        Ok(true)
    }

    /// Run `f` with `scaled` committed to the view buffer, then put `view`'s cached block back whatever `f` returned.
    pub fn with_view_override<C, R>(
        &mut self,
        cx: &mut C,
        encoder: impl Fn(&mut C) -> &mut dyn CommandEncoder,
        view: &ViewInfo,
        scaled: &ViewUniformParameters,
        f: impl FnOnce(&mut C) -> TranslucencyResult<R>,
    ) -> TranslucencyResult<R> {
        self.write_view(encoder(cx), view.id, *scaled)?;

        let result = f(cx);

        let restored = self.write_view(encoder(cx), view.id, view.cached_uniforms);
        let value = result?;
        restored?;
        Ok(value)
    }

    fn write_view(&mut self, encoder: &mut dyn CommandEncoder, view: ViewId, params: ViewUniformParameters) -> TranslucencyResult<()> {
        encoder.update_uniform_buffer(VIEW_UNIFORM_BUFFER, bytemuck::bytes_of(&params))?;
        self.committed = Some(CommittedView { view, params });
        self.view_buffer_writes += 1;
        Ok(())
    }
}
