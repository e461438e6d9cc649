//! Views and the view uniform block.

use translucency_rhi::{Extent2d, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u32);

/// Integer pixel rectangle, `[min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl IntRect {
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn from_extent(extent: Extent2d) -> Self {
        Self::new(0, 0, extent.width as i32, extent.height as i32)
    }

    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    pub fn size(&self) -> Extent2d {
        Extent2d::new(self.width().max(0) as u32, self.height().max(0) as u32)
    }

    /// Rectangle in a buffer scaled by `scale`. Origin and size are truncated separately, and a
    /// non-empty size never drops below one pixel, so scaling the full-buffer rectangle yields
    /// exactly [`downsampled_extent`](crate::resources::downsampled_extent) of the buffer.
    pub fn scale(&self, scale: f32) -> Self {
        let scale = f64::from(scale);
        let origin = |v: i32| (f64::from(v) * scale).trunc() as i32;
        let length = |v: i32| {
            if v <= 0 {
                0
            } else {
                ((f64::from(v) * scale).trunc() as i32).max(1)
            }
        };
        let min_x = origin(self.min_x);
        let min_y = origin(self.min_y);
        Self::new(min_x, min_y, min_x + length(self.width()), min_y + length(self.height()))
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from_bounds(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewMatrices {
    pub view_to_clip: [f32; 16],
    pub translated_world_to_clip: [f32; 16],
}

impl Default for ViewMatrices {
    fn default() -> Self {
        const IDENTITY: [f32; 16] = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ];
        Self { view_to_clip: IDENTITY, translated_world_to_clip: IDENTITY }
    }
}

/// GPU layout of the `View` uniform buffer. Only the rect-dependent part is rewritten
/// when rendering at reduced resolution.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ViewUniformParameters {
    pub view_to_clip: [f32; 16],
    pub translated_world_to_clip: [f32; 16],
    pub prev_translated_world_to_clip: [f32; 16],
    pub view_rect_min: [f32; 4],
    pub view_size_and_inv_size: [f32; 4],
    pub buffer_size_and_inv_size: [f32; 4],
    /// Maps clip space to buffer UV: `(sx, sy, bias_y, bias_x)`.
    pub screen_position_scale_bias: [f32; 4],
}

impl Default for ViewUniformParameters {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

fn size_and_inv_size(width: f32, height: f32) -> [f32; 4] {
    let inv = |v: f32| if v > 0.0 { 1.0 / v } else { 0.0 };
    [width, height, inv(width), inv(height)]
}

/// Fill every field of `params` that depends on the buffer size, the view rectangle or the matrices.
pub fn setup_view_rect_uniform_parameters(
    params: &mut ViewUniformParameters,
    buffer_size: Extent2d,
    view_rect: IntRect,
    matrices: &ViewMatrices,
    prev_matrices: &ViewMatrices,
) {
    let buffer_w = buffer_size.width as f32;
    let buffer_h = buffer_size.height as f32;
    let view_w = view_rect.width() as f32;
    let view_h = view_rect.height() as f32;
    let min_x = view_rect.min_x as f32;
    let min_y = view_rect.min_y as f32;

    params.view_to_clip = matrices.view_to_clip;
    params.translated_world_to_clip = matrices.translated_world_to_clip;
    params.prev_translated_world_to_clip = prev_matrices.translated_world_to_clip;
    params.view_rect_min = [min_x, min_y, 0.0, 0.0];
    params.view_size_and_inv_size = size_and_inv_size(view_w, view_h);
    params.buffer_size_and_inv_size = size_and_inv_size(buffer_w, buffer_h);
    params.screen_position_scale_bias = if buffer_w > 0.0 && buffer_h > 0.0 {
        [
            view_w / buffer_w / 2.0,
            view_h / buffer_h / -2.0,
            (view_h / 2.0 + min_y) / buffer_h,
            (view_w / 2.0 + min_x) / buffer_w,
        ]
    } else {
        [0.0; 4]
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FeatureLevel {
    Es3_1,
    #[default]
    Es3_2,
}

#[derive(Debug, Clone)]
pub struct ViewInfo {
    pub id: ViewId,
    /// Full-resolution viewport rectangle in the scene buffer.
    pub view_rect: IntRect,
    pub matrices: ViewMatrices,
    pub prev_matrices: ViewMatrices,
    /// The view uniform block as built for full resolution. Never modified by translucency rendering.
    pub cached_uniforms: ViewUniformParameters,
    pub feature_level: FeatureLevel,
    /// Hardware multi-view stereo: all views draw with the primary view's rectangle.
    pub is_mobile_multi_view: bool,
    pub should_render: bool,
}

impl ViewInfo {
    pub fn new(id: ViewId, view_rect: IntRect, buffer_size: Extent2d, matrices: ViewMatrices) -> Self {
        let mut cached_uniforms = ViewUniformParameters::default();
        setup_view_rect_uniform_parameters(&mut cached_uniforms, buffer_size, view_rect, &matrices, &matrices);
        Self {
            id,
            view_rect,
            matrices,
            prev_matrices: matrices,
            cached_uniforms,
            feature_level: FeatureLevel::default(),
            is_mobile_multi_view: false,
            should_render: true,
        }
    }

    pub fn should_render_view(&self) -> bool {
        self.should_render
    }

    /// Copy of the cached uniforms with the rect-dependent fields rebuilt for a reduced-resolution buffer.
    pub fn scaled_uniforms(&self, buffer_size: Extent2d, view_rect: IntRect) -> ViewUniformParameters {
        let mut params = self.cached_uniforms;
        setup_view_rect_uniform_parameters(&mut params, buffer_size, view_rect, &self.matrices, &self.prev_matrices);
        params
    }
}

/// The views rendered together in one frame, sharing one scene buffer.
#[derive(Debug, Clone, Default)]
pub struct ViewFamily {
    pub buffer_size: Extent2d,
    pub views: Vec<ViewInfo>,
}

impl ViewFamily {
    pub fn new(buffer_size: Extent2d) -> Self {
        Self { buffer_size, views: Vec::new() }
    }

    pub fn with_view(mut self, view: ViewInfo) -> Self {
        self.views.push(view);
        self
    }

    pub fn view(&self, id: ViewId) -> Option<&ViewInfo> {
        self.views.iter().find(|v| v.id == id)
    }

    /// Rectangle translucency is drawn with for `view`: the primary view's under multi-view, else its own.
    pub fn translucent_viewport_rect(&self, view: &ViewInfo) -> IntRect {
        match self.views.first() {
            Some(primary) if view.is_mobile_multi_view => primary.view_rect,
            _ => view.view_rect,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_truncates_origin_and_size() {
        let rect = IntRect::new(3, 5, 1027, 773);
        assert_eq!(rect.scale(0.5), IntRect::new(1, 2, 513, 386));
        assert_eq!(IntRect::new(0, 0, 1, 1).scale(0.25).size(), Extent2d::new(1, 1));
    }

    #[test]
    fn view_rect_uniforms_follow_buffer_and_rect() {
        let view = ViewInfo::new(ViewId(0), IntRect::new(0, 0, 1024, 768), Extent2d::new(1024, 768), ViewMatrices::default());
        let p = view.cached_uniforms;
        assert_eq!(p.view_size_and_inv_size, [1024.0, 768.0, 1.0 / 1024.0, 1.0 / 768.0]);
        assert_eq!(p.screen_position_scale_bias, [0.5, -0.5, 0.5, 0.5]);

        let scaled = view.scaled_uniforms(Extent2d::new(512, 384), view.view_rect.scale(0.5));
        assert_eq!(scaled.buffer_size_and_inv_size[..2], [512.0, 384.0]);
        assert_eq!(scaled.view_to_clip, p.view_to_clip);
        assert_eq!(view.cached_uniforms, p);
    }

    #[test]
    fn multi_view_uses_primary_rect() {
        let size = Extent2d::new(2048, 1024);
        let mut left = ViewInfo::new(ViewId(0), IntRect::new(0, 0, 1024, 1024), size, ViewMatrices::default());
        let mut right = ViewInfo::new(ViewId(1), IntRect::new(1024, 0, 2048, 1024), size, ViewMatrices::default());
        left.is_mobile_multi_view = true;
        right.is_mobile_multi_view = true;
        let family = ViewFamily::new(size).with_view(left).with_view(right.clone());
        assert_eq!(family.translucent_viewport_rect(&right), IntRect::new(0, 0, 1024, 1024));

        right.is_mobile_multi_view = false;
        assert_eq!(family.translucent_viewport_rect(&right), right.view_rect);
    }
}
