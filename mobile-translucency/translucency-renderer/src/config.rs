//! Translucency configuration and per-frame capability resolution.

use translucency_rhi::{ClearColor, TextureFormat};

use crate::error::{TranslucencyError, TranslucencyResult};

/// Renderer-wide translucency settings. Resolved together with [`FrameCapabilities`] once per frame.
#[derive(Clone, Debug)]
pub struct TranslucencyConfig {
    /// Linear scale of the separate translucency buffers relative to the scene buffer. Must be in (0, 1].
    pub downsampling_scale: f32,
    /// Render standard translucency here and leave after-DOF translucency to post processing.
    pub allow_translucency_after_dof: bool,
    /// HDR scene colour (`Rgba16Float`); otherwise `Rgba8Unorm`.
    pub mobile_hdr: bool,
    /// Scene colour sample count. Values above 1 give scene colour a separate resolve texture.
    pub msaa_samples: u32,
    pub depth_format: TextureFormat,
    /// Clear of the low-res translucency colour. Alpha holds transmittance, so opaque black means "nothing drawn".
    pub separate_translucency_clear: ClearColor,
    /// Clear of scene colour before the inverse opacity pass. Alpha 1 means fully transparent coverage.
    pub inverse_opacity_clear: ClearColor,
    /// Pooled targets untouched for this many frames are released.
    pub target_max_idle_frames: u64,
}

impl Default for TranslucencyConfig {
    fn default() -> Self {
        Self {
            downsampling_scale: 0.5,
            allow_translucency_after_dof: false,
            mobile_hdr: true,
            msaa_samples: 1,
            depth_format: TextureFormat::D24UnormS8Uint,
            separate_translucency_clear: ClearColor::BLACK,
            inverse_opacity_clear: ClearColor::BLACK,
            target_max_idle_frames: 3,
        }
    }
}

impl TranslucencyConfig {
    pub fn scene_color_format(&self) -> TextureFormat {
        if self.mobile_hdr {
            TextureFormat::Rgba16Float
        } else {
            TextureFormat::Rgba8Unorm
        }
    }

    pub fn validate(&self) -> TranslucencyResult<()> {
        let scale = self.downsampling_scale;
        if !scale.is_finite() || scale <= 0.0 || scale > 1.0 {
            return Err(TranslucencyError::InvalidDownsamplingScale(scale));
        }
        if self.msaa_samples == 0 {
            return Err(TranslucencyError::InvalidSampleCount(self.msaa_samples));
        }
        if !self.depth_format.is_depth_stencil() {
            return Err(TranslucencyError::InvalidDepthFormat(self.depth_format));
        }
        Ok(())
    }
}

/// Hardware/family capabilities for the current frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameCapabilities {
    /// The bound colour attachment can be read in the pixel shader of the same pass.
    pub supports_frame_buffer_fetch: bool,
    /// Scene depth can be sampled directly. Without it, linear depth lives in scene colour alpha.
    pub supports_depth_fetch: bool,
    /// The family renders with debug view shaders; mesh draws are not dispatched.
    pub debug_view_shaders: bool,
}

/// Configuration plus capabilities, validated once and passed by reference through every stage.
#[derive(Clone, Debug)]
pub struct FrameSettings {
    pub config: TranslucencyConfig,
    pub capabilities: FrameCapabilities,
}

impl FrameSettings {
    pub fn resolve(config: &TranslucencyConfig, capabilities: FrameCapabilities) -> TranslucencyResult<Self> {
        config.validate()?;
        Ok(Self { config: config.clone(), capabilities })
    }

    pub fn downsampling_scale(&self) -> f32 {
        self.config.downsampling_scale
    }
}
