//! Scene render targets: scene colour (+ MSAA resolve), scene depth, the reduced-resolution separate
//! translucency pair and the scene alpha copy, all fetched by semantic from one [`RenderTargetPool`].

mod pool;

pub use pool::{PooledRenderTarget, RenderTargetDesc, RenderTargetPool, TargetSemantic};

use translucency_rhi::{Extent2d, TextureFormat, TextureHandle};

use crate::config::TranslucencyConfig;
use crate::error::TranslucencyResult;

/// Extent of a reduced-resolution target: `floor(extent * scale)` per axis, at least 1x1.
/// Every reduced-resolution stage sizes its buffers through this function.
pub fn downsampled_extent(full: Extent2d, scale: f32) -> Extent2d {
    let scale = f64::from(scale);
    let axis = |v: u32| ((f64::from(v) * scale).floor() as u32).max(1);
    Extent2d::new(axis(full.width), axis(full.height))
}

/// Scene colour as a render surface plus its shader-readable form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneColorTargets {
    pub surface: TextureHandle,
    /// Present only when the surface is multisampled.
    pub resolve: Option<TextureHandle>,
}

impl SceneColorTargets {
    /// The single-sample texture shaders sample scene colour from.
    pub fn texture(&self) -> TextureHandle {
        self.resolve.unwrap_or(self.surface)
    }

    pub fn is_multisampled(&self) -> bool {
        self.resolve.is_some()
    }
}

pub struct SceneRenderTargets {
    pool: RenderTargetPool,
    buffer_size: Extent2d,
    scene_color_format: TextureFormat,
    depth_format: TextureFormat,
    msaa_samples: u32,
}

impl SceneRenderTargets {
    pub fn new(config: &TranslucencyConfig, buffer_size: Extent2d) -> Self {
        Self {
            pool: RenderTargetPool::new(),
            buffer_size,
            scene_color_format: config.scene_color_format(),
            depth_format: config.depth_format,
            msaa_samples: config.msaa_samples.max(1),
        }
    }

    /// Start a frame: pick up format/size changes and release targets idle for too long.
    pub fn begin_frame(&mut self, config: &TranslucencyConfig, buffer_size: Extent2d) {
        self.pool.begin_frame();
        self.buffer_size = buffer_size;
        self.scene_color_format = config.scene_color_format();
        self.depth_format = config.depth_format;
        self.msaa_samples = config.msaa_samples.max(1);
        let released = self.pool.trim(config.target_max_idle_frames);
        if !released.is_empty() {
            log::debug!("released {} idle render targets", released.len());
        }
    }

    pub fn buffer_size(&self) -> Extent2d {
        self.buffer_size
    }

    pub fn scene_color_format(&self) -> TextureFormat {
        self.scene_color_format
    }

    pub fn pool(&self) -> &RenderTargetPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut RenderTargetPool {
        &mut self.pool
    }

    /// Ensure scene colour exists at the buffer size. With MSAA a separate resolve texture is allocated too.
    pub fn alloc_scene_color(&mut self) -> TranslucencyResult<SceneColorTargets> {
        let surface = self.pool.get_or_create(
            TargetSemantic::SceneColor,
            RenderTargetDesc::new(self.buffer_size, self.scene_color_format, self.msaa_samples),
        )?;
        let resolve = if self.msaa_samples > 1 {
            Some(self.pool.get_or_create(
                TargetSemantic::SceneColorResolve,
                RenderTargetDesc::new(self.buffer_size, self.scene_color_format, 1),
            )?)
        } else {
            None
        };
        Ok(SceneColorTargets { surface, resolve })
    }

    pub fn scene_depth(&mut self) -> TranslucencyResult<TextureHandle> {
        self.pool.get_or_create(
            TargetSemantic::SceneDepth,
            RenderTargetDesc::new(self.buffer_size, self.depth_format, self.msaa_samples),
        )
    }

    /// Low-resolution colour for separate translucency. Always single-sampled so it can be sampled directly.
    pub fn separate_translucency(&mut self, extent: Extent2d) -> TranslucencyResult<TextureHandle> {
        self.pool.get_or_create(
            TargetSemantic::SeparateTranslucency,
            RenderTargetDesc::new(extent, self.scene_color_format, 1),
        )
    }

    pub fn downsampled_translucency_depth(&mut self, extent: Extent2d) -> TranslucencyResult<TextureHandle> {
        self.pool.get_or_create(
            TargetSemantic::DownsampledTranslucencyDepth,
            RenderTargetDesc::new(extent, self.depth_format, 1),
        )
    }

    pub fn scene_alpha_copy(&mut self) -> TranslucencyResult<TextureHandle> {
        self.pool.get_or_create(
            TargetSemantic::SceneAlphaCopy,
            RenderTargetDesc::new(self.buffer_size, self.scene_color_format, 1),
        )
    }
}
