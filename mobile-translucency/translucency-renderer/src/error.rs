//! Error type for translucency recording. Almost every variant is a caller ordering bug.

use translucency_rhi::{Extent2d, RhiError, TextureFormat};

use crate::view::ViewId;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum TranslucencyError {
    #[error(transparent)]
    Rhi(#[from] RhiError),

    #[error("{stage} must be recorded outside a render pass, but `{active}` is open")]
    NestedRenderPass { stage: &'static str, active: &'static str },

    #[error("{stage} must be recorded inside the scene colour render pass")]
    MissingRenderPass { stage: &'static str },

    #[error("downsampling scale must be in (0, 1], got {0}")]
    InvalidDownsamplingScale(f32),

    #[error("scene colour sample count must be at least 1, got {0}")]
    InvalidSampleCount(u32),

    #[error("{0:?} is not a depth-stencil format")]
    InvalidDepthFormat(TextureFormat),

    #[error("render target `{name}` must have a non-zero size")]
    ZeroSizedTarget { name: &'static str },

    #[error("reduced-resolution target `{name}` is {actual:?}, expected {expected:?}")]
    ResolutionMismatch { name: &'static str, expected: Extent2d, actual: Extent2d },

    #[error("render target handle is not owned by the pool (released or from another frame)")]
    UnknownTarget,

    #[error("view {0:?} is not part of the view family")]
    UnknownView(ViewId),
}

pub type TranslucencyResult<T> = Result<T, TranslucencyError>;
