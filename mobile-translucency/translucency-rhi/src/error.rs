use thiserror::Error;

/// Violations of the render-pass scope protocol detected while recording.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RhiError {
    #[error("cannot begin render pass `{requested}` while `{active}` is still open")]
    RenderPassAlreadyActive { active: &'static str, requested: &'static str },

    #[error("end_render_pass called with no active render pass")]
    NoActiveRenderPass,

    #[error("`{operation}` is not allowed inside render pass `{active}`")]
    InsideRenderPass { operation: &'static str, active: &'static str },

    #[error("`{operation}` requires an active render pass")]
    OutsideRenderPass { operation: &'static str },

    #[error("render pass `{label}` has no attachments")]
    EmptyRenderPass { label: &'static str },
}
