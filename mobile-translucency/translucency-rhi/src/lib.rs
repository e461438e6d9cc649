//! Translucency RHI: backend-agnostic command recording interface.
//! Defines the handles, attachment actions and pipeline state the translucency renderer records,
//! plus the [`CommandEncoder`] trait every backend (or the in-memory [`RecordingEncoder`]) implements.

mod blend;
mod error;
mod recording;

pub use blend::{BlendComponent, BlendFactor, BlendOp, BlendState, ColorTargetBlend, ColorWrites};
pub use error::RhiError;
pub use recording::{RecordedCommand, RecordingEncoder};

use std::fmt::Debug;

slotmap::new_key_type! {
    /// Non-owning handle to a pooled 2D render target. Valid for the frame it was fetched in.
    pub struct TextureHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba16Float,
    R32Float,
    D24UnormS8Uint,
    D32Float,
    D32FloatS8Uint,
}

impl TextureFormat {
    pub fn is_depth_stencil(&self) -> bool {
        matches!(self, Self::D24UnormS8Uint | Self::D32Float | Self::D32FloatS8Uint)
    }

    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::D24UnormS8Uint | Self::D32FloatS8Uint)
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const RENDER_ATTACHMENT = 1 << 3;
    }
}

/// Width/height of a 2D surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Read/write state a render target must be in before a stage touches it.
/// Transitions are only legal outside a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAccess {
    Readable,
    Writable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
    /// Resolve the multisampled attachment into its resolve target; the samples themselves are discarded.
    Resolve,
}

/// Load/store pair for one attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetActions {
    pub load: LoadOp,
    pub store: StoreOp,
}

impl RenderTargetActions {
    pub const LOAD_STORE: Self = Self::new(LoadOp::Load, StoreOp::Store);
    pub const CLEAR_STORE: Self = Self::new(LoadOp::Clear, StoreOp::Store);
    pub const CLEAR_RESOLVE: Self = Self::new(LoadOp::Clear, StoreOp::Resolve);
    pub const CLEAR_DONT_STORE: Self = Self::new(LoadOp::Clear, StoreOp::DontCare);
    pub const DONT_LOAD_STORE: Self = Self::new(LoadOp::DontCare, StoreOp::Store);

    pub const fn new(load: LoadOp, store: StoreOp) -> Self {
        Self { load, store }
    }
}

/// Separate actions for the depth and stencil planes of a depth-stencil attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilTargetActions {
    pub depth: RenderTargetActions,
    pub stencil: RenderTargetActions,
}

impl DepthStencilTargetActions {
    pub const CLEAR_DEPTH_STENCIL_STORE: Self =
        Self { depth: RenderTargetActions::CLEAR_STORE, stencil: RenderTargetActions::CLEAR_STORE };
    pub const CLEAR_DEPTH_STENCIL_DONT_STORE: Self =
        Self { depth: RenderTargetActions::CLEAR_DONT_STORE, stencil: RenderTargetActions::CLEAR_DONT_STORE };
    pub const LOAD_DEPTH_STENCIL_STORE: Self =
        Self { depth: RenderTargetActions::LOAD_STORE, stencil: RenderTargetActions::LOAD_STORE };
}

/// Which planes of the depth-stencil attachment the pass may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthStencilAccess {
    DepthReadStencilRead,
    DepthReadStencilWrite,
    DepthWriteStencilRead,
    DepthWriteStencilWrite,
}

impl DepthStencilAccess {
    pub fn is_depth_write(&self) -> bool {
        matches!(self, Self::DepthWriteStencilRead | Self::DepthWriteStencilWrite)
    }

    pub fn is_stencil_write(&self) -> bool {
        matches!(self, Self::DepthReadStencilWrite | Self::DepthWriteStencilWrite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
    pub const BLACK: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorAttachment {
    pub texture: TextureHandle,
    /// Single-sample texture receiving the resolve when `actions.store` is [`StoreOp::Resolve`].
    pub resolve_target: Option<TextureHandle>,
    pub actions: RenderTargetActions,
    pub clear_value: ClearColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthStencilAttachment {
    pub texture: TextureHandle,
    pub actions: DepthStencilTargetActions,
    pub access: DepthStencilAccess,
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

/// Descriptor for [`CommandEncoder::begin_render_pass`]. The target set is fixed for the whole scope.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDescriptor {
    pub label: &'static str,
    pub color_attachments: Vec<ColorAttachment>,
    pub depth_stencil_attachment: Option<DepthStencilAttachment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    /// Passes for fragments at or in front of the stored depth.
    NearOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_write_enabled: bool,
    pub depth_compare: CompareOp,
}

impl DepthStencilState {
    pub const ALWAYS_NO_WRITE: Self = Self { depth_write_enabled: false, depth_compare: CompareOp::Always };
    pub const ALWAYS_WRITE: Self = Self { depth_write_enabled: true, depth_compare: CompareOp::Always };
    pub const NEAR_OR_EQUAL_NO_WRITE: Self =
        Self { depth_write_enabled: false, depth_compare: CompareOp::NearOrEqual };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    #[default]
    None,
    Back,
    Front,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    #[default]
    Fill,
    Line,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RasterizerState {
    pub polygon_mode: PolygonMode,
    pub cull_mode: CullMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
}

/// Reference to a compiled shader entry point. Compilation itself belongs to the shader system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderRef {
    pub source: &'static str,
    pub entry_point: &'static str,
}

impl ShaderRef {
    pub const fn new(source: &'static str, entry_point: &'static str) -> Self {
        Self { source, entry_point }
    }
}

/// Full graphics pipeline state, data only. Backends cache compiled pipelines by value.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsPipelineState {
    pub label: &'static str,
    pub vertex_shader: ShaderRef,
    pub pixel_shader: ShaderRef,
    pub rasterizer: RasterizerState,
    pub depth_stencil: DepthStencilState,
    pub blend: ColorTargetBlend,
    pub topology: PrimitiveTopology,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Point,
    Bilinear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressMode {
    Clamp,
    Wrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub filter: FilterMode,
    pub address: AddressMode,
}

impl SamplerState {
    pub const POINT_CLAMP: Self = Self { filter: FilterMode::Point, address: AddressMode::Clamp };
    pub const BILINEAR_CLAMP: Self = Self { filter: FilterMode::Bilinear, address: AddressMode::Clamp };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport spanning `[min, max)` in pixels with the full depth range.
    pub fn from_bounds(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            x: min_x as f32,
            y: min_y as f32,
            width: (max_x - min_x) as f32,
            height: (max_y - min_y) as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Pixel rectangle used by [`CommandEncoder::copy_to_resolve_target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResolveRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

/// A screen-space rectangle draw: `dest_*` in pixels relative to the current viewport (of size
/// `target_size`), `source_*` in texels of the sampled texture (of size `texture_size`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangleDraw {
    pub dest_x: f32,
    pub dest_y: f32,
    pub dest_width: f32,
    pub dest_height: f32,
    pub source_u: f32,
    pub source_v: f32,
    pub source_width: f32,
    pub source_height: f32,
    pub target_size: Extent2d,
    pub texture_size: Extent2d,
}

/// Records GPU work for one frame. Exactly one render pass may be active at a time,
/// and resource transitions/resolves are only legal outside of it.
pub trait CommandEncoder: Debug {
    fn begin_render_pass(&mut self, desc: RenderPassDescriptor) -> Result<(), RhiError>;
    fn end_render_pass(&mut self) -> Result<(), RhiError>;
    /// Label of the active render pass, if any.
    fn active_render_pass(&self) -> Option<&'static str>;

    fn transition_resource(&mut self, texture: TextureHandle, access: ResourceAccess) -> Result<(), RhiError>;
    /// Resolve `source` (possibly multisampled) into `dest` over `rect`.
    fn copy_to_resolve_target(
        &mut self,
        source: TextureHandle,
        dest: TextureHandle,
        rect: ResolveRect,
    ) -> Result<(), RhiError>;

    fn set_viewport(&mut self, viewport: Viewport) -> Result<(), RhiError>;
    fn set_graphics_pipeline_state(&mut self, state: &GraphicsPipelineState) -> Result<(), RhiError>;
    fn bind_texture(&mut self, slot: &'static str, texture: TextureHandle, sampler: SamplerState) -> Result<(), RhiError>;
    fn draw_rectangle(&mut self, rect: &RectangleDraw) -> Result<(), RhiError>;
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        base_vertex: i32,
        first_instance: u32,
    ) -> Result<(), RhiError>;

    /// Overwrite a named uniform buffer with `data`.
    fn update_uniform_buffer(&mut self, name: &'static str, data: &[u8]) -> Result<(), RhiError>;

    fn push_debug_group(&mut self, label: &str);
    fn pop_debug_group(&mut self);

    fn is_inside_render_pass(&self) -> bool {
        self.active_render_pass().is_some()
    }

    /// End the active render pass if there is one. Returns the label of the pass that was closed.
    fn end_render_pass_if_open(&mut self) -> Result<Option<&'static str>, RhiError> {
        match self.active_render_pass() {
            Some(label) => {
                self.end_render_pass()?;
                Ok(Some(label))
            }
            None => Ok(None),
        }
    }
}
