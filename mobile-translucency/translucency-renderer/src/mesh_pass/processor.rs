//! Mesh pass processors: turn mesh batches into translucent draw commands.

use translucency_rhi::{
    BlendComponent, BlendFactor, BlendOp, BlendState, ColorTargetBlend, ColorWrites, CullMode, DepthStencilState,
    GraphicsPipelineState, PolygonMode, PrimitiveTopology, RasterizerState, ShaderRef,
};

use super::{MeshDrawCommand, MeshDrawCommandPass, MeshPass};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Opaque,
    Masked,
    Translucent,
    Additive,
    Modulate,
    AlphaComposite,
}

impl BlendMode {
    pub fn is_translucent(&self) -> bool {
        matches!(self, Self::Translucent | Self::Additive | Self::Modulate | Self::AlphaComposite)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialDesc {
    pub blend_mode: BlendMode,
    /// Rendered by post processing after depth of field instead of the standard translucency pass.
    pub render_after_dof: bool,
    pub two_sided: bool,
    pub wireframe: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBatch {
    pub primitive_id: u32,
    pub mesh_id_in_primitive: u16,
    pub use_for_material: bool,
    pub material: MaterialDesc,
    pub index_count: u32,
    pub instance_count: u32,
    pub first_index: u32,
    pub base_vertex: i32,
    /// Primitive-wide bias; higher priorities draw later.
    pub translucency_sort_priority: i16,
    pub distance_to_view: f32,
}

impl Default for MeshBatch {
    fn default() -> Self {
        Self {
            primitive_id: 0,
            mesh_id_in_primitive: 0,
            use_for_material: true,
            material: MaterialDesc::default(),
            index_count: 3,
            instance_count: 1,
            first_index: 0,
            base_vertex: 0,
            translucency_sort_priority: 0,
            distance_to_view: 0.0,
        }
    }
}

/// Accepts mesh batches and produces one finished draw list.
pub trait MeshPassProcessor {
    fn add_mesh_batch(&mut self, batch: &MeshBatch);
    fn finish(self) -> MeshDrawCommandPass;
}

const TRANSLUCENT_BASE_PASS_VS: ShaderRef = ShaderRef::new("MobileBasePassVertexShader", "Main");
const TRANSLUCENT_BASE_PASS_PS: ShaderRef = ShaderRef::new("MobileBasePassPixelShader", "Main");
const OPACITY_ONLY_VS: ShaderRef = ShaderRef::new("MobileOpacityShaders", "MainVS");
const OPACITY_ONLY_PS: ShaderRef = ShaderRef::new("MobileOpacityShaders", "MainPS");

/// Colour blend of a translucent material. Alpha always accumulates transmittance.
pub fn translucent_render_state(blend_mode: BlendMode) -> ColorTargetBlend {
    let transmittance = BlendComponent::new(BlendOp::Add, BlendFactor::Zero, BlendFactor::OneMinusSrcAlpha);
    let color = match blend_mode {
        BlendMode::Additive => BlendComponent::new(BlendOp::Add, BlendFactor::One, BlendFactor::One),
        BlendMode::Modulate => BlendComponent::new(BlendOp::Add, BlendFactor::DstColor, BlendFactor::Zero),
        BlendMode::AlphaComposite => BlendComponent::new(BlendOp::Add, BlendFactor::One, BlendFactor::OneMinusSrcAlpha),
        _ => BlendComponent::new(BlendOp::Add, BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha),
    };
    let alpha = match blend_mode {
        BlendMode::Additive | BlendMode::Modulate => BlendComponent::new(BlendOp::Add, BlendFactor::Zero, BlendFactor::One),
        _ => transmittance,
    };
    ColorTargetBlend { write_mask: ColorWrites::ALL, blend: Some(BlendState { color, alpha }) }
}

/// Opacity-only accumulation: colour is multiplied by itself, alpha by `1 - opacity`.
pub fn inverse_opacity_render_state() -> ColorTargetBlend {
    ColorTargetBlend {
        write_mask: ColorWrites::ALPHA,
        blend: Some(BlendState {
            color: BlendComponent::new(BlendOp::Add, BlendFactor::DstColor, BlendFactor::Zero),
            alpha: BlendComponent::new(BlendOp::Add, BlendFactor::Zero, BlendFactor::OneMinusSrcAlpha),
        }),
    }
}

fn rasterizer_state(material: &MaterialDesc) -> RasterizerState {
    RasterizerState {
        polygon_mode: if material.wireframe { PolygonMode::Line } else { PolygonMode::Fill },
        cull_mode: if material.two_sided { CullMode::None } else { CullMode::Back },
    }
}

/// Back-to-front key: priority first, then farther meshes before nearer ones.
fn translucent_sort_key(batch: &MeshBatch) -> u64 {
    let priority = (i32::from(batch.translucency_sort_priority) + 0x8000) as u64;
    let bits = batch.distance_to_view.to_bits();
    let ordered = if bits & 0x8000_0000 != 0 { !bits } else { bits | 0x8000_0000 };
    (priority << 32) | u64::from(u32::MAX - ordered)
}

fn is_translucent_material_batch(batch: &MeshBatch) -> bool {
    batch.use_for_material && batch.material.blend_mode.is_translucent()
}

fn build_command(batch: &MeshBatch, pipeline_state: GraphicsPipelineState) -> MeshDrawCommand {
    MeshDrawCommand {
        pipeline_state,
        index_count: batch.index_count,
        instance_count: batch.instance_count,
        first_index: batch.first_index,
        base_vertex: batch.base_vertex,
        primitive_id: batch.primitive_id,
        sort_key: translucent_sort_key(batch),
    }
}

/// Builds `TranslucencyAll` or `TranslucencyStandard` draw lists.
#[derive(Debug)]
pub struct TranslucencyMeshProcessor {
    pass: MeshPass,
    commands: Vec<MeshDrawCommand>,
}

impl TranslucencyMeshProcessor {
    pub fn new(pass: MeshPass) -> Self {
        Self { pass, commands: Vec::new() }
    }

    fn accepts(&self, material: &MaterialDesc) -> bool {
        match self.pass {
            MeshPass::TranslucencyStandard => !material.render_after_dof,
            _ => true,
        }
    }
}

impl MeshPassProcessor for TranslucencyMeshProcessor {
    fn add_mesh_batch(&mut self, batch: &MeshBatch) {
        if !is_translucent_material_batch(batch) || !self.accepts(&batch.material) {
            return;
        }
        let pipeline_state = GraphicsPipelineState {
            label: "translucent_base_pass",
            vertex_shader: TRANSLUCENT_BASE_PASS_VS,
            pixel_shader: TRANSLUCENT_BASE_PASS_PS,
            rasterizer: rasterizer_state(&batch.material),
            depth_stencil: DepthStencilState::NEAR_OR_EQUAL_NO_WRITE,
            blend: translucent_render_state(batch.material.blend_mode),
            topology: PrimitiveTopology::TriangleList,
        };
        self.commands.push(build_command(batch, pipeline_state));
    }

    fn finish(self) -> MeshDrawCommandPass {
        MeshDrawCommandPass::from_commands(self.commands)
    }
}

/// Builds the `MobileInverseOpacity` draw list. Every translucent material uses the same pass state.
#[derive(Debug, Default)]
pub struct InverseOpacityMeshProcessor {
    commands: Vec<MeshDrawCommand>,
}

impl InverseOpacityMeshProcessor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MeshPassProcessor for InverseOpacityMeshProcessor {
    fn add_mesh_batch(&mut self, batch: &MeshBatch) {
        if !is_translucent_material_batch(batch) {
            return;
        }
        let pipeline_state = GraphicsPipelineState {
            label: "inverse_opacity",
            vertex_shader: OPACITY_ONLY_VS,
            pixel_shader: OPACITY_ONLY_PS,
            rasterizer: rasterizer_state(&batch.material),
            depth_stencil: DepthStencilState::NEAR_OR_EQUAL_NO_WRITE,
            blend: inverse_opacity_render_state(),
            topology: PrimitiveTopology::TriangleList,
        };
        self.commands.push(build_command(batch, pipeline_state));
    }

    fn finish(self) -> MeshDrawCommandPass {
        MeshDrawCommandPass::from_commands(self.commands)
    }
}
