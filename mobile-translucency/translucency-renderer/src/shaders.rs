//! Screen-pass shaders. Each variant carries its parameters and knows its pipeline state and bindings.

use translucency_rhi::{
    BlendComponent, BlendFactor, BlendOp, BlendState, ColorTargetBlend, ColorWrites, CommandEncoder, DepthStencilState,
    GraphicsPipelineState, PrimitiveTopology, RasterizerState, RectangleDraw, SamplerState, ShaderRef, TextureHandle,
};

use crate::error::TranslucencyResult;
use crate::view::{FeatureLevel, IntRect};

pub const SCREEN_VS: ShaderRef = ShaderRef::new("ScreenVertexShader", "Main");

/// Which scene textures a shader gets bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneTextureSetupMode {
    All,
    SceneColor,
    SceneDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneTextureParameters {
    pub scene_color: TextureHandle,
    pub scene_depth: TextureHandle,
    pub feature_level: FeatureLevel,
    pub setup_mode: SceneTextureSetupMode,
}

/// Where the downsample pass reads full-resolution depth from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthSource {
    SceneDepth(TextureHandle),
    /// Linear depth stored in scene colour alpha, for hardware that cannot sample depth.
    SceneColorAlpha(TextureHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsamplingParameters {
    pub low_res_color: TextureHandle,
    pub low_res_depth: TextureHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenPassShader {
    CopySceneAlpha(SceneTextureParameters),
    DownsampleSceneDepth(DepthSource),
    NearestDepthNeighborUpsampling(UpsamplingParameters),
}

impl ScreenPassShader {
    pub fn pixel_shader(&self) -> ShaderRef {
        match self {
            Self::CopySceneAlpha(_) => ShaderRef::new("TranslucentLightingShaders", "CopySceneAlphaMain"),
            Self::DownsampleSceneDepth(DepthSource::SceneDepth(_)) => {
                ShaderRef::new("MobileDownsampleDepthPixelShader", "Main")
            }
            Self::DownsampleSceneDepth(DepthSource::SceneColorAlpha(_)) => {
                ShaderRef::new("MobileDownsampleDepthPixelShader", "MainFromSceneColorAlpha")
            }
            Self::NearestDepthNeighborUpsampling(_) => {
                ShaderRef::new("MobileTranslucencyUpsampling", "MobileNearestDepthNeighborUpsamplingPS")
            }
        }
    }

    pub fn pipeline_state(&self) -> GraphicsPipelineState {
        let (label, depth_stencil, blend) = match self {
            Self::CopySceneAlpha(_) => ("copy_scene_alpha", DepthStencilState::ALWAYS_NO_WRITE, ColorTargetBlend::OPAQUE),
            // Depth-only: the colour attachment is just the target the translucency draw shares the pass with.
            Self::DownsampleSceneDepth(_) => {
                ("downsample_scene_depth", DepthStencilState::ALWAYS_WRITE, ColorTargetBlend::NO_COLOR_WRITES)
            }
            Self::NearestDepthNeighborUpsampling(_) => (
                "upsample_translucency",
                DepthStencilState::ALWAYS_NO_WRITE,
                ColorTargetBlend {
                    write_mask: ColorWrites::RGB,
                    blend: Some(BlendState {
                        color: BlendComponent::new(BlendOp::Add, BlendFactor::One, BlendFactor::SrcAlpha),
                        alpha: BlendComponent::REPLACE,
                    }),
                },
            ),
        };
        GraphicsPipelineState {
            label,
            vertex_shader: SCREEN_VS,
            pixel_shader: self.pixel_shader(),
            rasterizer: RasterizerState::default(),
            depth_stencil,
            blend,
            topology: PrimitiveTopology::TriangleList,
        }
    }

    /// Bind this shader's textures. Must be called inside the render pass, after the pipeline state.
    pub fn bind(&self, encoder: &mut dyn CommandEncoder) -> TranslucencyResult<()> {
        match *self {
            Self::CopySceneAlpha(scene) => {
                if matches!(scene.setup_mode, SceneTextureSetupMode::All | SceneTextureSetupMode::SceneColor) {
                    encoder.bind_texture("SceneColorTexture", scene.scene_color, SamplerState::POINT_CLAMP)?;
                }
                if matches!(scene.setup_mode, SceneTextureSetupMode::All | SceneTextureSetupMode::SceneDepth) {
                    encoder.bind_texture("SceneDepthTexture", scene.scene_depth, SamplerState::POINT_CLAMP)?;
                }
            }
            Self::DownsampleSceneDepth(DepthSource::SceneDepth(texture) | DepthSource::SceneColorAlpha(texture)) => {
                encoder.bind_texture("SceneDepthTexture", texture, SamplerState::POINT_CLAMP)?;
            }
            Self::NearestDepthNeighborUpsampling(params) => {
                encoder.bind_texture("LowResColorTexture", params.low_res_color, SamplerState::BILINEAR_CLAMP)?;
                encoder.bind_texture("LowResDepthTexture", params.low_res_depth, SamplerState::POINT_CLAMP)?;
            }
        }
        Ok(())
    }
}

/// Set the viewport to `viewport`, bind `shader` and draw one rectangle.
pub fn draw_screen_pass(
    encoder: &mut dyn CommandEncoder,
    shader: &ScreenPassShader,
    viewport: IntRect,
    rect: &RectangleDraw,
) -> TranslucencyResult<()> {
    encoder.set_viewport(viewport.viewport())?;
    encoder.set_graphics_pipeline_state(&shader.pipeline_state())?;
    shader.bind(encoder)?;
    encoder.draw_rectangle(rect)?;
    Ok(())
}
