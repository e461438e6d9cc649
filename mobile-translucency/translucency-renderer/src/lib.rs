//! Mobile translucency renderer: full-resolution or downsampled separate translucency,
//! inverse opacity for scene captures, and the scene alpha copy.

pub mod config;
pub mod downsample;
pub mod error;
pub mod frame;
pub mod inverse_opacity;
pub mod mesh_pass;
pub mod resources;
pub mod scene_alpha;
pub mod sequencer;
pub mod shaders;
pub mod translucency_draw;
pub mod uniforms;
pub mod upsample;
pub mod view;

pub use translucency_rhi as rhi;

pub use config::{FrameCapabilities, FrameSettings, TranslucencyConfig};
pub use downsample::{DownsamplePass, DownsampledTargets};
pub use error::{TranslucencyError, TranslucencyResult};
pub use frame::{FrameContext, NoMeshDraws};
pub use inverse_opacity::InverseOpacityPass;
pub use mesh_pass::{BlendMode, MaterialDesc, MeshBatch, MeshDrawCommandPasses, MeshPass, MeshPassDispatch};
pub use resources::{downsampled_extent, SceneRenderTargets};
pub use scene_alpha::SceneAlphaCopyPass;
pub use sequencer::{PassSequencer, TranslucencyPass, TranslucencyPlan};
pub use translucency_draw::TranslucencyDrawStage;
pub use uniforms::SceneUniformBuffers;
pub use upsample::UpsamplePass;
pub use view::{IntRect, ViewFamily, ViewId, ViewInfo, ViewMatrices, ViewUniformParameters};

use translucency_rhi::{CommandEncoder, Extent2d, TextureHandle};

pub struct TranslucencyRenderer {
    config: TranslucencyConfig,
    settings: FrameSettings,
    targets: SceneRenderTargets,
    uniforms: SceneUniformBuffers,
    sequencer: PassSequencer,
    inverse_opacity: InverseOpacityPass,
    scene_alpha_copy: SceneAlphaCopyPass,
}

impl TranslucencyRenderer {
    pub fn new() -> TranslucencyResult<Self> {
        Self::new_with_config(TranslucencyConfig::default())
    }

    pub fn new_with_config(config: TranslucencyConfig) -> TranslucencyResult<Self> {
        let settings = FrameSettings::resolve(&config, FrameCapabilities::default())?;
        let targets = SceneRenderTargets::new(&config, Extent2d::default());
        Ok(Self {
            config,
            settings,
            targets,
            uniforms: SceneUniformBuffers::new(),
            sequencer: PassSequencer::new(),
            inverse_opacity: InverseOpacityPass::new(),
            scene_alpha_copy: SceneAlphaCopyPass::new(),
        })
    }

    pub fn config(&self) -> &TranslucencyConfig { &self.config }
    pub fn settings(&self) -> &FrameSettings { &self.settings }
    pub fn targets(&self) -> &SceneRenderTargets { &self.targets }
    pub fn targets_mut(&mut self) -> &mut SceneRenderTargets { &mut self.targets }
    pub fn uniforms(&self) -> &SceneUniformBuffers { &self.uniforms }
    pub fn uniforms_mut(&mut self) -> &mut SceneUniformBuffers { &mut self.uniforms }

    /// Replace the configuration. Takes effect at the next [`begin_frame`](Self::begin_frame).
    pub fn set_config(&mut self, config: TranslucencyConfig) -> TranslucencyResult<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Resolve this frame's settings and size the scene targets to the family's buffer.
    pub fn begin_frame(&mut self, family: &ViewFamily, capabilities: FrameCapabilities) -> TranslucencyResult<()> {
        self.settings = FrameSettings::resolve(&self.config, capabilities)?;
        self.targets.begin_frame(&self.config, family.buffer_size);
        Ok(())
    }

    /// Record translucency for every view. Returns whether anything was recorded.
    pub fn render_translucency(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        family: &ViewFamily,
        mesh_passes: &dyn MeshPassDispatch,
    ) -> TranslucencyResult<bool> {
        let mut ctx = FrameContext { encoder, targets: &mut self.targets, mesh_passes, settings: &self.settings, family };
        self.sequencer.encode(&mut ctx, &mut self.uniforms)
    }

    /// Record the inverse opacity pass for `view`. Must be called with no render pass open.
    pub fn render_inverse_opacity(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        family: &ViewFamily,
        view: ViewId,
        mesh_passes: &dyn MeshPassDispatch,
    ) -> TranslucencyResult<bool> {
        let view = family.view(view).ok_or(TranslucencyError::UnknownView(view))?;
        let mut ctx = FrameContext { encoder, targets: &mut self.targets, mesh_passes, settings: &self.settings, family };
        self.inverse_opacity.encode(&mut ctx, &mut self.uniforms, view)
    }

    /// Copy scene colour into the scene alpha copy target and return it.
    pub fn copy_scene_alpha(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        family: &ViewFamily,
        view: ViewId,
    ) -> TranslucencyResult<TextureHandle> {
        let view = family.view(view).ok_or(TranslucencyError::UnknownView(view))?;
        let mut ctx = FrameContext {
            encoder,
            targets: &mut self.targets,
            mesh_passes: &NoMeshDraws,
            settings: &self.settings,
            family,
        };
        self.scene_alpha_copy.encode(&mut ctx, view)
    }
}
