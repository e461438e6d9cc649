//! Render target pool: owns every pooled target, hands out frame-scoped [`TextureHandle`]s keyed by
//! semantic name, and tracks the read/write state each target was last transitioned to.

use std::collections::HashMap;

use slotmap::SlotMap;
use translucency_rhi::{CommandEncoder, Extent2d, ResourceAccess, TextureFormat, TextureHandle, TextureUsage};

use crate::error::{TranslucencyError, TranslucencyResult};

/// Semantic slot a pooled target is cached under. One live target per semantic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSemantic {
    /// Scene colour render surface (multisampled when MSAA is on).
    SceneColor,
    /// Single-sample resolve of scene colour; only exists with MSAA.
    SceneColorResolve,
    SceneDepth,
    /// Low-resolution colour the separate translucency pass renders into.
    SeparateTranslucency,
    DownsampledTranslucencyDepth,
    SceneAlphaCopy,
}

impl TargetSemantic {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SceneColor => "scene_color",
            Self::SceneColorResolve => "scene_color_resolve",
            Self::SceneDepth => "scene_depth",
            Self::SeparateTranslucency => "separate_translucency",
            Self::DownsampledTranslucencyDepth => "downsampled_translucency_depth",
            Self::SceneAlphaCopy => "scene_alpha_copy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetDesc {
    pub extent: Extent2d,
    pub format: TextureFormat,
    pub sample_count: u32,
    pub usage: TextureUsage,
}

impl RenderTargetDesc {
    pub fn new(extent: Extent2d, format: TextureFormat, sample_count: u32) -> Self {
        let mut usage = TextureUsage::RENDER_ATTACHMENT;
        if sample_count <= 1 {
            usage |= TextureUsage::TEXTURE_BINDING | TextureUsage::COPY_SRC;
        }
        Self { extent, format, sample_count, usage }
    }
}

#[derive(Debug, Clone)]
pub struct PooledRenderTarget {
    pub semantic: TargetSemantic,
    pub desc: RenderTargetDesc,
    /// Last access recorded through [`RenderTargetPool::transition`]; `None` until first use.
    pub access: Option<ResourceAccess>,
    pub last_used_frame: u64,
}

#[derive(Debug, Default)]
pub struct RenderTargetPool {
    targets: SlotMap<TextureHandle, PooledRenderTarget>,
    by_semantic: HashMap<TargetSemantic, TextureHandle>,
    frame_index: u64,
}

impl RenderTargetPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the frame counter. Handles from earlier frames stay valid until trimmed or replaced.
    pub fn begin_frame(&mut self) -> u64 {
        self.frame_index += 1;
        self.frame_index
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Return the target cached under `semantic`, reallocating it when `desc` no longer matches.
    pub fn get_or_create(&mut self, semantic: TargetSemantic, desc: RenderTargetDesc) -> TranslucencyResult<TextureHandle> {
        if desc.extent.is_empty() {
            return Err(TranslucencyError::ZeroSizedTarget { name: semantic.name() });
        }
        if let Some(&handle) = self.by_semantic.get(&semantic) {
            if let Some(target) = self.targets.get_mut(handle) {
                if target.desc == desc {
                    target.last_used_frame = self.frame_index;
                    return Ok(handle);
                }
                log::debug!(
                    "reallocating {}: {:?} -> {:?}",
                    semantic.name(),
                    target.desc.extent,
                    desc.extent
                );
            }
            self.targets.remove(handle);
        } else {
            log::debug!("allocating {} {:?} {:?}x{}", semantic.name(), desc.extent, desc.format, desc.sample_count);
        }
        let handle = self.targets.insert(PooledRenderTarget {
            semantic,
            desc,
            access: None,
            last_used_frame: self.frame_index,
        });
        self.by_semantic.insert(semantic, handle);
        Ok(handle)
    }

    pub fn find(&self, semantic: TargetSemantic) -> Option<TextureHandle> {
        self.by_semantic.get(&semantic).copied()
    }

    pub fn get(&self, handle: TextureHandle) -> Option<&PooledRenderTarget> {
        self.targets.get(handle)
    }

    pub fn desc(&self, handle: TextureHandle) -> TranslucencyResult<RenderTargetDesc> {
        self.targets.get(handle).map(|t| t.desc).ok_or(TranslucencyError::UnknownTarget)
    }

    pub fn access(&self, handle: TextureHandle) -> Option<ResourceAccess> {
        self.targets.get(handle).and_then(|t| t.access)
    }

    /// Record a transition on `encoder` and remember the new state. Must be called outside a render pass.
    pub fn transition(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        handle: TextureHandle,
        access: ResourceAccess,
    ) -> TranslucencyResult<()> {
        let target = self.targets.get_mut(handle).ok_or(TranslucencyError::UnknownTarget)?;
        encoder.transition_resource(handle, access)?;
        log::trace!("{} -> {:?}", target.semantic.name(), access);
        target.access = Some(access);
        target.last_used_frame = self.frame_index;
        Ok(())
    }

    /// Release targets not used during the last `max_idle_frames` frames. Returns the released handles.
    pub fn trim(&mut self, max_idle_frames: u64) -> Vec<TextureHandle> {
        let frame = self.frame_index;
        let stale: Vec<TextureHandle> = self
            .targets
            .iter()
            .filter(|(_, t)| frame.saturating_sub(t.last_used_frame) > max_idle_frames)
            .map(|(h, _)| h)
            .collect();
        for &handle in &stale {
            if let Some(target) = self.targets.remove(handle) {
                log::debug!("releasing idle {}", target.semantic.name());
                self.by_semantic.remove(&target.semantic);
            }
        }
        stale
    }

    pub fn iter(&self) -> impl Iterator<Item = (TextureHandle, &PooledRenderTarget)> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use translucency_rhi::RecordingEncoder;

    fn color(w: u32, h: u32) -> RenderTargetDesc {
        RenderTargetDesc::new(Extent2d::new(w, h), TextureFormat::Rgba16Float, 1)
    }

    #[test]
    fn same_desc_reuses_handle() {
        let mut pool = RenderTargetPool::new();
        let a = pool.get_or_create(TargetSemantic::SeparateTranslucency, color(512, 384)).unwrap();
        let b = pool.get_or_create(TargetSemantic::SeparateTranslucency, color(512, 384)).unwrap();
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn resize_replaces_entry_and_invalidates_old_handle() {
        let mut pool = RenderTargetPool::new();
        let a = pool.get_or_create(TargetSemantic::SeparateTranslucency, color(512, 384)).unwrap();
        let b = pool.get_or_create(TargetSemantic::SeparateTranslucency, color(640, 360)).unwrap();
        assert_ne!(a, b);
        assert!(pool.get(a).is_none());
        assert_eq!(pool.desc(b).unwrap().extent, Extent2d::new(640, 360));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn zero_sized_target_is_rejected() {
        let mut pool = RenderTargetPool::new();
        assert!(matches!(
            pool.get_or_create(TargetSemantic::SceneColor, color(0, 10)),
            Err(TranslucencyError::ZeroSizedTarget { name: "scene_color" })
        ));
    }

    #[test]
    fn transition_tracks_access() {
        let mut pool = RenderTargetPool::new();
        let mut enc = RecordingEncoder::new();
        let h = pool.get_or_create(TargetSemantic::SceneDepth, color(4, 4)).unwrap();
        assert_eq!(pool.access(h), None);
        pool.transition(&mut enc, h, ResourceAccess::Readable).unwrap();
        assert_eq!(pool.access(h), Some(ResourceAccess::Readable));
        assert_eq!(enc.transitions(), vec![(h, ResourceAccess::Readable)]);
    }

    #[test]
    fn idle_targets_are_trimmed() {
        let mut pool = RenderTargetPool::new();
        pool.begin_frame();
        let idle = pool.get_or_create(TargetSemantic::SceneAlphaCopy, color(8, 8)).unwrap();
        let live = pool.get_or_create(TargetSemantic::SceneColor, color(8, 8)).unwrap();
        for _ in 0..4 {
            pool.begin_frame();
            pool.get_or_create(TargetSemantic::SceneColor, color(8, 8)).unwrap();
        }
        assert_eq!(pool.trim(3), vec![idle]);
        assert!(pool.find(TargetSemantic::SceneAlphaCopy).is_none());
        assert_eq!(pool.find(TargetSemantic::SceneColor), Some(live));
    }
}
