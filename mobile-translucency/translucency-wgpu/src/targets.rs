//! GPU storage behind pooled render target handles.

use slotmap::SecondaryMap;
use translucency_renderer::resources::{RenderTargetDesc, RenderTargetPool};
use translucency_rhi::TextureHandle;

use crate::convert::{texture_format, texture_usages};

struct GpuTarget {
    desc: RenderTargetDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// One `wgpu::Texture` per live pool entry, keyed by the pool's handles.
#[derive(Default)]
pub struct WgpuTargetCache {
    targets: SecondaryMap<TextureHandle, GpuTarget>,
}

impl WgpuTargetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror `pool`: create textures for new or reallocated handles and drop the ones the pool released.
    /// Returns how many textures were created.
    pub fn sync(&mut self, device: &wgpu::Device, pool: &RenderTargetPool) -> usize {
        self.targets.retain(|handle, _| pool.get(handle).is_some());
        let mut created = 0;
        for (handle, target) in pool.iter() {
            if self.targets.get(handle).is_some_and(|gpu| gpu.desc == target.desc) {
                continue;
            }
            let desc = target.desc;
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some(target.semantic.name()),
                size: wgpu::Extent3d { width: desc.extent.width, height: desc.extent.height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: desc.sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: texture_format(desc.format),
                usage: texture_usages(desc.usage, desc.sample_count),
                view_formats: &[],
            });
            let view = texture.create_view(&Default::default());
            log::debug!("created gpu texture {} {}x{}", target.semantic.name(), desc.extent.width, desc.extent.height);
            self.targets.insert(handle, GpuTarget { desc, texture, view });
            created += 1;
        }
        created
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&wgpu::Texture> {
        self.targets.get(handle).map(|t| &t.texture)
    }

    pub fn view(&self, handle: TextureHandle) -> Option<&wgpu::TextureView> {
        self.targets.get(handle).map(|t| &t.view)
    }

    pub fn desc(&self, handle: TextureHandle) -> Option<RenderTargetDesc> {
        self.targets.get(handle).map(|t| t.desc)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
