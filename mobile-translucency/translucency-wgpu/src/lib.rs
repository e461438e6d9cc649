//! wgpu backend for the mobile translucency renderer: owns the device and queue, mirrors the render
//! target pool as GPU textures and replays recorded frames.

mod convert;
mod device;
mod replay;
mod targets;

pub use convert::{color_operations, depth_operations, texture_format, texture_usages};
pub use device::request_headless_device;
pub use replay::{replay, ReplayStats};
pub use targets::WgpuTargetCache;

use translucency_renderer::rhi::RecordingEncoder;
use translucency_renderer::SceneRenderTargets;

pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    targets: WgpuTargetCache,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue, targets: WgpuTargetCache::new() }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
    pub fn targets(&self) -> &WgpuTargetCache {
        &self.targets
    }

    /// Bring GPU textures in line with the scene targets. Call after the frame was recorded,
    /// since recording is what allocates pooled targets.
    pub fn prepare(&mut self, scene: &SceneRenderTargets) -> usize {
        self.targets.sync(&self.device, scene.pool())
    }

    /// Replay `recording` into a fresh command buffer and submit it.
    pub fn submit(&mut self, recording: &RecordingEncoder) -> Result<ReplayStats, String> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("translucency_frame"),
        });
        let stats = replay(&mut encoder, &self.targets, recording.commands())?;
        self.queue.submit([encoder.finish()]);
        log::debug!("submitted {:?}", stats);
        Ok(stats)
    }
}
