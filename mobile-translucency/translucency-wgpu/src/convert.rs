//! Recorded RHI formats, usages and attachment actions -> wgpu.

use translucency_rhi::{ClearColor, LoadOp, RenderTargetActions, StoreOp, TextureFormat, TextureUsage};

pub fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TextureFormat::R32Float => wgpu::TextureFormat::R32Float,
        TextureFormat::D24UnormS8Uint => wgpu::TextureFormat::Depth24PlusStencil8,
        TextureFormat::D32Float => wgpu::TextureFormat::Depth32Float,
        TextureFormat::D32FloatS8Uint => wgpu::TextureFormat::Depth32FloatStencil8,
    }
}

/// Multisampled targets only keep `RENDER_ATTACHMENT`; wgpu rejects copies of them.
pub fn texture_usages(usage: TextureUsage, sample_count: u32) -> wgpu::TextureUsages {
    let mut out = wgpu::TextureUsages::empty();
    if usage.contains(TextureUsage::RENDER_ATTACHMENT) {
        out |= wgpu::TextureUsages::RENDER_ATTACHMENT;
    }
    if sample_count > 1 {
        return out;
    }
    if usage.contains(TextureUsage::TEXTURE_BINDING) {
        out |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    if usage.contains(TextureUsage::COPY_SRC) {
        out |= wgpu::TextureUsages::COPY_SRC;
    }
    if usage.contains(TextureUsage::COPY_DST) {
        out |= wgpu::TextureUsages::COPY_DST;
    }
    out
}

fn store_op(store: StoreOp) -> wgpu::StoreOp {
    match store {
        // the resolve itself comes from the attachment's resolve target
        StoreOp::Store | StoreOp::Resolve => wgpu::StoreOp::Store,
        StoreOp::DontCare => wgpu::StoreOp::Discard,
    }
}

pub fn color_operations(actions: RenderTargetActions, clear: ClearColor) -> wgpu::Operations<wgpu::Color> {
    let load = match actions.load {
        LoadOp::Load => wgpu::LoadOp::Load,
        // wgpu has no undefined load
        LoadOp::Clear | LoadOp::DontCare => wgpu::LoadOp::Clear(wgpu::Color {
            r: clear.r as f64,
            g: clear.g as f64,
            b: clear.b as f64,
            a: clear.a as f64,
        }),
    };
    wgpu::Operations { load, store: store_op(actions.store) }
}

pub fn depth_operations<V: Copy>(actions: RenderTargetActions, clear: V) -> wgpu::Operations<V> {
    let load = match actions.load {
        LoadOp::Load => wgpu::LoadOp::Load,
        LoadOp::Clear | LoadOp::DontCare => wgpu::LoadOp::Clear(clear),
    };
    wgpu::Operations { load, store: store_op(actions.store) }
}
