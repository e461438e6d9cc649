//! Record a downsampled translucency frame and replay it on a headless wgpu device.

use translucency_renderer::rhi::{
    ClearColor, ColorAttachment, CommandEncoder, Extent2d, RecordingEncoder, RenderPassDescriptor, RenderTargetActions,
};
use translucency_renderer::{
    BlendMode, FrameCapabilities, IntRect, MaterialDesc, MeshBatch, MeshDrawCommandPasses, TranslucencyRenderer,
    ViewFamily, ViewId, ViewInfo, ViewMatrices,
};
use translucency_wgpu::{request_headless_device, WgpuBackend};

fn main() -> Result<(), String> {
    env_logger::init();
    let (device, queue) = request_headless_device()?;
    let mut backend = WgpuBackend::new(device, queue);

    let buffer = Extent2d::new(800, 600);
    let family =
        ViewFamily::new(buffer).with_view(ViewInfo::new(ViewId(0), IntRect::from_extent(buffer), buffer, ViewMatrices::default()));
    let batch = MeshBatch {
        material: MaterialDesc { blend_mode: BlendMode::Translucent, ..Default::default() },
        ..Default::default()
    };
    let mut passes = MeshDrawCommandPasses::new();
    passes.build_view(ViewId(0), &[batch], true);

    let mut renderer = TranslucencyRenderer::new().map_err(|e| e.to_string())?;
    renderer.begin_frame(&family, FrameCapabilities::default()).map_err(|e| e.to_string())?;

    let mut enc = RecordingEncoder::new();
    let scene_color = renderer.targets_mut().alloc_scene_color().map_err(|e| e.to_string())?;
    enc.begin_render_pass(RenderPassDescriptor {
        label: "MobileBasePass",
        color_attachments: vec![ColorAttachment {
            texture: scene_color.surface,
            resolve_target: None,
            actions: RenderTargetActions::CLEAR_STORE,
            clear_value: ClearColor { r: 0.2, g: 0.3, b: 0.4, a: 1.0 },
        }],
        depth_stencil_attachment: None,
    })
    .map_err(|e| e.to_string())?;
    renderer.render_translucency(&mut enc, &family, &passes).map_err(|e| e.to_string())?;
    enc.end_render_pass_if_open().map_err(|e| e.to_string())?;
    renderer.copy_scene_alpha(&mut enc, &family, ViewId(0)).map_err(|e| e.to_string())?;

    let created = backend.prepare(renderer.targets());
    log::info!("recorded {} commands", enc.commands().len());
    let stats = backend.submit(&enc)?;
    let _ = backend.device().poll(wgpu::Maintain::Wait);
    println!("headless_replay: {created} textures, {stats:?}");
    Ok(())
}
