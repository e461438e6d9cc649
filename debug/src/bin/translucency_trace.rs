//! Record one translucency frame on the in-memory encoder and print the command stream.
//!
//! Usage: translucency_trace [downsample|fetch] [scale] [views]

use translucency_renderer::rhi::{
    ClearColor, ColorAttachment, CommandEncoder, Extent2d, RecordedCommand, RecordingEncoder, RenderPassDescriptor,
    RenderTargetActions,
};
use translucency_renderer::{
    BlendMode, FrameCapabilities, IntRect, MaterialDesc, MeshBatch, MeshDrawCommandPasses, TranslucencyConfig,
    TranslucencyRenderer, ViewFamily, ViewId, ViewInfo, ViewMatrices,
};

fn main() -> Result<(), String> {
    env_logger::init();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let fetch = args.first().is_some_and(|a| a == "fetch");
    let scale: f32 = match args.get(1) {
        Some(s) => s.parse().map_err(|e| format!("scale `{s}`: {e}"))?,
        None => 0.5,
    };
    let view_count: u32 = match args.get(2) {
        Some(s) => s.parse().map_err(|e| format!("views `{s}`: {e}"))?,
        None => 1,
    };

    let buffer = Extent2d::new(1024 * view_count.max(1), 768);
    let mut family = ViewFamily::new(buffer);
    for i in 0..view_count.max(1) {
        let rect = IntRect::new(1024 * i as i32, 0, 1024 * (i as i32 + 1), 768);
        let mut view = ViewInfo::new(ViewId(i), rect, buffer, ViewMatrices::default());
        view.is_mobile_multi_view = view_count > 1;
        family = family.with_view(view);
    }

    let batches: Vec<MeshBatch> = (0..3)
        .map(|i| MeshBatch {
            primitive_id: i,
            distance_to_view: 10.0 - i as f32,
            material: MaterialDesc { blend_mode: BlendMode::Translucent, ..Default::default() },
            ..Default::default()
        })
        .collect();
    let mut passes = MeshDrawCommandPasses::new();
    for view in &family.views {
        passes.build_view(view.id, &batches, true);
    }

    let config = TranslucencyConfig { downsampling_scale: scale, ..Default::default() };
    let mut renderer = TranslucencyRenderer::new_with_config(config).map_err(|e| e.to_string())?;
    let capabilities = FrameCapabilities { supports_frame_buffer_fetch: fetch, ..Default::default() };
    renderer.begin_frame(&family, capabilities).map_err(|e| e.to_string())?;

    log::info!("{} path, scale {scale}, {} view(s)", if fetch { "frame buffer fetch" } else { "downsample" }, family.views.len());
    let mut enc = RecordingEncoder::new();
    let scene_color = renderer.targets_mut().alloc_scene_color().map_err(|e| e.to_string())?;
    enc.begin_render_pass(RenderPassDescriptor {
        label: "MobileBasePass",
        color_attachments: vec![ColorAttachment {
            texture: scene_color.surface,
            resolve_target: None,
            actions: RenderTargetActions::CLEAR_STORE,
            clear_value: ClearColor::BLACK,
        }],
        depth_stencil_attachment: None,
    })
    .map_err(|e| e.to_string())?;
    let rendered = renderer.render_translucency(&mut enc, &family, &passes).map_err(|e| e.to_string())?;
    enc.end_render_pass_if_open().map_err(|e| e.to_string())?;
    let dirty = renderer
        .render_inverse_opacity(&mut enc, &family, ViewId(0), &passes)
        .map_err(|e| e.to_string())?;

    let mut depth = 0usize;
    for command in enc.commands() {
        if matches!(command, RecordedCommand::PopDebugGroup | RecordedCommand::EndRenderPass { .. }) {
            depth = depth.saturating_sub(1);
        }
        println!("{:indent$}{}", "", describe(command), indent = depth * 2);
        if matches!(command, RecordedCommand::PushDebugGroup(_) | RecordedCommand::BeginRenderPass(_)) {
            depth += 1;
        }
    }
    println!("translucency rendered: {rendered}, inverse opacity dirty: {dirty}, {} commands", enc.commands().len());
    Ok(())
}

fn describe(command: &RecordedCommand) -> String {
    match command {
        RecordedCommand::BeginRenderPass(desc) => format!("begin `{}`", desc.label),
        RecordedCommand::EndRenderPass { label } => format!("end `{label}`"),
        RecordedCommand::SetPipelineState(state) => format!("pipeline {}", state.label),
        RecordedCommand::DrawRectangle(r) => format!(
            "rect dest {}x{} <- source ({}, {}) {}x{} of {}x{}",
            r.dest_width,
            r.dest_height,
            r.source_u,
            r.source_v,
            r.source_width,
            r.source_height,
            r.texture_size.width,
            r.texture_size.height
        ),
        RecordedCommand::UpdateUniformBuffer { name, data } => format!("uniforms {name} ({} bytes)", data.len()),
        RecordedCommand::PushDebugGroup(label) => format!("[{label}]"),
        RecordedCommand::PopDebugGroup => "[/]".to_string(),
        other => format!("{other:?}"),
    }
}
