//! End-to-end frames recorded on the in-memory encoder.

use proptest::prelude::*;

use translucency_renderer::mesh_pass::translucent_render_state;
use translucency_renderer::rhi::{
    ClearColor, ColorAttachment, CommandEncoder, Extent2d, GraphicsPipelineState, RecordedCommand, RecordingEncoder,
    RenderPassDescriptor, RenderTargetActions,
};
use translucency_renderer::uniforms::{TRANSLUCENT_BASE_PASS_UNIFORM_BUFFER, VIEW_UNIFORM_BUFFER};
use translucency_renderer::{
    downsampled_extent, BlendMode, FrameCapabilities, IntRect, MaterialDesc, MeshBatch, MeshDrawCommandPasses,
    TranslucencyConfig, TranslucencyError, TranslucencyRenderer, ViewFamily, ViewId, ViewInfo, ViewMatrices,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

const NO_FETCH: FrameCapabilities =
    FrameCapabilities { supports_frame_buffer_fetch: false, supports_depth_fetch: true, debug_view_shaders: false };
const FETCH: FrameCapabilities =
    FrameCapabilities { supports_frame_buffer_fetch: true, supports_depth_fetch: true, debug_view_shaders: false };

fn translucent_batch(primitive_id: u32) -> MeshBatch {
    MeshBatch {
        primitive_id,
        material: MaterialDesc { blend_mode: BlendMode::Translucent, ..Default::default() },
        distance_to_view: primitive_id as f32,
        ..Default::default()
    }
}

fn single_view(width: u32, height: u32) -> ViewFamily {
    let buffer = Extent2d::new(width, height);
    ViewFamily::new(buffer).with_view(ViewInfo::new(ViewId(0), IntRect::from_extent(buffer), buffer, ViewMatrices::default()))
}

fn passes_for(family: &ViewFamily, batches: &[MeshBatch]) -> MeshDrawCommandPasses {
    let mut passes = MeshDrawCommandPasses::new();
    for view in &family.views {
        passes.build_view(view.id, batches, true);
    }
    passes
}

fn renderer(config: TranslucencyConfig, family: &ViewFamily, capabilities: FrameCapabilities) -> TranslucencyRenderer {
    let mut renderer = TranslucencyRenderer::new_with_config(config).unwrap();
    renderer.begin_frame(family, capabilities).unwrap();
    renderer
}

/// Open the scene colour pass the base pass would have left bound.
fn open_scene_pass(renderer: &mut TranslucencyRenderer, enc: &mut RecordingEncoder) {
    let scene_color = renderer.targets_mut().alloc_scene_color().unwrap();
    enc.begin_render_pass(RenderPassDescriptor {
        label: "MobileBasePass",
        color_attachments: vec![ColorAttachment {
            texture: scene_color.surface,
            resolve_target: None,
            actions: RenderTargetActions::LOAD_STORE,
            clear_value: ClearColor::BLACK,
        }],
        depth_stencil_attachment: None,
    })
    .unwrap();
}

fn pipeline(enc: &RecordingEncoder, label: &str) -> GraphicsPipelineState {
    enc.commands()
        .iter()
        .find_map(|c| match c {
            RecordedCommand::SetPipelineState(state) if state.label == label => Some(state.clone()),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no `{label}` pipeline recorded"))
}

/// Each recorded command paired with the render pass open when it was recorded.
fn commands_by_pass(enc: &RecordingEncoder) -> Vec<(Option<&'static str>, &RecordedCommand)> {
    let mut active = None;
    let mut out = Vec::new();
    for command in enc.commands() {
        match command {
            RecordedCommand::BeginRenderPass(desc) => active = Some(desc.label),
            RecordedCommand::EndRenderPass { .. } => active = None,
            _ => {}
        }
        out.push((active, command));
    }
    out
}

fn side_by_side_multi_view() -> ViewFamily {
    let buffer = Extent2d::new(2048, 1024);
    let mut left = ViewInfo::new(ViewId(0), IntRect::new(0, 0, 1024, 1024), buffer, ViewMatrices::default());
    let mut right = ViewInfo::new(ViewId(1), IntRect::new(1024, 0, 2048, 1024), buffer, ViewMatrices::default());
    left.is_mobile_multi_view = true;
    right.is_mobile_multi_view = true;
    ViewFamily::new(buffer).with_view(left).with_view(right)
}

#[test]
fn downsample_and_upsample_regions_at_half_scale() {
    init_logging();
    let family = single_view(1024, 768);
    let passes = passes_for(&family, &[translucent_batch(1)]);
    let mut renderer = renderer(TranslucencyConfig::default(), &family, NO_FETCH);
    let mut enc = RecordingEncoder::new();
    open_scene_pass(&mut renderer, &mut enc);

    assert!(renderer.render_translucency(&mut enc, &family, &passes).unwrap());

    assert_eq!(
        enc.render_pass_labels(),
        vec!["MobileBasePass", "DownsampleDepthAndSeparatePass", "UpsampleTranslucency"]
    );
    let downsample = enc.render_passes()[1];
    let low_res_depth = downsample.depth_stencil_attachment.as_ref().unwrap().texture;
    assert_eq!(renderer.targets().pool().desc(low_res_depth).unwrap().extent, Extent2d::new(512, 384));

    let rects = enc.rectangles();
    let upsample = rects[1];
    assert_eq!((upsample.source_width, upsample.source_height), (512.0, 384.0));
    assert_eq!((upsample.dest_width, upsample.dest_height), (1024.0, 768.0));
    assert_eq!(enc.indexed_draw_count(), 1);
    assert_eq!(enc.active_render_pass(), Some("UpsampleTranslucency"));
    assert_eq!(enc.debug_group_depth(), 0);
}

#[test]
fn zero_translucent_primitives_record_nothing() {
    init_logging();
    let family = single_view(1024, 768);
    let opaque = MeshBatch::default();
    let passes = passes_for(&family, &[opaque]);

    for capabilities in [NO_FETCH, FETCH] {
        let mut renderer = renderer(TranslucencyConfig::default(), &family, capabilities);
        let mut enc = RecordingEncoder::new();
        assert!(!renderer.render_translucency(&mut enc, &family, &passes).unwrap());
        assert!(enc.is_empty());
        assert!(enc.transitions().is_empty());

        assert!(!renderer.render_inverse_opacity(&mut enc, &family, ViewId(0), &passes).unwrap());
        assert_eq!(enc.indexed_draw_count(), 0);
    }
}

#[test]
fn multi_view_draws_with_primary_rect() {
    init_logging();
    let family = side_by_side_multi_view();
    let passes = passes_for(&family, &[translucent_batch(1), translucent_batch(2)]);

    let mut renderer = renderer(TranslucencyConfig::default(), &family, FETCH);
    let mut enc = RecordingEncoder::new();
    open_scene_pass(&mut renderer, &mut enc);
    renderer.render_translucency(&mut enc, &family, &passes).unwrap();

    let primary = family.views[0].view_rect.viewport();
    assert_eq!(enc.viewports(), vec![primary, primary]);
    assert_eq!(enc.indexed_draw_count(), 4);
    assert!(enc.commands().contains(&RecordedCommand::PushDebugGroup("View1".to_string())));
    assert_eq!(enc.active_render_pass(), Some("MobileBasePass"));
}

#[test]
fn multi_view_downsample_composites_each_view_in_its_own_rect() {
    init_logging();
    let family = side_by_side_multi_view();
    let passes = passes_for(&family, &[translucent_batch(1)]);
    let mut renderer = renderer(TranslucencyConfig::default(), &family, NO_FETCH);
    let mut enc = RecordingEncoder::new();
    open_scene_pass(&mut renderer, &mut enc);

    assert!(renderer.render_translucency(&mut enc, &family, &passes).unwrap());

    let upsample_viewports: Vec<_> = commands_by_pass(&enc)
        .into_iter()
        .filter_map(|(pass, c)| match (pass, c) {
            (Some("UpsampleTranslucency"), RecordedCommand::SetViewport(v)) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(upsample_viewports, vec![family.views[0].view_rect.viewport(), family.views[1].view_rect.viewport()]);

    let rects = enc.rectangles();
    let upsample_sources: Vec<_> = [rects[1], rects[3]].iter().map(|r| (r.source_u, r.source_width)).collect();
    assert_eq!(upsample_sources, vec![(0.0, 512.0), (512.0, 512.0)]);
    assert_eq!(enc.indexed_draw_count(), 2);
    assert_eq!(enc.active_render_pass(), Some("UpsampleTranslucency"));
}

#[test]
fn draws_only_on_hidden_views_record_nothing() {
    init_logging();
    let mut family = single_view(512, 512);
    family.views[0].should_render = false;
    let passes = passes_for(&family, &[translucent_batch(1)]);

    for capabilities in [NO_FETCH, FETCH] {
        let mut renderer = renderer(TranslucencyConfig::default(), &family, capabilities);
        let mut enc = RecordingEncoder::new();
        open_scene_pass(&mut renderer, &mut enc);
        let before = enc.commands().len();

        assert!(!renderer.render_translucency(&mut enc, &family, &passes).unwrap());
        assert_eq!(enc.commands().len(), before);
        assert_eq!(enc.active_render_pass(), Some("MobileBasePass"));
    }
}

#[test]
fn downsample_debug_groups_open_outside_render_passes() {
    init_logging();
    for family in [single_view(640, 480), side_by_side_multi_view()] {
        let passes = passes_for(&family, &[translucent_batch(1)]);
        let mut renderer = renderer(TranslucencyConfig::default(), &family, NO_FETCH);
        let mut enc = RecordingEncoder::new();
        open_scene_pass(&mut renderer, &mut enc);
        renderer.render_translucency(&mut enc, &family, &passes).unwrap();

        // Groups that close in a later pass than they opened must have opened at encoder level.
        let mut stack: Vec<(Option<&str>, &str)> = Vec::new();
        for (pass, command) in commands_by_pass(&enc) {
            match command {
                RecordedCommand::PushDebugGroup(label) => stack.push((pass, label.as_str())),
                RecordedCommand::PopDebugGroup => {
                    let (opened_in, label) = stack.pop().unwrap();
                    assert!(opened_in.is_none() || opened_in == pass, "`{label}` opened in {opened_in:?}, closed in {pass:?}");
                }
                _ => {}
            }
        }
        assert!(stack.is_empty());
        assert_eq!(enc.debug_group_depth(), 0);
    }
}

#[test]
fn debug_view_shaders_skip_the_uniform_sync_on_the_downsample_path() {
    init_logging();
    let family = single_view(1024, 768);
    let passes = passes_for(&family, &[translucent_batch(1)]);
    let capabilities = FrameCapabilities { debug_view_shaders: true, ..NO_FETCH };
    let mut renderer = renderer(TranslucencyConfig::default(), &family, capabilities);
    let mut enc = RecordingEncoder::new();

    renderer.render_translucency(&mut enc, &family, &passes).unwrap();

    let writes: Vec<&str> = enc
        .commands()
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::UpdateUniformBuffer { name, .. } => Some(*name),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec![VIEW_UNIFORM_BUFFER, VIEW_UNIFORM_BUFFER], "scaled override, restore");
    assert!(!writes.contains(&TRANSLUCENT_BASE_PASS_UNIFORM_BUFFER));
    assert_eq!(enc.indexed_draw_count(), 0);
}

#[test]
fn view_uniforms_are_restored_bit_identically() {
    init_logging();
    let family = single_view(1024, 768);
    let passes = passes_for(&family, &[translucent_batch(1)]);
    let mut renderer = renderer(TranslucencyConfig::default(), &family, NO_FETCH);
    let mut enc = RecordingEncoder::new();

    renderer.render_translucency(&mut enc, &family, &passes).unwrap();

    let cached = bytemuck::bytes_of(&family.views[0].cached_uniforms).to_vec();
    let view_writes: Vec<&Vec<u8>> = enc
        .commands()
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::UpdateUniformBuffer { name: VIEW_UNIFORM_BUFFER, data } => Some(data),
            _ => None,
        })
        .collect();
    assert_eq!(view_writes.len(), 3, "sync, scaled override, restore");
    assert_ne!(view_writes[1], &cached);
    assert_eq!(view_writes[2], &cached);
    assert_eq!(
        renderer.uniforms().view_uniforms().map(|p| bytemuck::bytes_of(p).to_vec()),
        Some(cached)
    );
}

#[test]
fn inverse_opacity_runs_twice_in_a_row() {
    init_logging();
    let family = single_view(640, 480);
    let passes = passes_for(&family, &[translucent_batch(1)]);
    let mut renderer = renderer(TranslucencyConfig::default(), &family, NO_FETCH);
    let mut enc = RecordingEncoder::new();

    assert!(renderer.render_inverse_opacity(&mut enc, &family, ViewId(0), &passes).unwrap());
    assert!(renderer.render_inverse_opacity(&mut enc, &family, ViewId(0), &passes).unwrap());
    assert_eq!(enc.render_pass_labels(), vec!["RenderInverseOpacity", "RenderInverseOpacity"]);
    assert!(!enc.is_inside_render_pass());
}

#[test]
fn inverse_opacity_inside_open_pass_is_an_error() {
    init_logging();
    let family = single_view(640, 480);
    let passes = passes_for(&family, &[translucent_batch(1)]);
    let mut renderer = renderer(TranslucencyConfig::default(), &family, NO_FETCH);
    let mut enc = RecordingEncoder::new();
    open_scene_pass(&mut renderer, &mut enc);

    assert_eq!(
        renderer.render_inverse_opacity(&mut enc, &family, ViewId(0), &passes),
        Err(TranslucencyError::NestedRenderPass { stage: "inverse opacity", active: "MobileBasePass" })
    );
}

#[test]
fn full_resolution_path_needs_the_scene_pass() {
    init_logging();
    let family = single_view(256, 256);
    let passes = passes_for(&family, &[translucent_batch(1)]);
    let mut renderer = renderer(TranslucencyConfig::default(), &family, FETCH);
    let mut enc = RecordingEncoder::new();

    assert_eq!(
        renderer.render_translucency(&mut enc, &family, &passes),
        Err(TranslucencyError::MissingRenderPass { stage: "translucency draw" })
    );
}

#[test]
fn unknown_view_is_rejected() {
    let family = single_view(64, 64);
    let mut renderer = renderer(TranslucencyConfig::default(), &family, FETCH);
    let mut enc = RecordingEncoder::new();
    assert_eq!(
        renderer.copy_scene_alpha(&mut enc, &family, ViewId(9)),
        Err(TranslucencyError::UnknownView(ViewId(9)))
    );
    assert!(enc.is_empty());
}

/// Compose one translucent quad over `scene` the way each path's recorded pipeline states would.
#[test]
fn scale_one_round_trip_matches_direct_path() {
    init_logging();
    let config = TranslucencyConfig { downsampling_scale: 1.0, ..Default::default() };
    let family = single_view(800, 600);
    let passes = passes_for(&family, &[translucent_batch(1)]);

    let mut renderer = renderer(config, &family, NO_FETCH);
    let mut enc = RecordingEncoder::new();
    renderer.render_translucency(&mut enc, &family, &passes).unwrap();

    let rects = enc.rectangles();
    let upsample = rects[1];
    assert_eq!((upsample.source_width, upsample.source_height), (upsample.dest_width, upsample.dest_height));
    assert_eq!(upsample.texture_size, Extent2d::new(800, 600));

    let downsample_pass = enc.render_passes()[0];
    let separate_clear = downsample_pass.color_attachments[0].clear_value.to_array();
    let material = pipeline(&enc, "translucent_base_pass").blend;
    let upsample_blend = pipeline(&enc, "upsample_translucency").blend;
    assert_eq!(material, translucent_render_state(BlendMode::Translucent));

    let scene = [0.2, 0.4, 0.6, 1.0];
    for quad in [[0.9, 0.1, 0.3, 1.0], [0.5, 0.5, 0.5, 0.4]] {
        let direct = material.apply(quad, scene);
        // at scale 1 the nearest-depth upsample returns the low-res texel unchanged
        let separate = material.apply(quad, separate_clear);
        let composited = upsample_blend.apply(separate, scene);
        for channel in 0..3 {
            assert!(
                (direct[channel] - composited[channel]).abs() < 1e-5,
                "channel {channel}: direct {direct:?} vs downsampled {composited:?}"
            );
        }
    }
}

proptest! {
    #[test]
    fn reduced_resolution_sizes_agree_across_stages(
        width in 1u32..2048,
        height in 1u32..2048,
        scale in 0.05f32..=1.0,
    ) {
        let full = Extent2d::new(width, height);
        let extent = downsampled_extent(full, scale);
        prop_assert_eq!(extent.width, ((width as f64 * scale as f64).floor() as u32).max(1));
        prop_assert_eq!(extent.height, ((height as f64 * scale as f64).floor() as u32).max(1));
        prop_assert!(extent.width <= width && extent.height <= height);
        prop_assert_eq!(IntRect::from_extent(full).scale(scale).size(), extent);

        let family = single_view(width, height);
        let passes = passes_for(&family, &[translucent_batch(1)]);
        let config = TranslucencyConfig { downsampling_scale: scale, ..Default::default() };
        let mut renderer = renderer(config, &family, NO_FETCH);
        let mut enc = RecordingEncoder::new();
        renderer.render_translucency(&mut enc, &family, &passes).unwrap();

        let rects = enc.rectangles();
        prop_assert_eq!(rects[0].target_size, extent);
        prop_assert_eq!(rects[1].texture_size, extent);
        prop_assert_eq!(
            (rects[1].source_width, rects[1].source_height),
            (rects[0].dest_width, rects[0].dest_height)
        );
    }
}
