//! Replay of a recorded command stream onto a `wgpu::CommandEncoder`.
//!
//! Attachment setup (loads, clears, stores, MSAA resolves), viewports and debug groups are executed.
//! Pipeline binds and draws need compiled shader modules from the host's shader system; they are
//! counted in [`ReplayStats`] and otherwise skipped.

use translucency_rhi::{RecordedCommand, RenderPassDescriptor, TextureHandle};

use crate::convert::{color_operations, depth_operations};
use crate::targets::WgpuTargetCache;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub render_passes: usize,
    pub resolves: usize,
    pub skipped_draws: usize,
}

fn view_for<'a>(targets: &'a WgpuTargetCache, handle: TextureHandle, label: &str) -> Result<&'a wgpu::TextureView, String> {
    targets.view(handle).ok_or_else(|| format!("`{label}`: no gpu texture for {handle:?}, sync the target cache first"))
}

/// Debug groups opened directly on the command encoder. wgpu rejects a pop without a matching push.
#[derive(Debug, Default)]
struct EncoderGroups {
    depth: usize,
}

impl EncoderGroups {
    fn push(&mut self) {
        self.depth += 1;
    }

    /// Whether a pop may be issued; unmatched pops are dropped.
    fn pop(&mut self) -> bool {
        if self.depth == 0 {
            log::warn!("replay: dropping debug group pop with no open group");
            return false;
        }
        self.depth -= 1;
        true
    }
}

pub fn replay(
    encoder: &mut wgpu::CommandEncoder,
    targets: &WgpuTargetCache,
    commands: &[RecordedCommand],
) -> Result<ReplayStats, String> {
    let mut stats = ReplayStats::default();
    let mut groups = EncoderGroups::default();
    let mut index = 0;
    while index < commands.len() {
        match &commands[index] {
            RecordedCommand::BeginRenderPass(desc) => {
                let end = commands[index + 1..]
                    .iter()
                    .position(|c| matches!(c, RecordedCommand::EndRenderPass { .. }))
                    .map_or(commands.len(), |offset| index + 1 + offset);
                let deferred_pops = replay_pass(encoder, targets, desc, &commands[index + 1..end], &mut stats)?;
                for _ in 0..deferred_pops {
                    if groups.pop() {
                        encoder.pop_debug_group();
                    }
                }
                index = end;
            }
            RecordedCommand::CopyToResolveTarget { source, dest, rect } => {
                resolve(encoder, targets, *source, *dest, rect.x2 - rect.x1, rect.y2 - rect.y1)?;
                stats.resolves += 1;
            }
            RecordedCommand::PushDebugGroup(label) => {
                encoder.push_debug_group(label);
                groups.push();
            }
            RecordedCommand::PopDebugGroup => {
                if groups.pop() {
                    encoder.pop_debug_group();
                }
            }
            // wgpu tracks usage itself; uniform buffers belong to the host
            RecordedCommand::Transition { .. } | RecordedCommand::UpdateUniformBuffer { .. } => {}
            other => log::warn!("replay: {other:?} recorded outside a render pass"),
        }
        index += 1;
    }
    Ok(stats)
}

/// Returns the number of encoder-level debug groups popped inside the pass; the caller pops them after it ends.
fn replay_pass(
    encoder: &mut wgpu::CommandEncoder,
    targets: &WgpuTargetCache,
    desc: &RenderPassDescriptor,
    body: &[RecordedCommand],
    stats: &mut ReplayStats,
) -> Result<usize, String> {
    let mut color_attachments = Vec::with_capacity(desc.color_attachments.len());
    for attachment in &desc.color_attachments {
        let resolve_target = match attachment.resolve_target {
            Some(handle) => Some(view_for(targets, handle, desc.label)?),
            None => None,
        };
        color_attachments.push(Some(wgpu::RenderPassColorAttachment {
            view: view_for(targets, attachment.texture, desc.label)?,
            resolve_target,
            ops: color_operations(attachment.actions, attachment.clear_value),
        }));
    }
    let depth_stencil_attachment = match &desc.depth_stencil_attachment {
        Some(depth) => {
            let has_stencil = targets.desc(depth.texture).is_some_and(|d| d.format.has_stencil());
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: view_for(targets, depth.texture, desc.label)?,
                depth_ops: Some(depth_operations(depth.actions.depth, depth.clear_depth)),
                stencil_ops: has_stencil.then(|| depth_operations(depth.actions.stencil, depth.clear_stencil)),
            })
        }
        None => None,
    };

    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(desc.label),
        color_attachments: &color_attachments,
        depth_stencil_attachment,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    stats.render_passes += 1;

    let mut pass_groups = 0usize;
    let mut deferred_pops = 0usize;
    for command in body {
        match command {
            RecordedCommand::SetViewport(v) => pass.set_viewport(v.x, v.y, v.width, v.height, v.min_depth, v.max_depth),
            RecordedCommand::PushDebugGroup(label) => {
                pass.push_debug_group(label);
                pass_groups += 1;
            }
            RecordedCommand::PopDebugGroup if pass_groups > 0 => {
                pass.pop_debug_group();
                pass_groups -= 1;
            }
            RecordedCommand::PopDebugGroup => deferred_pops += 1,
            RecordedCommand::DrawRectangle(_) | RecordedCommand::DrawIndexed { .. } => stats.skipped_draws += 1,
            RecordedCommand::SetPipelineState(_)
            | RecordedCommand::BindTexture { .. }
            | RecordedCommand::UpdateUniformBuffer { .. } => {}
            other => log::warn!("replay: unexpected {other:?} inside `{}`", desc.label),
        }
    }
    for _ in 0..pass_groups {
        pass.pop_debug_group();
    }
    Ok(deferred_pops)
}

fn resolve(
    encoder: &mut wgpu::CommandEncoder,
    targets: &WgpuTargetCache,
    source: TextureHandle,
    dest: TextureHandle,
    width: i32,
    height: i32,
) -> Result<(), String> {
    let multisampled = targets.desc(source).is_some_and(|d| d.sample_count > 1);
    if !multisampled {
        let (src, dst) = match (targets.texture(source), targets.texture(dest)) {
            (Some(src), Some(dst)) => (src, dst),
            _ => return Err(format!("resolve: missing gpu texture for {source:?} or {dest:?}")),
        };
        encoder.copy_texture_to_texture(
            src.as_image_copy(),
            dst.as_image_copy(),
            wgpu::Extent3d { width: width.max(1) as u32, height: height.max(1) as u32, depth_or_array_layers: 1 },
        );
        return Ok(());
    }
    // wgpu resolves whole attachments at the end of a pass
    let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("resolve"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: view_for(targets, source, "resolve")?,
            resolve_target: Some(view_for(targets, dest, "resolve")?),
            ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    Ok(())
}
