use std::ops::Range;

use bytemuck::cast_slice;
use rollers_scene::{Culling, DrawCommand, MeshKind, PostProcess};
use wgpu::SurfaceError;

use super::super::mesh::MeshInstance;
use super::super::shaders::{CompositeUniforms, SceneUniforms};
use super::ViewerState;

const DEFAULT_POST: PostProcess = PostProcess {
    bloom: false,
    exposure: 0.5,
    blur_passes: 0,
};

#[derive(Clone, Copy)]
pub(super) struct QueuedDraw {
    mesh: MeshKind,
    culling: Culling,
    instance: MeshInstance,
}

impl QueuedDraw {
    pub(super) fn new(command: &DrawCommand, culling: Culling) -> Self {
        Self {
            mesh: command.mesh,
            culling,
            instance: MeshInstance::from_matrix(command.model),
        }
    }
}

/// Consecutive draws of one mesh under one cull mode, drawn as a single
/// instanced call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct DrawBatch {
    pub mesh: MeshKind,
    pub culling: Culling,
    pub instances: Range<u32>,
}

/// Groups draws without reordering them, so depth ties resolve exactly as
/// submitted.
pub(super) fn batch_draws(draws: impl IntoIterator<Item = (MeshKind, Culling)>) -> Vec<DrawBatch> {
    let mut batches: Vec<DrawBatch> = Vec::new();
    for (index, (mesh, culling)) in draws.into_iter().enumerate() {
        let index = index as u32;
        match batches.last_mut() {
            Some(batch) if batch.mesh == mesh && batch.culling == culling => {
                batch.instances.end = index + 1;
            }
            _ => batches.push(DrawBatch {
                mesh,
                culling,
                instances: index..index + 1,
            }),
        }
    }
    batches
}

pub(super) fn render(state: &mut ViewerState) -> Result<(), SurfaceError> {
    let Some(uniforms) = state.frame.uniforms.take() else {
        log::warn!("present without a begun frame; skipping");
        return Ok(());
    };
    let frame = state.surface.get_current_texture()?;
    let view = frame
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let sky = state.frame.sky;
    let post = state.frame.post.unwrap_or(DEFAULT_POST);
    let scene_uniforms = SceneUniforms::new(&uniforms, sky.unwrap_or_default());
    state
        .queue
        .write_buffer(&state.scene_uniform_buffer, 0, cast_slice(&[scene_uniforms]));

    let instances: Vec<MeshInstance> = state.frame.draws.iter().map(|draw| draw.instance).collect();
    ensure_instance_capacity(state, instances.len());
    if !instances.is_empty() {
        state
            .queue
            .write_buffer(&state.instance_buffer, 0, cast_slice(&instances));
    }
    let batches = batch_draws(state.frame.draws.iter().map(|draw| (draw.mesh, draw.culling)));

    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("rollers-viewer-encoder"),
        });

    let clear = wgpu::Color {
        r: uniforms.clear_color.x as f64,
        g: uniforms.clear_color.y as f64,
        b: uniforms.clear_color.z as f64,
        a: 1.0,
    };
    draw_scene(state, &mut encoder, &batches, instances.len(), clear, sky.is_some());

    let bloom = post
        .bloom
        .then(|| state.post.run_bloom(&mut encoder, &state.targets, post.blur_passes));
    state.post.write_composite(
        &state.queue,
        CompositeUniforms::new(post.exposure, bloom.is_some(), state.config.format.is_srgb()),
    );
    state.post.composite(&mut encoder, &state.targets, &view, bloom);

    state.queue.submit(std::iter::once(encoder.finish()));
    frame.present();
    Ok(())
}

fn draw_scene(
    state: &ViewerState,
    encoder: &mut wgpu::CommandEncoder,
    batches: &[DrawBatch],
    instance_count: usize,
    clear: wgpu::Color,
    draw_sky: bool,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("scene-pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: state.targets.hdr_view(),
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(clear),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view: state.targets.depth_view(),
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_bind_group(0, &state.scene_bind_group, &[]);

    if instance_count > 0 {
        let instance_bytes = (instance_count * std::mem::size_of::<MeshInstance>()) as u64;
        pass.set_vertex_buffer(1, state.instance_buffer.slice(0..instance_bytes));
    }

    let mut bound_culling = None;
    for batch in batches {
        let Some(buffers) = state.meshes.get(&batch.mesh) else {
            continue;
        };
        if bound_culling != Some(batch.culling) {
            pass.set_pipeline(state.mesh_pipelines.for_culling(batch.culling));
            bound_culling = Some(batch.culling);
        }
        pass.set_vertex_buffer(0, buffers.vertex.slice(..));
        pass.set_index_buffer(buffers.index.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..buffers.index_count, 0, batch.instances.clone());
    }

    if draw_sky {
        pass.set_pipeline(&state.sky_pipeline);
        pass.draw(0..3, 0..1);
    }
}

/// Grow the shared instance buffer if the current frame needs more slots.
fn ensure_instance_capacity(state: &mut ViewerState, required: usize) {
    if required <= state.instance_capacity {
        return;
    }
    let mut capacity = state.instance_capacity.max(1);
    while capacity < required {
        capacity *= 2;
    }
    let new_size = (capacity * std::mem::size_of::<MeshInstance>()) as u64;
    let label = format!("mesh-instance-buffer({capacity})");
    state.instance_buffer = state.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label.as_str()),
        size: new_size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    state.instance_capacity = capacity;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_meshes_share_one_batch() {
        let batches = batch_draws([
            (MeshKind::Road, Culling::Back),
            (MeshKind::Road, Culling::Back),
            (MeshKind::Road, Culling::Back),
            (MeshKind::NissanS15, Culling::Back),
            (MeshKind::Grass, Culling::Disabled),
            (MeshKind::Grass, Culling::Disabled),
        ]);
        assert_eq!(
            batches,
            vec![
                DrawBatch {
                    mesh: MeshKind::Road,
                    culling: Culling::Back,
                    instances: 0..3,
                },
                DrawBatch {
                    mesh: MeshKind::NissanS15,
                    culling: Culling::Back,
                    instances: 3..4,
                },
                DrawBatch {
                    mesh: MeshKind::Grass,
                    culling: Culling::Disabled,
                    instances: 4..6,
                },
            ]
        );
    }

    #[test]
    fn batches_never_reorder_interleaved_meshes() {
        let batches = batch_draws([
            (MeshKind::Tree, Culling::Back),
            (MeshKind::Building, Culling::Back),
            (MeshKind::Tree, Culling::Back),
        ]);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].instances, 2..3);
    }

    #[test]
    fn cull_mode_change_splits_a_batch() {
        let batches = batch_draws([
            (MeshKind::Terrain, Culling::Back),
            (MeshKind::Terrain, Culling::Disabled),
        ]);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn empty_frame_has_no_batches() {
        assert!(batch_draws(std::iter::empty()).is_empty());
    }
}
