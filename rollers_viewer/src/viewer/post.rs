//! Offscreen HDR targets and the bloom/composite passes that resolve them
//! onto the swapchain.

use std::borrow::Cow;

use bytemuck::cast_slice;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use super::shaders::{
    BlurUniforms, CompositeUniforms, blur_shader_source, bright_shader_source,
    composite_shader_source,
};

pub(super) const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub(super) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BloomBuffer {
    A,
    B,
}

impl BloomBuffer {
    fn other(self) -> Self {
        match self {
            BloomBuffer::A => BloomBuffer::B,
            BloomBuffer::B => BloomBuffer::A,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct BlurPass {
    pub source: BloomBuffer,
    pub target: BloomBuffer,
    pub horizontal: bool,
}

/// Ping-pong blur passes after the bright pass has filled buffer A.
/// Directions alternate starting horizontally.
pub(super) fn blur_schedule(passes: u32) -> Vec<BlurPass> {
    let mut source = BloomBuffer::A;
    (0..passes)
        .map(|index| {
            let pass = BlurPass {
                source,
                target: source.other(),
                horizontal: index % 2 == 0,
            };
            source = pass.target;
            pass
        })
        .collect()
}

/// Buffer holding the finished bloom after `passes` blur passes.
pub(super) fn blur_output(passes: u32) -> BloomBuffer {
    if passes % 2 == 0 {
        BloomBuffer::A
    } else {
        BloomBuffer::B
    }
}

struct ColorTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

/// Size-dependent attachments, rebuilt on resize.
pub(super) struct RenderTargets {
    hdr: ColorTarget,
    bloom_a: ColorTarget,
    bloom_b: ColorTarget,
    _depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl RenderTargets {
    pub(super) fn new(device: &wgpu::Device, size: PhysicalSize<u32>, post: &PostPipelines) -> Self {
        let (depth_texture, depth_view) = create_depth_texture(device, size);
        Self {
            hdr: create_color_target(device, size, post, "hdr-target"),
            bloom_a: create_color_target(device, size, post, "bloom-a-target"),
            bloom_b: create_color_target(device, size, post, "bloom-b-target"),
            _depth_texture: depth_texture,
            depth_view,
        }
    }

    pub(super) fn hdr_view(&self) -> &wgpu::TextureView {
        &self.hdr.view
    }

    pub(super) fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    fn bloom(&self, buffer: BloomBuffer) -> &ColorTarget {
        match buffer {
            BloomBuffer::A => &self.bloom_a,
            BloomBuffer::B => &self.bloom_b,
        }
    }
}

pub(super) struct PostPipelines {
    texture_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    bright: wgpu::RenderPipeline,
    blur: wgpu::RenderPipeline,
    composite: wgpu::RenderPipeline,
    blur_horizontal: wgpu::BindGroup,
    blur_vertical: wgpu::BindGroup,
    _blur_buffers: [wgpu::Buffer; 2],
    composite_uniform_buffer: wgpu::Buffer,
    composite_bind_group: wgpu::BindGroup,
}

impl PostPipelines {
    pub(super) fn new(device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-texture-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("post-uniform-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("post-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniform_bind_group = |label: &str, contents: &[u8]| {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            (buffer, bind_group)
        };
        let (horizontal_buffer, blur_horizontal) =
            uniform_bind_group("blur-horizontal", cast_slice(&[BlurUniforms::new(true)]));
        let (vertical_buffer, blur_vertical) =
            uniform_bind_group("blur-vertical", cast_slice(&[BlurUniforms::new(false)]));
        let (composite_uniform_buffer, composite_bind_group) = uniform_bind_group(
            "composite-uniforms",
            cast_slice(&[CompositeUniforms::new(0.5, false, surface_format.is_srgb())]),
        );

        let bright = fullscreen_pipeline(
            device,
            "bright-pipeline",
            &bright_shader_source(),
            "bright_fs_main",
            &[&texture_layout],
            HDR_FORMAT,
        );
        let blur = fullscreen_pipeline(
            device,
            "blur-pipeline",
            &blur_shader_source(),
            "blur_fs_main",
            &[&texture_layout, &uniform_layout],
            HDR_FORMAT,
        );
        let composite = fullscreen_pipeline(
            device,
            "composite-pipeline",
            &composite_shader_source(),
            "composite_fs_main",
            &[&texture_layout, &texture_layout, &uniform_layout],
            surface_format,
        );

        Self {
            texture_layout,
            sampler,
            bright,
            blur,
            composite,
            blur_horizontal,
            blur_vertical,
            _blur_buffers: [horizontal_buffer, vertical_buffer],
            composite_uniform_buffer,
            composite_bind_group,
        }
    }

    pub(super) fn write_composite(&self, queue: &wgpu::Queue, uniforms: CompositeUniforms) {
        queue.write_buffer(&self.composite_uniform_buffer, 0, cast_slice(&[uniforms]));
    }

    /// Bright pass into buffer A, then the ping-pong blur. Returns the buffer
    /// holding the result.
    pub(super) fn run_bloom(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        passes: u32,
    ) -> BloomBuffer {
        fullscreen_pass(
            encoder,
            "bloom-bright-pass",
            &targets.bloom_a.view,
            &self.bright,
            &[&targets.hdr.bind_group],
        );
        for pass in blur_schedule(passes) {
            let direction = if pass.horizontal {
                &self.blur_horizontal
            } else {
                &self.blur_vertical
            };
            fullscreen_pass(
                encoder,
                if pass.horizontal {
                    "bloom-blur-h-pass"
                } else {
                    "bloom-blur-v-pass"
                },
                &targets.bloom(pass.target).view,
                &self.blur,
                &[&targets.bloom(pass.source).bind_group, direction],
            );
        }
        blur_output(passes)
    }

    /// Tonemaps the HDR target onto `output`, adding `bloom` when present.
    pub(super) fn composite(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        output: &wgpu::TextureView,
        bloom: Option<BloomBuffer>,
    ) {
        let bloom = targets.bloom(bloom.unwrap_or(BloomBuffer::A));
        fullscreen_pass(
            encoder,
            "composite-pass",
            output,
            &self.composite,
            &[
                &targets.hdr.bind_group,
                &bloom.bind_group,
                &self.composite_bind_group,
            ],
        );
    }
}

fn fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    source: &str,
    fragment_entry: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts,
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: "fullscreen_vs_main",
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: fragment_entry,
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_groups: &[&wgpu::BindGroup],
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    pass.set_pipeline(pipeline);
    for (index, bind_group) in bind_groups.iter().enumerate() {
        pass.set_bind_group(index as u32, bind_group, &[]);
    }
    pass.draw(0..3, 0..1);
}

fn create_color_target(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
    post: &PostPipelines,
    label: &str,
) -> ColorTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HDR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &post.texture_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&post.sampler),
            },
        ],
    });
    ColorTarget {
        _texture: texture,
        view,
        bind_group,
    }
}

fn create_depth_texture(
    device: &wgpu::Device,
    size: PhysicalSize<u32>,
) -> (wgpu::Texture, wgpu::TextureView) {
    let extent = wgpu::Extent3d {
        width: size.width.max(1),
        height: size.height.max(1),
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("scene-depth-texture"),
        size: extent,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}
