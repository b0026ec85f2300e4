//! Central GPU state for the viewer window. Owns the wgpu device/surface,
//! the offscreen HDR targets and one vertex/index buffer pair per mesh kind,
//! and plays back the render steps the frame scheduler submits. Submodules
//! cover lifecycle slices: `init` for setup, `layout` for resize handling,
//! `hud` for the window title and cursor, and `render` for the passes.

use std::{collections::BTreeMap, sync::Arc};

use anyhow::Result;
use rollers_scene::{
    Culling, FrameUniforms, MeshKind, PostProcess, RenderStep, Renderer, SkyboxKind,
};
use wgpu::SurfaceError;
use winit::{dpi::PhysicalSize, window::Window};

use super::post::{PostPipelines, RenderTargets};

mod hud;
mod init;
mod layout;
mod render;

struct PrimitiveBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

struct MeshPipelines {
    culled: wgpu::RenderPipeline,
    unculled: wgpu::RenderPipeline,
}

impl MeshPipelines {
    fn for_culling(&self, culling: Culling) -> &wgpu::RenderPipeline {
        match culling {
            Culling::Back => &self.culled,
            Culling::Disabled => &self.unculled,
        }
    }
}

/// Steps collected between `BeginFrame` and `Present`.
#[derive(Default)]
struct PendingFrame {
    uniforms: Option<FrameUniforms>,
    culling: Culling,
    draws: Vec<render::QueuedDraw>,
    sky: Option<SkyboxKind>,
    post: Option<PostProcess>,
}

impl PendingFrame {
    fn begin(&mut self, uniforms: FrameUniforms) {
        self.uniforms = Some(uniforms);
        self.culling = Culling::Back;
        self.draws.clear();
        self.sky = None;
        self.post = None;
    }
}

pub struct ViewerState {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    scene_uniform_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    mesh_pipelines: MeshPipelines,
    sky_pipeline: wgpu::RenderPipeline,
    meshes: BTreeMap<MeshKind, PrimitiveBuffers>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    post: PostPipelines,
    targets: RenderTargets,
    frame: PendingFrame,
    surface_error: Option<SurfaceError>,
    hud: hud::HudState,
}

impl ViewerState {
    pub async fn new(window: Arc<Window>) -> Result<Self> {
        init::new(window).await
    }

    pub fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        layout::resize(self, new_size);
    }

    /// Surface error raised by the last `Present`, if any.
    pub fn take_surface_error(&mut self) -> Option<SurfaceError> {
        self.surface_error.take()
    }
}

impl Renderer for ViewerState {
    fn submit(&mut self, step: RenderStep) {
        match step {
            RenderStep::BeginFrame(uniforms) => self.frame.begin(uniforms),
            RenderStep::SetCulling(culling) => self.frame.culling = culling,
            RenderStep::Mesh(command) => {
                let culling = self.frame.culling;
                self.frame
                    .draws
                    .push(render::QueuedDraw::new(&command, culling));
            }
            RenderStep::Skybox(kind) => self.frame.sky = Some(kind),
            RenderStep::PostProcess(post) => self.frame.post = Some(post),
            RenderStep::Overlay(stats) => hud::apply_overlay(self, &stats),
            RenderStep::Present => {
                if let Err(err) = render::render(self) {
                    self.surface_error = Some(err);
                }
            }
        }
    }
}
