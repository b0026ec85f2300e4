//! Renderer seam. The scheduler emits an ordered stream of [`RenderStep`]s
//! and never waits on the renderer; hosts decide how each step maps onto the
//! GPU.

use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::lighting::{DirLight, FogSettings, SpotLight};

/// Every mesh the road scene draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum MeshKind {
    Road,
    NissanSx180,
    NissanS15,
    Porsche911,
    Nissan240sx,
    Tree,
    Building,
    PowerPole,
    StreetLamp,
    Grass,
    Mountain,
    Terrain,
}

impl MeshKind {
    pub const ALL: [MeshKind; 12] = [
        MeshKind::Road,
        MeshKind::NissanSx180,
        MeshKind::NissanS15,
        MeshKind::Porsche911,
        MeshKind::Nissan240sx,
        MeshKind::Tree,
        MeshKind::Building,
        MeshKind::PowerPole,
        MeshKind::StreetLamp,
        MeshKind::Grass,
        MeshKind::Mountain,
        MeshKind::Terrain,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Culling {
    #[default]
    Back,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SkyboxKind {
    #[default]
    Day,
    Dusk,
}

/// Per-frame values shared by every draw in the frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
    pub camera_position: Vec3,
    pub clear_color: Vec3,
    pub time: f32,
    pub sun: DirLight,
    pub spot_lights: Vec<SpotLight>,
    pub fog: FogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawCommand {
    pub label: &'static str,
    pub mesh: MeshKind,
    pub model: Mat4,
    pub culling: Culling,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PostProcess {
    pub bloom: bool,
    pub exposure: f32,
    pub blur_passes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FpsTier {
    Good,
    Fair,
    Poor,
}

impl FpsTier {
    pub fn classify(fps: f32) -> Self {
        if fps > 55.0 {
            FpsTier::Good
        } else if fps >= 40.0 {
            FpsTier::Fair
        } else {
            FpsTier::Poor
        }
    }

    pub fn color(self) -> [f32; 3] {
        match self {
            FpsTier::Good => [0.0, 1.0, 0.0],
            FpsTier::Fair => [1.0, 1.0, 0.0],
            FpsTier::Poor => [1.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlayStats {
    pub fps: f32,
    pub tier: FpsTier,
    /// Overlay takes the pointer; the host should release any cursor grab.
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RenderStep {
    BeginFrame(FrameUniforms),
    Mesh(DrawCommand),
    SetCulling(Culling),
    Skybox(SkyboxKind),
    PostProcess(PostProcess),
    Overlay(OverlayStats),
    Present,
}

impl RenderStep {
    pub fn name(&self) -> &'static str {
        match self {
            RenderStep::BeginFrame(_) => "begin_frame",
            RenderStep::Mesh(_) => "mesh",
            RenderStep::SetCulling(_) => "set_culling",
            RenderStep::Skybox(_) => "skybox",
            RenderStep::PostProcess(_) => "post_process",
            RenderStep::Overlay(_) => "overlay",
            RenderStep::Present => "present",
        }
    }
}

pub trait Renderer {
    fn submit(&mut self, step: RenderStep);
}

/// Keeps the steps of the most recent frame. Used by tests and headless runs.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RecordingRenderer {
    steps: Vec<RenderStep>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[RenderStep] {
        &self.steps
    }

    pub fn meshes(&self) -> impl Iterator<Item = &DrawCommand> {
        self.steps.iter().filter_map(|step| match step {
            RenderStep::Mesh(command) => Some(command),
            _ => None,
        })
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|step| step.name() == name)
    }
}

impl Renderer for RecordingRenderer {
    fn submit(&mut self, step: RenderStep) {
        if matches!(step, RenderStep::BeginFrame(_)) {
            self.steps.clear();
        }
        self.steps.push(step);
    }
}
