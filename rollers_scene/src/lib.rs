//! Scripted scene state for the Rollers road viewer.
//!
//! The crate owns everything that changes from frame to frame: the scene
//! clock, the oscillating vehicles and looping background conveyors, light
//! state, the fly camera and the persisted view file. A `FrameScheduler`
//! advances that state once per frame and hands an ordered list of render
//! steps to whatever `Renderer` the host plugs in.

pub mod actor;
pub mod camera;
pub mod clock;
pub mod controls;
pub mod lighting;
pub mod motion;
pub mod persist;
pub mod preset;
pub mod render;
pub mod scene;
pub mod scheduler;

pub use actor::{ActorId, ActorTransform, AxisRotation};
pub use camera::{CameraMovement, FlyCamera};
pub use clock::SceneClock;
pub use controls::{Controls, FrameInput, SpeedLane, Throttle, Toggle, TrackSpeed};
pub use lighting::{DirLight, FogSettings, LightRig, SpotLight};
pub use motion::{Conveyor, ConveyorConfig, Direction, Oscillator, OscillatorConfig};
pub use persist::{PersistedView, StateFileError, DEFAULT_STATE_FILE};
pub use preset::{PresetError, ScenePreset, MAX_BLUR_PASSES};
pub use render::{
    Culling, DrawCommand, FpsTier, FrameUniforms, MeshKind, OverlayStats, PostProcess,
    RecordingRenderer, RenderStep, Renderer, SkyboxKind,
};
pub use scene::{Actor, DrawItem, PostSettings, SceneState};
pub use scheduler::{FpsMeter, FrameReport, FrameScheduler};
