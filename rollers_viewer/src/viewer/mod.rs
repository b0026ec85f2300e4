mod mesh;
mod post;
mod shaders;
mod state;

pub use state::ViewerState;
