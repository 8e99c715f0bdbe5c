// VIEW: rendering and graphics
pub mod render;
pub mod gpu_init;

pub use render::{FrameUniform, ObjectUniform, SceneRenderer};
pub use gpu_init::GpuContext;
