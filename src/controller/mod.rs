// CONTROLLER: input and the per-frame update logic
pub mod input;
pub mod camera_controller;
#[cfg(target_arch = "wasm32")]
pub mod frame_loop;

pub use input::{FrameInput, InputEvent, InputProcessor, InputState, KeyBindings};
pub use camera_controller::CameraController;
#[cfg(target_arch = "wasm32")]
pub use frame_loop::FrameLoopContext;
