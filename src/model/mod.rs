// MODEL: scene data and camera pose
pub mod camera;
pub mod obj;
pub mod scene;

pub use camera::Camera;
pub use scene::{Appearance, Scene, SceneObject, Spin};
