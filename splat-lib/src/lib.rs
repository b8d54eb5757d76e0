pub use wgpu;

pub mod camera;
pub mod common;
pub mod error;
pub mod ply;
pub mod render;
pub mod structures;

pub use camera::{CameraController, OrbitCamera, PointerButton, PointerEvent};
pub use error::SplatError;
pub use ply::decode;
pub use render::SplatRenderer;
pub use structures::SplatCloud;
