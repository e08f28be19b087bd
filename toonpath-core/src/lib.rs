pub mod animator;
pub mod camera;
pub mod color;
pub mod config;
pub mod controls;
pub mod error;
pub mod mesh;
pub mod outline;
pub mod path;
pub mod presets;
pub mod renderer;
pub mod scene;
pub mod scheduler;
pub mod stage;
pub mod timeline;

pub use error::{ConstructionError, SceneError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
