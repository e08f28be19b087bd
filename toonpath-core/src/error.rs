use thiserror::Error;

use crate::scene::NodeId;

/// Rejected input at build time. Fatal to the component being constructed only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstructionError {
    #[error("control path needs at least 2 points, got {0}")]
    TooFewPoints(usize),
    #[error("control point {index} is not finite")]
    NonFinitePoint { index: usize },
    #[error("control point {index} has a coordinate beyond ±1e18")]
    PointOutOfRange { index: usize },
    #[error("animation duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
    #[error("curve tension must be finite, got {0}")]
    InvalidTension(f32),
    #[error("shape `{name}`: {reason}")]
    MalformedShape { name: String, reason: String },
    #[error("unknown material `{0}`")]
    UnknownMaterial(String),
    #[error(transparent)]
    InvalidColor(#[from] crate::color::ColorParseError),
    #[error("animation target `{0}` not found in scene")]
    UnknownTarget(String),
    #[error("spin axis must be non-zero and finite")]
    InvalidAxis,
    #[error("spin angle must be finite, got {0}")]
    InvalidAngle(f32),
    #[error("viewport must be non-zero, got {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },
}

/// Scene graph lookups and edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("the root node has no parent")]
    RootHasNoParent,
}
