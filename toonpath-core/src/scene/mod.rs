//! Scene graph: an arena of nodes hanging off a single root group.
//!
//! Nodes carry an explicit capability tag ([`NodeKind`]) instead of being told apart by
//! inspecting their concrete type. Geometry and material descriptors are shared through
//! `Arc` and never change once a node holds them; only transforms are edited afterwards.

pub mod builder;

use std::fmt;
use std::sync::Arc;

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::{ConstructionError, SceneError};

pub use builder::{build_scene, MaterialDef, SceneBuilder, ShapeDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Box,
    Plane,
    Circle,
    Cylinder,
    Sphere,
}

impl ShapeKind {
    /// Number of entries `dims` must carry for this shape.
    pub fn arity(self) -> usize {
        match self {
            ShapeKind::Box => 3,
            ShapeKind::Plane => 2,
            ShapeKind::Circle => 1,
            ShapeKind::Cylinder => 3,
            ShapeKind::Sphere => 1,
        }
    }

    pub fn default_segments(self) -> u32 {
        match self {
            ShapeKind::Box | ShapeKind::Plane => 1,
            ShapeKind::Circle => 20,
            ShapeKind::Cylinder => 24,
            ShapeKind::Sphere => 32,
        }
    }

    fn min_segments(self) -> u32 {
        match self {
            ShapeKind::Box | ShapeKind::Plane => 1,
            ShapeKind::Circle | ShapeKind::Cylinder | ShapeKind::Sphere => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Box => "box",
            ShapeKind::Plane => "plane",
            ShapeKind::Circle => "circle",
            ShapeKind::Cylinder => "cylinder",
            ShapeKind::Sphere => "sphere",
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape kind plus dimensions.
///
/// | kind     | dims                               |
/// |----------|------------------------------------|
/// | box      | `[width, height, depth]`           |
/// | plane    | `[width, height]`                  |
/// | circle   | `[radius]`                         |
/// | cylinder | `[radius_top, radius_bottom, h]`   |
/// | sphere   | `[radius]`                         |
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryDescriptor {
    kind: ShapeKind,
    dims: Vec<f32>,
    segments: u32,
}

impl GeometryDescriptor {
    pub fn new(kind: ShapeKind, dims: &[f32], segments: Option<u32>) -> Result<Self, ConstructionError> {
        let malformed = |reason: String| ConstructionError::MalformedShape { name: kind.to_string(), reason };
        if dims.len() != kind.arity() {
            return Err(malformed(format!("expected {} dims, got {}", kind.arity(), dims.len())));
        }
        if let Some(bad) = dims.iter().find(|d| !d.is_finite() || **d < 0.0) {
            return Err(malformed(format!("dimension {bad} must be finite and non-negative")));
        }
        let degenerate = match kind {
            ShapeKind::Cylinder => dims[2] == 0.0 || (dims[0] == 0.0 && dims[1] == 0.0),
            _ => dims.iter().any(|d| *d == 0.0),
        };
        if degenerate {
            return Err(malformed("zero-sized shape".to_string()));
        }
        let segments = segments.unwrap_or_else(|| kind.default_segments());
        if segments < kind.min_segments() {
            return Err(malformed(format!("needs at least {} segments, got {segments}", kind.min_segments())));
        }
        Ok(Self { kind, dims: dims.to_vec(), segments })
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn dims(&self) -> &[f32] {
        &self.dims
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    /// Local-space bounding box as `(min, max)`, before any node transform.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let half = match self.kind {
            ShapeKind::Box => Vec3::new(self.dims[0], self.dims[1], self.dims[2]) * 0.5,
            ShapeKind::Plane => Vec3::new(self.dims[0] * 0.5, self.dims[1] * 0.5, 0.0),
            ShapeKind::Circle => Vec3::new(self.dims[0], self.dims[0], 0.0),
            ShapeKind::Cylinder => {
                let r = self.dims[0].max(self.dims[1]);
                Vec3::new(r, self.dims[2] * 0.5, r)
            }
            ShapeKind::Sphere => Vec3::splat(self.dims[0]),
        };
        (-half, half)
    }
}

/// Which faces a material draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Front,
    Back,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescriptor {
    /// `None` for materials whose look comes from elsewhere (e.g. texture maps).
    pub color: Option<Rgb>,
    pub side: Side,
    /// Set on materials produced for outline shells.
    pub derived: bool,
}

impl MaterialDescriptor {
    pub fn new(color: Rgb, side: Side) -> Self {
        Self { color: Some(color), side, derived: false }
    }

    pub fn untinted(side: Side) -> Self {
        Self { color: None, side, derived: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform {
    /// Euler angles are applied in XYZ order, radians.
    pub fn from_parts(translation: Vec3, euler_xyz: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::from_euler(EulerRot::XYZ, euler_xyz.x, euler_xyz.y, euler_xyz.z),
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Debug, Clone)]
pub struct MeshBinding {
    pub geometry: Arc<GeometryDescriptor>,
    pub material: Arc<MaterialDescriptor>,
}

/// Capability tag, fixed when the node is created.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(MeshBinding),
}

/// Back-reference from an outline shell to the node it outlines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellLink {
    pub source: NodeId,
    pub scale_factor: f32,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    kind: NodeKind,
    shell: Option<ShellLink>,
}

impl SceneNode {
    pub fn group(name: impl Into<String>) -> Self {
        Self { name: name.into(), transform: Transform::default(), kind: NodeKind::Group, shell: None }
    }

    pub fn mesh(name: impl Into<String>, binding: MeshBinding, transform: Transform) -> Self {
        Self { name: name.into(), transform, kind: NodeKind::Mesh(binding), shell: None }
    }

    pub(crate) fn shell(name: String, binding: MeshBinding, transform: Transform, link: ShellLink) -> Self {
        Self { name, transform, kind: NodeKind::Mesh(binding), shell: Some(link) }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn binding(&self) -> Option<&MeshBinding> {
        match &self.kind {
            NodeKind::Mesh(binding) => Some(binding),
            NodeKind::Group => None,
        }
    }

    pub fn has_geometry(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    pub fn geometry(&self) -> Option<&Arc<GeometryDescriptor>> {
        self.binding().map(|b| &b.geometry)
    }

    pub fn material(&self) -> Option<&Arc<MaterialDescriptor>> {
        self.binding().map(|b| &b.material)
    }

    pub fn shell_link(&self) -> Option<ShellLink> {
        self.shell
    }

    /// True for nodes produced by the outline pass.
    pub fn is_derived(&self) -> bool {
        self.shell.is_some() || self.material().is_some_and(|m| m.derived)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    node: SceneNode,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    entries: Vec<Entry>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self { entries: vec![Entry { node: SceneNode::group("root"), parent: None, children: Vec::new() }] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Total node count, root included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.entries.get(id.0).map(|e| &e.node)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.entries.get_mut(id.0).map(|e| &mut e.node)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.entries.get(id.0).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.entries.get(id.0).and_then(|e| e.parent)
    }

    /// Append `node` as the last child of `parent`.
    pub fn add(&mut self, parent: NodeId, node: SceneNode) -> Result<NodeId, SceneError> {
        self.entry(parent)?;
        let id = self.push(node, parent);
        self.entries[parent.0].children.push(id);
        Ok(id)
    }

    /// Insert `node` into `anchor`'s parent, directly after `anchor`.
    pub fn insert_after(&mut self, anchor: NodeId, node: SceneNode) -> Result<NodeId, SceneError> {
        let parent = self.entry(anchor)?.parent.ok_or(SceneError::RootHasNoParent)?;
        let slot = self.entries[parent.0]
            .children
            .iter()
            .position(|c| *c == anchor)
            .ok_or(SceneError::NotAChild { parent, child: anchor })?;
        let id = self.push(node, parent);
        self.entries[parent.0].children.insert(slot + 1, id);
        Ok(id)
    }

    /// Depth-first, pre-order ids starting at the root.
    pub fn walk(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.entries.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        order
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.walk().into_iter().find(|id| self.entries[id.0].node.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.entries.iter().enumerate().map(|(i, e)| (NodeId(i), &e.node))
    }

    pub fn mesh_count(&self) -> usize {
        self.entries.iter().filter(|e| e.node.has_geometry()).count()
    }

    pub fn shell_count(&self) -> usize {
        self.entries.iter().filter(|e| e.node.shell.is_some()).count()
    }

    /// The outline shell derived from `source`, if one exists.
    pub fn shell_of(&self, source: NodeId) -> Option<NodeId> {
        self.iter()
            .find(|(_, n)| n.shell.is_some_and(|link| link.source == source))
            .map(|(id, _)| id)
    }

    /// Re-derive the shell transform of `source` after `source` moved.
    pub fn sync_shell(&mut self, source: NodeId) -> Result<(), SceneError> {
        let transform = self.entry(source)?.node.transform;
        if let Some(shell) = self.shell_of(source) {
            let node = &mut self.entries[shell.0].node;
            let factor = node.shell.map(|l| l.scale_factor).unwrap_or(1.0);
            node.transform = Transform { scale: transform.scale * factor, ..transform };
        }
        Ok(())
    }

    /// Model-to-world matrix of `id`, composed through its ancestors.
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4, SceneError> {
        let mut matrix = self.entry(id)?.node.transform.matrix();
        let mut cursor = self.parent(id);
        while let Some(parent) = cursor {
            matrix = self.entries[parent.0].node.transform.matrix() * matrix;
            cursor = self.parent(parent);
        }
        Ok(matrix)
    }

    pub fn world_position(&self, id: NodeId) -> Result<Vec3, SceneError> {
        Ok(self.world_matrix(id)?.transform_point3(Vec3::ZERO))
    }

    fn entry(&self, id: NodeId) -> Result<&Entry, SceneError> {
        self.entries.get(id.0).ok_or(SceneError::UnknownNode(id))
    }

    fn push(&mut self, node: SceneNode, parent: NodeId) -> NodeId {
        let id = NodeId(self.entries.len());
        self.entries.push(Entry { node, parent: Some(parent), children: Vec::new() });
        id
    }
}
