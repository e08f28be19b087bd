//! The draw seam of the frame loop, plus a headless recorder used by the CLI and tests.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::camera::PerspectiveCamera;
use crate::mesh::{tessellate, Mesh};
use crate::scene::{GeometryDescriptor, Scene, Side};

pub trait Renderer {
    /// Output size changed; takes effect from the next `render`.
    fn set_size(&mut self, width: u32, height: u32);
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub position: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub width: u32,
    pub height: u32,
    pub aspect: f32,
    pub camera: [f32; 3],
    pub meshes: usize,
    pub shells: usize,
    pub triangles: usize,
    /// Vertex buffer bytes bound this frame, one buffer per drawn mesh.
    pub vertex_bytes: usize,
    pub nodes: Vec<NodeRecord>,
}

/// Renderer that draws nothing and records what each frame would have drawn.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    width: u32,
    height: u32,
    tracked: Vec<String>,
    frames: Vec<FrameRecord>,
    /// Upload-ready meshes keyed by shared geometry and the side drawn.
    prepared: HashMap<(usize, Side), Mesh>,
}

impl FrameRecorder {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height, ..Default::default() }
    }

    /// Record the world position of the node called `name` in every frame.
    pub fn track(mut self, name: impl Into<String>) -> Self {
        self.tracked.push(name.into());
        self
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }

    pub fn last(&self) -> Option<&FrameRecord> {
        self.frames.last()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.frames)
    }

    /// Mesh uploaded for `geometry` drawn with `side`, once a frame has needed it.
    pub fn prepared(&self, geometry: &Arc<GeometryDescriptor>, side: Side) -> Option<&Mesh> {
        self.prepared.get(&(Arc::as_ptr(geometry) as usize, side))
    }

    /// Tessellate every mesh node not seen before, wound for its material's side.
    /// Returns the frame's triangle and vertex byte totals.
    fn prepare(&mut self, scene: &Scene) -> (usize, usize) {
        let (mut triangles, mut bytes) = (0, 0);
        for (_, node) in scene.iter() {
            let (Some(geometry), Some(material)) = (node.geometry(), node.material()) else { continue };
            let key = (Arc::as_ptr(geometry) as usize, material.side);
            let mesh = self.prepared.entry(key).or_insert_with(|| tessellate(geometry).for_side(material.side));
            triangles += mesh.triangle_count();
            bytes += mesh.vertex_bytes().len();
        }
        (triangles, bytes)
    }
}

impl Renderer for FrameRecorder {
    fn set_size(&mut self, width: u32, height: u32) {
        log::debug!("recorder resized to {width}x{height}");
        self.width = width;
        self.height = height;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        let nodes = self
            .tracked
            .iter()
            .filter_map(|name| {
                let id = scene.find(name)?;
                let position = scene.world_position(id).ok()?.to_array();
                Some(NodeRecord { name: name.clone(), position })
            })
            .collect();
        let (triangles, vertex_bytes) = self.prepare(scene);
        let record = FrameRecord {
            frame: self.frames.len() as u64,
            width: self.width,
            height: self.height,
            aspect: camera.aspect,
            camera: camera.position.to_array(),
            meshes: scene.mesh_count(),
            shells: scene.shell_count(),
            triangles,
            vertex_bytes,
            nodes,
        };
        log::trace!("frame {}: {} triangles", record.frame, record.triangles);
        self.frames.push(record);
        Ok(())
    }
}
