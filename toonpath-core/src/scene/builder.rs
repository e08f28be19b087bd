//! Turns flat shape descriptors into a scene graph.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{GeometryDescriptor, MaterialDescriptor, MeshBinding, Scene, SceneNode, ShapeKind, Side, Transform};
use crate::color::Rgb;
use crate::error::ConstructionError;

/// Palette entry. A missing color is allowed and marks an untinted material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDef {
    pub color: Option<Rgb>,
    pub side: Side,
}

impl From<&MaterialDef> for MaterialDescriptor {
    fn from(def: &MaterialDef) -> Self {
        MaterialDescriptor { color: def.color, side: def.side, derived: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    pub shape: ShapeKind,
    pub dims: Vec<f32>,
    #[serde(default)]
    pub segments: Option<u32>,
    #[serde(default, alias = "pos")]
    pub position: [f32; 3],
    /// Euler XYZ, radians.
    #[serde(default)]
    pub rotation: [f32; 3],
    #[serde(default = "unit_scale")]
    pub scale: [f32; 3],
    /// Palette name. Takes precedence over `color`/`side`.
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub color: Option<Rgb>,
    #[serde(default)]
    pub side: Side,
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl ShapeDescriptor {
    pub fn new(shape: ShapeKind, dims: &[f32]) -> Self {
        Self {
            name: None,
            shape,
            dims: dims.to_vec(),
            segments: None,
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: unit_scale(),
            material: None,
            color: None,
            side: Side::Front,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = [x, y, z];
        self
    }

    pub fn rotated(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = [x, y, z];
        self
    }

    pub fn colored(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_material(mut self, palette_name: impl Into<String>) -> Self {
        self.material = Some(palette_name.into());
        self
    }

    fn display_name(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("{}-{}", self.shape, index))
    }
}

/// Builds scenes while sharing equal geometry and material descriptors between nodes.
#[derive(Debug, Default)]
pub struct SceneBuilder {
    palette: HashMap<String, Arc<MaterialDescriptor>>,
    geometries: Vec<Arc<GeometryDescriptor>>,
    inline_materials: Vec<Arc<MaterialDescriptor>>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material(&mut self, name: impl Into<String>, def: &MaterialDef) -> &mut Self {
        self.palette.insert(name.into(), Arc::new(MaterialDescriptor::from(def)));
        self
    }

    pub fn build(&mut self, descriptors: &[ShapeDescriptor]) -> Result<Scene, ConstructionError> {
        let mut scene = Scene::new();
        let root = scene.root();
        let mut seen = HashSet::with_capacity(descriptors.len());
        for (index, desc) in descriptors.iter().enumerate() {
            let name = desc.display_name(index);
            if !seen.insert(name.clone()) {
                return Err(ConstructionError::MalformedShape { name, reason: "name is already taken".into() });
            }
            let node = self.node_for(&name, desc)?;
            // root always exists, so attaching to it cannot fail
            let _ = scene.add(root, node);
        }
        log::debug!("built scene with {} shapes", descriptors.len());
        Ok(scene)
    }

    fn node_for(&mut self, name: &str, desc: &ShapeDescriptor) -> Result<SceneNode, ConstructionError> {
        let geometry = GeometryDescriptor::new(desc.shape, &desc.dims, desc.segments).map_err(|e| match e {
            ConstructionError::MalformedShape { reason, .. } => {
                ConstructionError::MalformedShape { name: name.to_string(), reason }
            }
            other => other,
        })?;
        let finite = |v: &[f32; 3]| v.iter().all(|c| c.is_finite());
        if !finite(&desc.position) || !finite(&desc.rotation) || !finite(&desc.scale) {
            return Err(ConstructionError::MalformedShape {
                name: name.to_string(),
                reason: "transform contains non-finite values".to_string(),
            });
        }
        if desc.scale.iter().any(|s| *s == 0.0) {
            return Err(ConstructionError::MalformedShape {
                name: name.to_string(),
                reason: "scale must be non-zero".to_string(),
            });
        }

        let material = match &desc.material {
            Some(key) => self
                .palette
                .get(key)
                .cloned()
                .ok_or_else(|| ConstructionError::UnknownMaterial(key.clone()))?,
            None => self.share_material(MaterialDescriptor { color: desc.color, side: desc.side, derived: false }),
        };
        let binding = MeshBinding { geometry: self.share_geometry(geometry), material };
        let transform = Transform::from_parts(
            Vec3::from_array(desc.position),
            Vec3::from_array(desc.rotation),
            Vec3::from_array(desc.scale),
        );
        Ok(SceneNode::mesh(name, binding, transform))
    }

    fn share_geometry(&mut self, geometry: GeometryDescriptor) -> Arc<GeometryDescriptor> {
        if let Some(existing) = self.geometries.iter().find(|g| ***g == geometry) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(geometry);
        self.geometries.push(Arc::clone(&shared));
        shared
    }

    fn share_material(&mut self, material: MaterialDescriptor) -> Arc<MaterialDescriptor> {
        if let Some(existing) = self.inline_materials.iter().find(|m| ***m == material) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(material);
        self.inline_materials.push(Arc::clone(&shared));
        shared
    }
}

/// Build a flat scene: one root with one mesh child per descriptor, in order.
pub fn build_scene(descriptors: &[ShapeDescriptor]) -> Result<Scene, ConstructionError> {
    SceneBuilder::new().build(descriptors)
}
