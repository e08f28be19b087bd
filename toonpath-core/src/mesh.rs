use bytemuck::{Pod, Zeroable};
use std::f32::consts::{PI, TAU};

use crate::scene::{GeometryDescriptor, ShapeKind, Side};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
}

/// Indexed triangle list, counter-clockwise front faces.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Swap every triangle's winding so back faces become front faces.
    pub fn flip_winding(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }

    /// Winding a host with back-face culling needs to draw `side`.
    pub fn for_side(mut self, side: Side) -> Self {
        if side == Side::Back {
            self.flip_winding();
        }
        self
    }

    /// Raw vertex bytes, ready for a GPU upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    fn push(&mut self, pos: [f32; 3], normal: [f32; 3]) -> u32 {
        self.vertices.push(Vertex { pos, normal });
        (self.vertices.len() - 1) as u32
    }
}

pub fn tessellate(geometry: &GeometryDescriptor) -> Mesh {
    let d = geometry.dims();
    let s = geometry.segments();
    match geometry.kind() {
        ShapeKind::Box => generate_box(d[0], d[1], d[2]),
        ShapeKind::Plane => generate_plane(d[0], d[1], s),
        ShapeKind::Circle => generate_circle(d[0], s),
        ShapeKind::Cylinder => generate_cylinder(d[0], d[1], d[2], s),
        ShapeKind::Sphere => generate_uv_sphere(d[0], s, s),
    }
}

// Each face is a quad built from its normal and two in-plane axes.
pub fn generate_box(width: f32, height: f32, depth: f32) -> Mesh {
    let half = [width / 2.0, height / 2.0, depth / 2.0];
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    let mut mesh = Mesh::default();
    for (n, u, v) in faces {
        let corner = |su: f32, sv: f32| {
            let mut p = [0.0; 3];
            for i in 0..3 {
                p[i] = (n[i] + u[i] * su + v[i] * sv) * half[i];
            }
            p
        };
        let a = mesh.push(corner(-1.0, -1.0), n);
        let b = mesh.push(corner(1.0, -1.0), n);
        let c = mesh.push(corner(1.0, 1.0), n);
        let e = mesh.push(corner(-1.0, 1.0), n);
        mesh.indices.extend_from_slice(&[a, b, c, a, c, e]);
    }
    mesh
}

// XY plane facing +Z, `segments` x `segments` grid.
pub fn generate_plane(width: f32, height: f32, segments: u32) -> Mesh {
    let segments = segments.max(1);
    let mut mesh = Mesh::default();
    for iy in 0..=segments {
        let y = (0.5 - iy as f32 / segments as f32) * height;
        for ix in 0..=segments {
            let x = (ix as f32 / segments as f32 - 0.5) * width;
            mesh.push([x, y, 0.0], [0.0, 0.0, 1.0]);
        }
    }
    let stride = segments + 1;
    for iy in 0..segments {
        for ix in 0..segments {
            let a = iy * stride + ix;
            let b = a + stride;
            let c = b + 1;
            let d = a + 1;
            mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }
    mesh
}

// Triangle fan in the XY plane facing +Z.
pub fn generate_circle(radius: f32, segments: u32) -> Mesh {
    let segments = segments.max(3);
    let mut mesh = Mesh::default();
    let center = mesh.push([0.0, 0.0, 0.0], [0.0, 0.0, 1.0]);
    for i in 0..=segments {
        let theta = i as f32 / segments as f32 * TAU;
        mesh.push([radius * theta.cos(), radius * theta.sin(), 0.0], [0.0, 0.0, 1.0]);
    }
    for i in 1..=segments {
        mesh.indices.extend_from_slice(&[center, i, i + 1]);
    }
    mesh
}

// Y-up cylinder centered at the origin; a zero radius drops that cap (cone).
pub fn generate_cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Mesh {
    let segments = segments.max(3);
    let half = height / 2.0;
    let slope = (radius_bottom - radius_top) / height;
    let mut mesh = Mesh::default();

    for row in 0..2 {
        let (y, r) = if row == 0 { (half, radius_top) } else { (-half, radius_bottom) };
        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * TAU;
            let (sin, cos) = theta.sin_cos();
            let n = [sin, slope, cos];
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            mesh.push([r * sin, y, r * cos], [n[0] / len, n[1] / len, n[2] / len]);
        }
    }
    let stride = segments + 1;
    for i in 0..segments {
        let a = i;
        let b = i + stride;
        let c = b + 1;
        let d = a + 1;
        mesh.indices.extend_from_slice(&[a, b, d, b, c, d]);
    }

    for (y, r, up) in [(half, radius_top, true), (-half, radius_bottom, false)] {
        if r <= 0.0 {
            continue;
        }
        let normal = [0.0, if up { 1.0 } else { -1.0 }, 0.0];
        let center = mesh.push([0.0, y, 0.0], normal);
        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * TAU;
            mesh.push([r * theta.sin(), y, r * theta.cos()], normal);
        }
        for i in 0..segments {
            let a = center + 1 + i;
            if up {
                mesh.indices.extend_from_slice(&[center, a, a + 1]);
            } else {
                mesh.indices.extend_from_slice(&[center, a + 1, a]);
            }
        }
    }
    mesh
}

// Latitude rings from +Y down to -Y, each split into `slices` longitude steps.
pub fn generate_uv_sphere(radius: f32, stacks: u32, slices: u32) -> Mesh {
    let stacks = stacks.max(3);
    let slices = slices.max(3);
    let mut mesh = Mesh::default();

    for i in 0..=stacks {
        let theta = i as f32 / stacks as f32 * PI;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..=slices {
            let phi = j as f32 / slices as f32 * TAU;
            let (sin_p, cos_p) = phi.sin_cos();
            let n = [sin_t * cos_p, cos_t, sin_t * sin_p];
            mesh.push([radius * n[0], radius * n[1], radius * n[2]], n);
        }
    }

    let stride = slices + 1;
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * stride + j;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, b, c]);
            mesh.indices.extend_from_slice(&[b, d, c]);
        }
    }
    mesh
}
