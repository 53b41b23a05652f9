//! Triangle meshes shared by the card, the component quads and every exporter

use glam::{Vec2, Vec3};

/// A vertex with position, normal, and UV coordinates
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
            uv: uv.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }

    pub fn uv(&self) -> Vec2 {
        Vec2::from_array(self.uv)
    }
}

/// A triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flat rectangle in the XY plane, centered on the origin, facing +Z
    ///
    /// UV (0,0) is the top-left corner so image rows map top to bottom.
    pub fn plane(width: f32, height: f32) -> Self {
        let hw = width * 0.5;
        let hh = height * 0.5;
        let corners = [
            (Vec3::new(-hw, hh, 0.0), Vec2::new(0.0, 0.0)),
            (Vec3::new(hw, hh, 0.0), Vec2::new(1.0, 0.0)),
            (Vec3::new(-hw, -hh, 0.0), Vec2::new(0.0, 1.0)),
            (Vec3::new(hw, -hh, 0.0), Vec2::new(1.0, 1.0)),
        ];

        Self {
            vertices: corners
                .iter()
                .map(|&(p, uv)| Vertex::new(p, Vec3::Z, uv))
                .collect(),
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    /// Get number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Get number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Axis-aligned bounds as `(min, max)`; zero for an empty mesh
    pub fn bounds(&self) -> (Vec3, Vec3) {
        if self.vertices.is_empty() {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for v in &self.vertices {
            let p = v.position();
            min = min.min(p);
            max = max.max(p);
        }
        (min, max)
    }

    /// Append another mesh, re-basing its indices
    pub fn append(&mut self, other: &Mesh) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.indices.extend(other.indices.iter().map(|&i| i + base));
    }

    /// Calculate face normals and smooth them
    pub fn recalculate_normals(&mut self) {
        // Reset normals
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        // Accumulate face normals
        for tri in self.indices.chunks_exact(3) {
            let i0 = tri[0] as usize;
            let i1 = tri[1] as usize;
            let i2 = tri[2] as usize;

            let p0 = self.vertices[i0].position();
            let p1 = self.vertices[i1].position();
            let p2 = self.vertices[i2].position();

            let face_normal = (p1 - p0).cross(p2 - p0);

            // Area-weighted; normalized below
            for &i in &[i0, i1, i2] {
                let n = self.vertices[i].normal() + face_normal;
                self.vertices[i].normal = n.to_array();
            }
        }

        for v in &mut self.vertices {
            v.normal = v.normal().normalize_or_zero().to_array();
        }
    }
}
