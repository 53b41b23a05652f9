//! Ray casting against planes and meshes

use cloudcard_core::mesh::Mesh;
use glam::{Mat4, Vec3};

/// A ray in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersection with the plane through `point` with `normal`
    ///
    /// `None` when the ray is parallel to the plane or the plane is behind it.
    pub fn intersect_plane(&self, point: Vec3, normal: Vec3) -> Option<Vec3> {
        let denom = normal.dot(self.direction);
        if denom.abs() < 1e-6 {
            return None;
        }
        let t = (point - self.origin).dot(normal) / denom;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Möller-Trumbore ray-triangle intersection algorithm.
/// Returns the distance along the ray if hit, or None if no intersection.
pub fn ray_triangle_intersect(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);

    // Ray is parallel to triangle
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

/// Nearest hit distance of a ray with a transformed mesh
pub fn ray_mesh_intersect(ray: &Ray, mesh: &Mesh, transform: Mat4) -> Option<f32> {
    let world: Vec<Vec3> = mesh
        .vertices
        .iter()
        .map(|v| transform.transform_point3(v.position()))
        .collect();

    mesh.indices
        .chunks_exact(3)
        .filter_map(|tri| {
            ray_triangle_intersect(
                ray,
                world[tri[0] as usize],
                world[tri[1] as usize],
                world[tri[2] as usize],
            )
        })
        .min_by(f32::total_cmp)
}
