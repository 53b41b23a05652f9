//! Card silhouette and extrusion
//!
//! The card outline is a rounded rectangle built from four straight edges and
//! four quadratic corner arcs whose control points sit on the rectangle
//! corners. The same segment list drives both the sampled outline used for
//! the 3D solid and the path written into vector exports.

use crate::mesh::{Mesh, Vertex};
use glam::{Vec2, Vec3};
use std::f32::consts::FRAC_PI_2;

/// Samples per quadratic corner arc
pub const CURVE_SEGMENTS: u32 = 12;

/// One drawing command of a rounded rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line { to: Vec2 },
    Quad { ctrl: Vec2, to: Vec2 },
}

/// A rounded rectangle anchored at `origin` (its minimum corner)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub origin: Vec2,
    pub width: f32,
    pub height: f32,
    pub radius: f32,
}

impl RoundedRect {
    /// A rounded rectangle centered on the origin
    pub fn centered(width: f32, height: f32, radius: f32) -> Self {
        Self {
            origin: Vec2::new(-width / 2.0, -height / 2.0),
            width,
            height,
            radius,
        }
    }

    /// First point of the path (on the bottom edge, after the first corner)
    pub fn start(&self) -> Vec2 {
        Vec2::new(self.origin.x + self.radius, self.origin.y)
    }

    /// Drawing commands after [`RoundedRect::start`]; the last one returns to the start
    pub fn segments(&self) -> [Segment; 8] {
        let Vec2 { x, y } = self.origin;
        let (w, h, r) = (self.width, self.height, self.radius);

        [
            Segment::Line {
                to: Vec2::new(x + w - r, y),
            },
            Segment::Quad {
                ctrl: Vec2::new(x + w, y),
                to: Vec2::new(x + w, y + r),
            },
            Segment::Line {
                to: Vec2::new(x + w, y + h - r),
            },
            Segment::Quad {
                ctrl: Vec2::new(x + w, y + h),
                to: Vec2::new(x + w - r, y + h),
            },
            Segment::Line {
                to: Vec2::new(x + r, y + h),
            },
            Segment::Quad {
                ctrl: Vec2::new(x, y + h),
                to: Vec2::new(x, y + h - r),
            },
            Segment::Line {
                to: Vec2::new(x, y + r),
            },
            Segment::Quad {
                ctrl: Vec2::new(x, y),
                to: self.start(),
            },
        ]
    }

    /// Sample the path into a closed outline
    pub fn outline(&self, curve_segments: u32) -> Outline {
        let curve_segments = curve_segments.max(1);
        let mut points = vec![self.start()];
        let mut current = self.start();

        for segment in self.segments() {
            match segment {
                Segment::Line { to } => points.push(to),
                Segment::Quad { ctrl, to } => {
                    for i in 1..curve_segments {
                        let t = i as f32 / curve_segments as f32;
                        let u = 1.0 - t;
                        points.push(current * (u * u) + ctrl * (2.0 * u * t) + to * (t * t));
                    }
                    points.push(to);
                }
            }
            current = match segment {
                Segment::Line { to } | Segment::Quad { to, .. } => to,
            };
        }

        Outline { points }
    }
}

/// A closed 2D polyline: the first point is repeated as the last
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub points: Vec<Vec2>,
}

impl Outline {
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => self.points.len() > 1 && first == last,
            _ => false,
        }
    }

    /// Points without the closing duplicate
    pub fn contour(&self) -> &[Vec2] {
        if self.is_closed() {
            &self.points[..self.points.len() - 1]
        } else {
            &self.points
        }
    }

    /// Signed area; positive for counter-clockwise winding
    pub fn signed_area(&self) -> f32 {
        let contour = self.contour();
        let n = contour.len();
        (0..n)
            .map(|i| contour[i].perp_dot(contour[(i + 1) % n]))
            .sum::<f32>()
            * 0.5
    }

    /// Outward vertex normals of a counter-clockwise contour
    fn vertex_normals(&self) -> Vec<Vec2> {
        let contour = self.contour();
        let n = contour.len();
        let edge_normal = |a: Vec2, b: Vec2| {
            let d = b - a;
            Vec2::new(d.y, -d.x).normalize_or_zero()
        };

        (0..n)
            .map(|i| {
                let prev = contour[(i + n - 1) % n];
                let here = contour[i];
                let next = contour[(i + 1) % n];
                (edge_normal(prev, here) + edge_normal(here, next)).normalize_or_zero()
            })
            .collect()
    }
}

/// Symmetric bevel around both caps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bevel {
    /// Depth the bevel adds in front of and behind the solid
    pub thickness: f32,
    /// Distance the bevel pushes the side walls outwards
    pub size: f32,
    pub segments: u32,
}

/// Extrude a counter-clockwise outline from `z = 0` to `z = depth`
///
/// The front cap faces +Z. With a bevel the caps move out to
/// `-bevel.thickness` and `depth + bevel.thickness` and the walls between
/// them bulge outwards by `bevel.size`.
pub fn extrude(outline: &Outline, depth: f32, bevel: Option<Bevel>) -> Mesh {
    let contour = outline.contour();
    if contour.len() < 3 {
        return Mesh::new();
    }

    let rings = ring_profile(depth, bevel);
    let normals = outline.vertex_normals();
    let ring_points: Vec<Vec<Vec3>> = rings
        .iter()
        .map(|&(offset, z)| {
            contour
                .iter()
                .zip(&normals)
                .map(|(&p, &n)| (p + n * offset).extend(z))
                .collect()
        })
        .collect();

    let mut mesh = side_walls(&ring_points, contour);

    let (min, max) = bounds_2d(contour);
    if let (Some(back), Some(front)) = (ring_points.first(), ring_points.last()) {
        mesh.append(&cap(back, min, max, false));
        mesh.append(&cap(front, min, max, true));
    }

    mesh
}

/// `(outward offset, z)` for every ring of the extrusion, back to front
fn ring_profile(depth: f32, bevel: Option<Bevel>) -> Vec<(f32, f32)> {
    let Some(bevel) = bevel.filter(|b| b.segments > 0) else {
        return vec![(0.0, 0.0), (0.0, depth)];
    };

    let steps = bevel.segments;
    let profile = |b: u32| {
        let t = b as f32 / steps as f32 * FRAC_PI_2;
        (bevel.size * t.sin(), bevel.thickness * t.cos())
    };

    let mut rings: Vec<(f32, f32)> = (0..=steps)
        .map(|b| {
            let (offset, z) = profile(b);
            (offset, -z)
        })
        .collect();
    rings.extend((0..=steps).rev().map(|b| {
        let (offset, z) = profile(b);
        (offset, depth + z)
    }));
    rings
}

fn side_walls(rings: &[Vec<Vec3>], contour: &[Vec2]) -> Mesh {
    let n = contour.len();
    let perimeter: Vec<f32> = std::iter::once(0.0)
        .chain(contour.windows(2).scan(0.0, |acc, w| {
            *acc += w[0].distance(w[1]);
            Some(*acc)
        }))
        .collect();
    let total = perimeter.last().copied().unwrap_or(0.0)
        + contour[n - 1].distance(contour[0]);
    let ring_count = rings.len();

    let mut mesh = Mesh::new();
    for (r, ring) in rings.iter().enumerate() {
        let v = r as f32 / (ring_count - 1).max(1) as f32;
        for (i, &p) in ring.iter().enumerate() {
            let u = if total > 0.0 { perimeter[i] / total } else { 0.0 };
            mesh.vertices
                .push(Vertex::new(p, Vec3::ZERO, Vec2::new(u, v)));
        }
    }

    for r in 0..ring_count.saturating_sub(1) {
        let lower = (r * n) as u32;
        let upper = ((r + 1) * n) as u32;
        for i in 0..n as u32 {
            let next = (i + 1) % n as u32;
            let (a, b) = (lower + i, lower + next);
            let (c, d) = (upper + next, upper + i);
            mesh.indices.extend_from_slice(&[a, b, c, a, c, d]);
        }
    }

    mesh.recalculate_normals();
    mesh
}

/// Fan-triangulated cap; valid because the card outline is convex
fn cap(ring: &[Vec3], min: Vec2, max: Vec2, front: bool) -> Mesh {
    let size = (max - min).max(Vec2::splat(f32::EPSILON));
    let center = ring.iter().copied().sum::<Vec3>() / ring.len() as f32;
    let normal = if front { Vec3::Z } else { Vec3::NEG_Z };
    let uv = |p: Vec3| {
        let t = (p.truncate() - min) / size;
        Vec2::new(t.x, 1.0 - t.y)
    };

    let mut mesh = Mesh::new();
    mesh.vertices.push(Vertex::new(center, normal, uv(center)));
    mesh.vertices
        .extend(ring.iter().map(|&p| Vertex::new(p, normal, uv(p))));

    let n = ring.len() as u32;
    for i in 0..n {
        let a = 1 + i;
        let b = 1 + (i + 1) % n;
        if front {
            mesh.indices.extend_from_slice(&[0, a, b]);
        } else {
            mesh.indices.extend_from_slice(&[0, b, a]);
        }
    }
    mesh
}

fn bounds_2d(points: &[Vec2]) -> (Vec2, Vec2) {
    points.iter().fold(
        (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)),
        |(min, max), &p| (min.min(p), max.max(p)),
    )
}
