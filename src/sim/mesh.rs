//! Static sphere mesh
//!
//! Indexed triangle buffer approximating a sphere with planar pentagon and
//! hexagon faces. Loaded (or generated) once; never mutated afterwards.

use std::collections::HashSet;

use glam::Vec3;

use crate::error::MeshError;

/// Barycentric slack so rays through a shared edge still hit a triangle
const BARY_EPS: f32 = 1e-5;

/// Read-only indexed triangle mesh, in sphere-local coordinates
#[derive(Debug, Clone)]
pub struct SphereMesh {
    positions: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl SphereMesh {
    /// Wrap vertex and index buffers, validating every index
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Result<Self, MeshError> {
        if triangles.is_empty() {
            return Err(MeshError::Empty);
        }
        for (triangle, tri) in triangles.iter().enumerate() {
            if let Some(&vertex) = tri.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    vertex,
                    count: positions.len(),
                });
            }
        }
        Ok(Self {
            positions,
            triangles,
        })
    }

    /// Truncated icosahedron (12 pentagons, 20 hexagons) with the given
    /// circumradius. Each face is fanned from its first vertex, so a face
    /// owns exactly as many vertices as it has sides.
    pub fn truncated_icosahedron(radius: f32) -> Self {
        let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
        // Edge length 2; all even permutations and sign flips of these
        let bases = [
            [0.0, 1.0, 3.0 * phi],
            [1.0, 2.0 + phi, 2.0 * phi],
            [phi, 2.0, 2.0 * phi + 1.0],
        ];

        let mut raw: Vec<Vec3> = Vec::with_capacity(60);
        for base in bases {
            for signs in 0..8u32 {
                // Zero components have no sign to flip
                if (0..3).any(|axis| base[axis] == 0.0 && signs & (1 << axis) != 0) {
                    continue;
                }
                let v: [f32; 3] = std::array::from_fn(|axis| {
                    if signs & (1 << axis) != 0 {
                        -base[axis]
                    } else {
                        base[axis]
                    }
                });
                for shift in 0..3 {
                    raw.push(Vec3::new(v[shift], v[(shift + 1) % 3], v[(shift + 2) % 3]));
                }
            }
        }

        // Edges have length 2 in the raw coordinates
        let neighbors: Vec<Vec<usize>> = (0..raw.len())
            .map(|a| {
                (0..raw.len())
                    .filter(|&b| b != a && (raw[a].distance_squared(raw[b]) - 4.0).abs() < 1e-3)
                    .collect()
            })
            .collect();

        // Walk each directed edge around the face on its left (seen from outside)
        let mut used: HashSet<(usize, usize)> = HashSet::new();
        let mut faces: Vec<Vec<usize>> = Vec::with_capacity(32);
        for a in 0..raw.len() {
            for &b in &neighbors[a] {
                if used.contains(&(a, b)) {
                    continue;
                }
                let mut face = vec![a];
                let (mut prev, mut cur) = (a, b);
                for _ in 0..8 {
                    used.insert((prev, cur));
                    if cur == a {
                        break;
                    }
                    face.push(cur);
                    let incoming = raw[cur] - raw[prev];
                    let next = neighbors[cur].iter().copied().find(|&w| {
                        w != prev && incoming.cross(raw[w] - raw[cur]).dot(raw[cur]) > 0.0
                    });
                    match next {
                        Some(next) => {
                            prev = cur;
                            cur = next;
                        }
                        None => break,
                    }
                }
                faces.push(face);
            }
        }

        let scale = radius / raw[0].length();
        let positions = raw.into_iter().map(|v| v * scale).collect();
        let triangles = faces
            .iter()
            .flat_map(|face| {
                (1..face.len().saturating_sub(1))
                    .map(move |i| [face[0] as u32, face[i] as u32, face[i + 1] as u32])
            })
            .collect();

        Self {
            positions,
            triangles,
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn vertex(&self, index: u32) -> Vec3 {
        self.positions[index as usize]
    }

    /// Corner positions of a triangle
    pub fn triangle_corners(&self, triangle: usize) -> [Vec3; 3] {
        self.triangles[triangle].map(|i| self.positions[i as usize])
    }

    /// Every triangle the ray crosses, as (triangle, distance), in index order
    pub fn ray_hits(&self, origin: Vec3, dir: Vec3) -> impl Iterator<Item = (usize, f32)> + '_ {
        (0..self.triangles.len())
            .filter_map(move |tri| ray_triangle(origin, dir, self.triangle_corners(tri)).map(|t| (tri, t)))
    }
}

/// Möller-Trumbore ray/triangle test. Returns the ray parameter `t >= 0`
/// (a distance when `dir` is unit length). Both windings are accepted.
pub fn ray_triangle(origin: Vec3, dir: Vec3, [a, b, c]: [Vec3; 3]) -> Option<f32> {
    let e1 = b - a;
    let e2 = c - a;
    let p = dir.cross(e2);
    let det = e1.dot(p);
    if det.abs() < 1e-9 {
        return None; // Parallel
    }
    let inv_det = 1.0 / det;

    let s = origin - a;
    let u = s.dot(p) * inv_det;
    if !(-BARY_EPS..=1.0 + BARY_EPS).contains(&u) {
        return None;
    }

    let q = s.cross(e1);
    let v = dir.dot(q) * inv_det;
    if v < -BARY_EPS || u + v > 1.0 + BARY_EPS {
        return None;
    }

    let t = e2.dot(q) * inv_det;
    (t >= 0.0).then_some(t)
}
