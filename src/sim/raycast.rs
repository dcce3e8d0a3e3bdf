//! Sphere frame and ray intersection
//!
//! The sphere sits at the world origin and only rotates. Placed tiles and
//! the mesh live in sphere-local space; the falling tile lives in world
//! space. Rays are always cast in sphere-local space.
//!
//! Only `PlacedTile`s take part in collision. Ghost tiles are a separate
//! type and cannot be passed in.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::face::FaceTable;
use super::layers::{PlacedTile, TileId};
use super::mesh::SphereMesh;
use crate::consts::MESH_RADIUS;

/// Rotation of the sphere relative to the world
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereFrame {
    pub rotation: Quat,
}

impl Default for SphereFrame {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
        }
    }
}

impl SphereFrame {
    /// Frame that turns a sphere-local direction to point straight up (world +Y)
    pub fn facing_up(local_dir: Vec3) -> Self {
        Self {
            rotation: Quat::from_rotation_arc(local_dir.normalize(), Vec3::Y),
        }
    }

    #[inline]
    pub fn local_to_world(&self, p: Vec3) -> Vec3 {
        self.rotation * p
    }

    #[inline]
    pub fn world_to_local(&self, p: Vec3) -> Vec3 {
        self.rotation.inverse() * p
    }

    #[inline]
    pub fn orientation_to_world(&self, q: Quat) -> Quat {
        self.rotation * q
    }

    #[inline]
    pub fn orientation_to_local(&self, q: Quat) -> Quat {
        self.rotation.inverse() * q
    }

    /// Spin the sphere about world Y (yaw) and world X (pitch)
    pub fn turn(&mut self, yaw: f32, pitch: f32) {
        self.rotation =
            (Quat::from_rotation_y(yaw) * Quat::from_rotation_x(pitch) * self.rotation).normalize();
    }
}

/// The static surface: mesh plus its classified faces
#[derive(Debug, Clone)]
pub struct Surface {
    mesh: SphereMesh,
    faces: FaceTable,
}

impl Surface {
    pub fn new(mesh: SphereMesh) -> Self {
        let faces = FaceTable::build(&mesh);
        Self { mesh, faces }
    }

    /// Default play field
    pub fn truncated_icosahedron() -> Self {
        Self::new(SphereMesh::truncated_icosahedron(MESH_RADIUS))
    }

    pub fn mesh(&self) -> &SphereMesh {
        &self.mesh
    }

    pub fn faces(&self) -> &FaceTable {
        &self.faces
    }
}

/// What a ray hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Surface { triangle: usize },
    Tile { id: TileId },
}

/// One intersection along a ray (sphere-local)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub target: HitTarget,
    pub point: Vec3,
    pub distance: f32,
}

/// Intersect a ray with the surface and the given tiles.
///
/// Returns every hit ordered by distance. A zero direction yields nothing.
pub fn cast_ray<'a>(
    surface: &Surface,
    tiles: impl IntoIterator<Item = &'a PlacedTile>,
    origin: Vec3,
    dir: Vec3,
) -> Vec<RayHit> {
    let dir = dir.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Vec::new();
    }

    let mut hits: Vec<RayHit> = surface
        .mesh()
        .ray_hits(origin, dir)
        .map(|(triangle, distance)| RayHit {
            target: HitTarget::Surface { triangle },
            point: origin + dir * distance,
            distance,
        })
        .collect();

    hits.extend(tiles.into_iter().filter_map(|tile| {
        tile_cap_hit(tile, origin, dir).map(|distance| RayHit {
            target: HitTarget::Tile { id: tile.id },
            point: origin + dir * distance,
            distance,
        })
    }));

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Ray against a tile's top cap: the template outline at the cap plane
fn tile_cap_hit(tile: &PlacedTile, origin: Vec3, dir: Vec3) -> Option<f32> {
    let template = tile.kind.template();
    let up = tile.up();
    let cap_center = tile.position + up * (template.depth / 2.0);

    let denom = dir.dot(up);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (cap_center - origin).dot(up) / denom;
    if t < 0.0 {
        return None;
    }
    let offset = origin + dir * t - cap_center;
    if offset.length() > template.radius {
        return None;
    }
    template.contains(tile.orientation.inverse() * offset).then_some(t)
}
