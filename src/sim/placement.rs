//! Landing resolution
//!
//! Turns a ray hit into the final sphere-local transform of a tile, or a
//! rejection. Used both for falling tiles and for tiles re-landing after a
//! layer collapse.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::face::{FaceId, MeshFace};
use super::layers::{LayerRegistry, PlacedTile, TileId};
use super::polygon::PolygonKind;
use super::raycast::{HitTarget, RayHit, Surface, cast_ray};
use crate::consts::SURFACE_CLEARANCE;
use crate::error::PlacementError;
use crate::{is_finite_transform, signed_angle_about};

/// What a placed tile rests on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Support {
    /// Directly on a mesh face
    Face(FaceId),
    /// On top of another tile
    Tile(TileId),
    /// Nowhere in particular (radial fallback after a collapse)
    Free,
}

/// Resolved landing transform (sphere-local)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landing {
    pub position: Vec3,
    pub orientation: Quat,
    pub support: Support,
    /// Mesh face at the bottom of the stack
    pub column: Option<FaceId>,
}

/// Resolve a hit for a tile of the given shape.
///
/// A mesh hit on a face that already holds a tile is resolved against the
/// top of that face's column instead: the ray slipped past the cap.
pub fn resolve_landing(
    kind: PolygonKind,
    hit: &RayHit,
    surface: &Surface,
    registry: &LayerRegistry,
) -> Result<Landing, PlacementError> {
    let landing = match hit.target {
        HitTarget::Surface { triangle } => {
            let face = surface
                .faces()
                .face_of(triangle)
                .ok_or(PlacementError::NoLandingTarget)?;
            match registry.column_top(face.id) {
                Some(top) => land_on_tile(kind, top)?,
                None => land_on_face(kind, face)?,
            }
        }
        HitTarget::Tile { id } => {
            let support = registry.tile(id).ok_or(PlacementError::NoLandingTarget)?;
            land_on_tile(kind, support)?
        }
    };

    if !is_finite_transform(landing.position, landing.orientation) {
        return Err(PlacementError::GeometricDegenerate);
    }
    Ok(landing)
}

/// Seat a tile on a bare mesh face
pub fn land_on_face(kind: PolygonKind, face: &MeshFace) -> Result<Landing, PlacementError> {
    if face.kind != Some(kind) {
        return Err(PlacementError::ShapeMismatch {
            tile: kind,
            target: face.kind,
        });
    }

    let template = kind.template();
    let position = face.centroid + face.normal * (template.depth / 2.0 + SURFACE_CLEARANCE);

    // Tile up onto the face normal, then twist so the reference edges agree
    let tilt = Quat::from_rotation_arc(Vec3::Y, face.normal);
    let edge = tilt * template.reference_edge();
    let twist = signed_angle_about(edge, face.reference_edge, face.normal);
    let orientation = (Quat::from_axis_angle(face.normal, twist) * tilt).normalize();

    Ok(Landing {
        position,
        orientation,
        support: Support::Face(face.id),
        column: Some(face.id),
    })
}

/// Stack a tile on another one: straight up one depth, same orientation
pub fn land_on_tile(kind: PolygonKind, support: &PlacedTile) -> Result<Landing, PlacementError> {
    if support.kind != kind {
        return Err(PlacementError::ShapeMismatch {
            tile: kind,
            target: Some(support.kind),
        });
    }

    Ok(Landing {
        position: support.position + support.up() * kind.template().depth,
        orientation: support.orientation,
        support: Support::Tile(support.id),
        column: support.column,
    })
}

/// Cast from `origin` (sphere-local) toward the center and resolve the first hit
pub fn cast_landing(
    kind: PolygonKind,
    origin: Vec3,
    surface: &Surface,
    registry: &LayerRegistry,
) -> Option<(RayHit, Result<Landing, PlacementError>)> {
    let hit = cast_ray(surface, registry.tiles(), origin, -origin)
        .into_iter()
        .next()?;
    Some((hit, resolve_landing(kind, &hit, surface, registry)))
}
