use thiserror::Error;

use crate::sim::layers::LayerSlot;
use crate::sim::polygon::PolygonKind;

/// Reasons a tile could not be placed where it was headed.
///
/// None of these are fatal: the component that detects one absorbs it
/// (penalty and respawn, silent discard, radial fallback, warned discard).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlacementError {
    /// The tile's polygon differs from the face or stack it hit.
    /// `target` is `None` when the face is neither a pentagon nor a hexagon.
    #[error("shape mismatch: {tile:?} tile cannot rest on {target:?}")]
    ShapeMismatch {
        tile: PolygonKind,
        target: Option<PolygonKind>,
    },

    /// The resolved transform contains NaN or infinite components.
    #[error("degenerate landing transform")]
    GeometricDegenerate,

    /// Nothing to land on along the cast ray.
    #[error("no landing target")]
    NoLandingTarget,

    /// A collapsing tile needs a slot inside the innermost canonical layer.
    #[error("no canonical layer inside {layer:?}")]
    SequenceExhausted { layer: LayerSlot },
}

impl PlacementError {
    /// Whether the player is charged for this failure
    pub fn is_penalized(&self) -> bool {
        matches!(self, PlacementError::ShapeMismatch { .. })
    }
}

/// Problems with a supplied surface mesh
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("triangle {triangle} references vertex {vertex}, but the mesh has {count} vertices")]
    IndexOutOfRange {
        triangle: usize,
        vertex: u32,
        count: usize,
    },

    #[error("mesh has no triangles")]
    Empty,
}
