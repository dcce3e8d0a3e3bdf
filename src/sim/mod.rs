//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by tile and face ID)
//! - No rendering or platform dependencies

pub mod collapse;
pub mod face;
pub mod layers;
pub mod mesh;
pub mod pipeline;
pub mod placement;
pub mod polygon;
pub mod raycast;
pub mod state;
pub mod tick;

pub use collapse::{CollapseReport, collapse_outer_layers};
pub use face::{FaceId, FaceTable, MeshFace, classify_face};
pub use layers::{LayerRegistry, LayerSlot, PlacedTile, TileId, clear_score};
pub use mesh::SphereMesh;
pub use pipeline::{ClearPipeline, PipelineEvent};
pub use placement::{Landing, Support, cast_landing, land_on_face, land_on_tile, resolve_landing};
pub use polygon::{PolygonKind, PolygonTemplate};
pub use raycast::{HitTarget, RayHit, SphereFrame, Surface, cast_ray};
pub use state::{FallingTile, GameEvent, GamePhase, GameState, GhostTile, Piece};
pub use tick::{TickInput, tick};
