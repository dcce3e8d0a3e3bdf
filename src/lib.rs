//! Polysphere - A geodesic sphere tile-stacking puzzle
//!
//! Core modules:
//! - `sim`: Deterministic simulation (face classification, placement, layers, game loop)
//! - `settings`: Data-driven game balance
//! - `error`: Placement failure taxonomy

pub mod error;
pub mod settings;
pub mod sim;

pub use error::PlacementError;
pub use settings::Settings;

use glam::{Quat, Vec3};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Circumradius of the base mesh. Chosen so the pentagon and hexagon
    /// tiles resting on the bare surface both round to the first shell.
    pub const MESH_RADIUS: f32 = 3.495;

    /// Radial thickness of every tile prism (also the shell spacing)
    pub const TILE_DEPTH: f32 = 0.1;
    /// Gap left between the mesh surface and a tile's underside
    pub const SURFACE_CLEARANCE: f32 = 0.01;
    /// Max signed distance from the seed plane for a triangle to join a face
    pub const FACE_PLANE_TOLERANCE: f32 = 0.01;

    /// Canonical layer radii, inner to outer
    pub const CANONICAL_LAYERS: [f32; 10] = [3.3, 3.4, 3.5, 3.6, 3.7, 3.8, 3.9, 4.0, 4.1, 4.2];
    /// A layer holding more tiles than this is complete
    pub const LAYER_COMPLETE_ABOVE: usize = 31;
    /// How far a sandwiched empty slot may be from a tile and still claim it
    pub const SANDWICH_THRESHOLD: f32 = 0.5;

    /// Scoring
    pub const MISMATCH_PENALTY: u64 = 15;
    pub const POINTS_PER_CLEARED_TILE: u64 = 25;
    pub const MULTI_LAYER_BONUS: u64 = 100;
    pub const POINTS_PER_LEVEL: u64 = 1000;
}

/// Check that a transform has no NaN or infinite components
#[inline]
pub fn is_finite_transform(position: Vec3, orientation: Quat) -> bool {
    position.is_finite() && orientation.is_finite()
}

/// Remove the component of `v` along the unit normal `n`
#[inline]
pub fn project_onto_plane(v: Vec3, n: Vec3) -> Vec3 {
    v - n * v.dot(n)
}

/// Signed angle (radians) rotating `from` onto `to` about the unit axis `n`.
///
/// Both vectors are projected onto the plane of `n` first; the sign follows
/// the right-hand rule around `n`.
pub fn signed_angle_about(from: Vec3, to: Vec3, n: Vec3) -> f32 {
    let a = project_onto_plane(from, n);
    let b = project_onto_plane(to, n);
    a.cross(b).dot(n).atan2(a.dot(b))
}
