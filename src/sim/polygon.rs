//! Tile polygon templates
//!
//! A tile is a regular polygon prism. Its local frame has "up" along +Y
//! (the prism axis) and the first outline vertex on +X.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::TILE_DEPTH;

/// Tile shape identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolygonKind {
    Pentagon,
    Hexagon,
}

impl PolygonKind {
    pub const ALL: [PolygonKind; 2] = [PolygonKind::Pentagon, PolygonKind::Hexagon];

    /// Number of sides
    pub fn sides(self) -> usize {
        match self {
            PolygonKind::Pentagon => 5,
            PolygonKind::Hexagon => 6,
        }
    }

    /// Classify a side count; anything but 5 or 6 is unsupported
    pub fn from_sides(sides: usize) -> Option<Self> {
        match sides {
            5 => Some(PolygonKind::Pentagon),
            6 => Some(PolygonKind::Hexagon),
            _ => None,
        }
    }

    /// Template used to build tiles of this shape
    pub fn template(self) -> &'static PolygonTemplate {
        match self {
            PolygonKind::Pentagon => &PENTAGON,
            PolygonKind::Hexagon => &HEXAGON,
        }
    }
}

/// Immutable prism template
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolygonTemplate {
    pub kind: PolygonKind,
    /// Circumradius of the outline
    pub radius: f32,
    /// Prism thickness along local +Y
    pub depth: f32,
}

pub const PENTAGON: PolygonTemplate = PolygonTemplate {
    kind: PolygonKind::Pentagon,
    radius: 1.15,
    depth: TILE_DEPTH,
};

pub const HEXAGON: PolygonTemplate = PolygonTemplate {
    kind: PolygonKind::Hexagon,
    radius: 1.35,
    depth: TILE_DEPTH,
};

impl PolygonTemplate {
    pub fn sides(&self) -> usize {
        self.kind.sides()
    }

    /// Outline vertices in the local XZ plane, counter-clockwise seen from +Y
    pub fn outline(&self) -> Vec<Vec3> {
        let n = self.sides();
        (0..n)
            .map(|i| {
                let theta = i as f32 / n as f32 * std::f32::consts::TAU;
                Vec3::new(self.radius * theta.cos(), 0.0, -self.radius * theta.sin())
            })
            .collect()
    }

    /// Whether a local point lies inside the outline (XZ projection, edges inclusive)
    pub fn contains(&self, local: Vec3) -> bool {
        let outline = self.outline();
        outline.iter().zip(outline.iter().cycle().skip(1)).all(|(&a, &b)| {
            let edge = b - a;
            let to_point = local - a;
            // Counter-clockwise outline: inside is left of every edge
            edge.z * to_point.x - edge.x * to_point.z >= -1e-6
        })
    }

    /// Local reference edge: from the first outline vertex to the center
    pub fn reference_edge(&self) -> Vec3 {
        Vec3::new(-self.radius, 0.0, 0.0)
    }
}
