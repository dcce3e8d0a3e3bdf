//! Outer-layer collapse after a clear
//!
//! Every layer outside the cleared one is lifted out of the registry and
//! re-landed one slot further in, innermost first, so each tile can rest on
//! the tiles that settled before it.

use super::layers::{LayerRegistry, LayerSlot, PlacedTile, TileId};
use super::placement::{Landing, Support, cast_landing};
use super::raycast::Surface;
use crate::error::PlacementError;
use crate::is_finite_transform;

/// What happened to the tiles outside a cleared layer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollapseReport {
    /// (tile, old layer, new layer)
    pub moved: Vec<(TileId, LayerSlot, LayerSlot)>,
    /// Tiles that found nothing to land on and were placed radially
    pub degraded: Vec<TileId>,
    /// Tiles removed from play
    pub discarded: Vec<(TileId, PlacementError)>,
}

/// Collapse every layer outside `cleared` one slot inward.
///
/// The cleared layer itself must already be gone from the registry.
pub fn collapse_outer_layers(
    cleared: LayerSlot,
    registry: &mut LayerRegistry,
    surface: &Surface,
) -> CollapseReport {
    let mut report = CollapseReport::default();

    for (layer, mut tiles) in registry.detach_outside(cleared) {
        // Innermost first, and each settles before the next casts, so two
        // tiles sharing a column and a layer stack instead of coinciding
        tiles.sort_by(|a, b| a.position.length_squared().total_cmp(&b.position.length_squared()));
        for tile in tiles {
            let id = tile.id;
            match relocate(tile, registry, surface) {
                Ok((tile, degraded)) => {
                    if degraded {
                        log::warn!(
                            "Tile {:?} found no landing target, placed radially at {:.1}",
                            id,
                            tile.layer.radius()
                        );
                        report.degraded.push(id);
                    }
                    report.moved.push((id, layer, tile.layer));
                    registry.reinsert(tile);
                }
                Err(err) => {
                    match err {
                        PlacementError::SequenceExhausted { .. } => {
                            log::warn!("Discarding tile {:?}: {}", id, err)
                        }
                        _ => log::debug!("Discarding tile {:?}: {}", id, err),
                    }
                    report.discarded.push((id, err));
                }
            }
        }
    }

    registry.normalize_sequence();
    log::info!(
        "Collapsed onto layer {:.1}: {} moved ({} degraded), {} discarded",
        cleared.radius(),
        report.moved.len(),
        report.degraded.len(),
        report.discarded.len()
    );
    report
}

/// Re-land one detached tile into the slot inside its own.
/// The flag is true when the radial fallback was used.
fn relocate(
    tile: PlacedTile,
    registry: &LayerRegistry,
    surface: &Surface,
) -> Result<(PlacedTile, bool), PlacementError> {
    let target = tile
        .layer
        .inward()
        .ok_or(PlacementError::SequenceExhausted { layer: tile.layer })?;

    let landing = match cast_landing(tile.kind, tile.position, surface, registry) {
        Some((_, Ok(landing))) => Some(landing),
        Some((_, Err(PlacementError::GeometricDegenerate))) => {
            return Err(PlacementError::GeometricDegenerate);
        }
        // No hit, or the shape below no longer matches
        _ => None,
    };
    let degraded = landing.is_none();
    let landing = landing.unwrap_or_else(|| radial_fallback(&tile, target));

    if !is_finite_transform(landing.position, landing.orientation) {
        return Err(PlacementError::GeometricDegenerate);
    }

    Ok((
        PlacedTile {
            position: landing.position,
            orientation: landing.orientation,
            support: landing.support,
            column: landing.column,
            layer: target,
            ..tile
        },
        degraded,
    ))
}

/// Same direction from the center, at the target layer's radius
fn radial_fallback(tile: &PlacedTile, target: LayerSlot) -> Landing {
    Landing {
        position: tile.position.normalize() * target.radius(),
        orientation: tile.orientation,
        support: Support::Free,
        column: None,
    }
}
