//! Radial layer bookkeeping
//!
//! Every placed tile belongs to exactly one canonical layer (a shell at a
//! fixed radius). The registry is keyed by `LayerSlot`, an index into the
//! canonical sequence, so two spellings of the same radius can never become
//! two buckets.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::face::FaceId;
use super::placement::{Landing, Support};
use super::polygon::{PolygonKind, PolygonTemplate};
use crate::consts::{
    CANONICAL_LAYERS, LAYER_COMPLETE_ABOVE, MULTI_LAYER_BONUS, POINTS_PER_CLEARED_TILE,
    SANDWICH_THRESHOLD,
};

/// Placed tile identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId(pub u32);

/// Position in the canonical layer sequence (0 = innermost)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LayerSlot(u8);

impl LayerSlot {
    pub const COUNT: usize = CANONICAL_LAYERS.len();
    pub const INNERMOST: LayerSlot = LayerSlot(0);
    pub const OUTERMOST: LayerSlot = LayerSlot((Self::COUNT - 1) as u8);

    pub fn new(index: usize) -> Option<Self> {
        (index < Self::COUNT).then_some(LayerSlot(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Canonical radius of this layer
    pub fn radius(self) -> f32 {
        CANONICAL_LAYERS[self.index()]
    }

    /// Next slot toward the center
    pub fn inward(self) -> Option<Self> {
        self.index().checked_sub(1).and_then(Self::new)
    }

    /// Next slot away from the center
    pub fn outward(self) -> Option<Self> {
        Self::new(self.index() + 1)
    }

    pub fn is_outermost(self) -> bool {
        self == Self::OUTERMOST
    }

    /// All slots, inner to outer
    pub fn all() -> impl Iterator<Item = LayerSlot> {
        (0..Self::COUNT).map(|i| LayerSlot(i as u8))
    }

    /// Slot whose radius is closest to `distance` (ties go inward)
    pub fn nearest(distance: f32) -> Self {
        Self::all()
            .min_by(|a, b| {
                (a.radius() - distance)
                    .abs()
                    .total_cmp(&(b.radius() - distance).abs())
            })
            .unwrap_or(Self::INNERMOST)
    }
}

/// A tile resting on the sphere (sphere-local transform)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedTile {
    pub id: TileId,
    pub kind: PolygonKind,
    /// Packed 0xRRGGBB
    pub color: u32,
    pub position: Vec3,
    pub orientation: Quat,
    pub support: Support,
    /// Mesh face at the bottom of this tile's stack
    pub column: Option<FaceId>,
    pub layer: LayerSlot,
}

impl PlacedTile {
    /// Placement normal: the tile's local +Y
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    pub fn template(&self) -> &'static PolygonTemplate {
        self.kind.template()
    }
}

/// Score for clearing layers with the given tile counts in one evaluation
pub fn clear_score(counts: &[usize]) -> u64 {
    let tiles: u64 = counts.iter().map(|&c| c as u64 * POINTS_PER_CLEARED_TILE).sum();
    let bonus = if counts.len() > 1 {
        MULTI_LAYER_BONUS * counts.len() as u64
    } else {
        0
    };
    tiles + bonus
}

/// Layer membership, tile storage and face occupancy
#[derive(Debug, Clone)]
pub struct LayerRegistry {
    tiles: BTreeMap<TileId, PlacedTile>,
    /// Empty buckets are placeholders keeping the sequence contiguous
    layers: BTreeMap<LayerSlot, BTreeSet<TileId>>,
    /// Tiles resting directly on the mesh
    occupancy: HashMap<FaceId, TileId>,
    next_id: u32,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self {
            tiles: BTreeMap::new(),
            layers: BTreeMap::new(),
            occupancy: HashMap::new(),
            next_id: 1,
        }
    }

    /// Forget every tile (new game)
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Pick the layer for a tile at `distance` from the center.
    ///
    /// Nearest canonical radius, unless an empty slot squeezed between two
    /// populated ones lies within `SANDWICH_THRESHOLD`: that gap is filled
    /// first so the populated sequence stays contiguous.
    pub fn assign_layer(&self, distance: f32) -> LayerSlot {
        let gap = LayerSlot::all()
            .filter(|&slot| {
                !self.is_populated(slot)
                    && slot.inward().is_some_and(|s| self.is_populated(s))
                    && slot.outward().is_some_and(|s| self.is_populated(s))
                    && (slot.radius() - distance).abs() <= SANDWICH_THRESHOLD
            })
            .min_by(|a, b| {
                (a.radius() - distance)
                    .abs()
                    .total_cmp(&(b.radius() - distance).abs())
            });
        gap.unwrap_or_else(|| LayerSlot::nearest(distance))
    }

    /// Register a new tile and return its id
    pub fn record_placement(
        &mut self,
        kind: PolygonKind,
        color: u32,
        landing: Landing,
        layer: LayerSlot,
    ) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        self.insert(PlacedTile {
            id,
            kind,
            color,
            position: landing.position,
            orientation: landing.orientation,
            support: landing.support,
            column: landing.column,
            layer,
        });
        id
    }

    /// Put back a tile that was detached (or replace one already present)
    pub fn reinsert(&mut self, tile: PlacedTile) {
        self.remove(tile.id);
        self.next_id = self.next_id.max(tile.id.0 + 1);
        self.insert(tile);
    }

    fn insert(&mut self, tile: PlacedTile) {
        if let Support::Face(face) = tile.support {
            if let Some(previous) = self.occupancy.insert(face, tile.id) {
                log::warn!("Face {:?} held {:?}, now claimed by {:?}", face, previous, tile.id);
            }
        }
        self.layers.entry(tile.layer).or_default().insert(tile.id);
        self.tiles.insert(tile.id, tile);
    }

    /// Remove one tile; its bucket goes too if it empties
    pub fn remove(&mut self, id: TileId) -> Option<PlacedTile> {
        let tile = self.tiles.remove(&id)?;
        if let Some(bucket) = self.layers.get_mut(&tile.layer) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.layers.remove(&tile.layer);
            }
        }
        self.release_face(&tile);
        Some(tile)
    }

    fn release_face(&mut self, tile: &PlacedTile) {
        if let Support::Face(face) = tile.support {
            if self.occupancy.get(&face) == Some(&tile.id) {
                self.occupancy.remove(&face);
            }
        }
    }

    /// Layers holding more than `LAYER_COMPLETE_ABOVE` tiles, outer to inner
    pub fn check_completions(&self) -> Vec<LayerSlot> {
        self.layers
            .iter()
            .rev()
            .filter(|(_, ids)| ids.len() > LAYER_COMPLETE_ABOVE)
            .map(|(&slot, _)| slot)
            .collect()
    }

    /// Remove a whole layer: tiles, occupancy entries and the bucket
    pub fn clear(&mut self, layer: LayerSlot) -> Vec<PlacedTile> {
        let ids = self.layers.remove(&layer).unwrap_or_default();
        let removed: Vec<PlacedTile> = ids.iter().filter_map(|id| self.tiles.remove(id)).collect();
        for tile in &removed {
            self.release_face(tile);
        }
        log::debug!("Cleared layer {:.1} ({} tiles)", layer.radius(), removed.len());
        removed
    }

    /// Take every layer strictly outside `layer` out of the registry,
    /// inner to outer
    pub fn detach_outside(&mut self, layer: LayerSlot) -> Vec<(LayerSlot, Vec<PlacedTile>)> {
        let outer: Vec<LayerSlot> = self
            .layers
            .range((Bound::Excluded(layer), Bound::Unbounded))
            .map(|(&slot, _)| slot)
            .collect();

        outer
            .into_iter()
            .filter_map(|slot| {
                let ids = self.layers.remove(&slot)?;
                let tiles: Vec<PlacedTile> = ids.iter().filter_map(|id| self.tiles.remove(id)).collect();
                for tile in &tiles {
                    self.release_face(tile);
                }
                (!tiles.is_empty()).then_some((slot, tiles))
            })
            .collect()
    }

    /// Drop stray empty buckets, then backfill placeholders for every
    /// missing slot between the innermost and outermost populated layers
    pub fn normalize_sequence(&mut self) {
        self.layers.retain(|_, ids| !ids.is_empty());
        let (Some(&low), Some(&high)) = (self.layers.keys().next(), self.layers.keys().next_back()) else {
            return;
        };
        for slot in LayerSlot::all().filter(|s| *s > low && *s < high) {
            self.layers.entry(slot).or_default();
        }
    }

    pub fn is_populated(&self, layer: LayerSlot) -> bool {
        self.count(layer) > 0
    }

    pub fn count(&self, layer: LayerSlot) -> usize {
        self.layers.get(&layer).map_or(0, BTreeSet::len)
    }

    /// Tile count of every bucket (placeholders included), inner to outer
    pub fn layer_counts(&self) -> Vec<(LayerSlot, usize)> {
        self.layers.iter().map(|(&slot, ids)| (slot, ids.len())).collect()
    }

    /// Slots that currently have a bucket, inner to outer
    pub fn bucket_slots(&self) -> Vec<LayerSlot> {
        self.layers.keys().copied().collect()
    }

    pub fn tile(&self, id: TileId) -> Option<&PlacedTile> {
        self.tiles.get(&id)
    }

    /// All tiles in id order
    pub fn tiles(&self) -> impl Iterator<Item = &PlacedTile> {
        self.tiles.values()
    }

    /// Tiles of one layer in id order
    pub fn tiles_in(&self, layer: LayerSlot) -> impl Iterator<Item = &PlacedTile> {
        self.layers
            .get(&layer)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tiles.get(id))
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tile resting directly on a face
    pub fn occupant(&self, face: FaceId) -> Option<&PlacedTile> {
        self.occupancy.get(&face).and_then(|id| self.tiles.get(id))
    }

    pub fn occupied_faces(&self) -> usize {
        self.occupancy.len()
    }

    /// Outermost tile of the stack standing on a face
    pub fn column_top(&self, face: FaceId) -> Option<&PlacedTile> {
        self.tiles
            .values()
            .filter(|t| t.column == Some(face))
            .max_by(|a, b| a.position.length_squared().total_cmp(&b.position.length_squared()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn free_landing(distance: f32) -> Landing {
        Landing {
            position: Vec3::Y * distance,
            orientation: Quat::IDENTITY,
            support: Support::Free,
            column: None,
        }
    }

    fn face_landing(face: u32, distance: f32) -> Landing {
        Landing {
            support: Support::Face(FaceId(face)),
            column: Some(FaceId(face)),
            ..free_landing(distance)
        }
    }

    fn fill(registry: &mut LayerRegistry, layer: LayerSlot, count: usize) {
        for _ in 0..count {
            registry.record_placement(PolygonKind::Hexagon, 0, free_landing(layer.radius()), layer);
        }
    }

    fn slot(index: usize) -> LayerSlot {
        LayerSlot::new(index).unwrap()
    }

    #[test]
    fn test_slot_sequence() {
        assert_eq!(LayerSlot::COUNT, 10);
        assert_eq!(LayerSlot::INNERMOST.radius(), 3.3);
        assert_eq!(LayerSlot::OUTERMOST.radius(), 4.2);
        assert_eq!(LayerSlot::INNERMOST.inward(), None);
        assert_eq!(LayerSlot::OUTERMOST.outward(), None);
        assert_eq!(slot(4).inward(), Some(slot(3)));
        assert!(LayerSlot::new(10).is_none());
    }

    #[test]
    fn test_assign_nearest() {
        let registry = LayerRegistry::new();
        assert_eq!(registry.assign_layer(3.26), slot(0));
        assert_eq!(registry.assign_layer(3.34), slot(0));
        assert_eq!(registry.assign_layer(3.36), slot(1));
        assert_eq!(registry.assign_layer(1.0), slot(0));
        assert_eq!(registry.assign_layer(9.0), LayerSlot::OUTERMOST);
    }

    #[test]
    fn test_assign_prefers_sandwiched_gap() {
        let mut registry = LayerRegistry::new();
        fill(&mut registry, slot(0), 1);
        fill(&mut registry, slot(2), 1);
        // 3.52 is nearest to 3.5, but 3.4 is an empty slot between populated ones
        assert_eq!(registry.assign_layer(3.52), slot(1));
        // Too far from the gap: plain nearest
        assert_eq!(registry.assign_layer(3.98), slot(7));
    }

    #[test]
    fn test_gap_at_sequence_edge_is_not_sandwiched() {
        let mut registry = LayerRegistry::new();
        fill(&mut registry, slot(1), 1);
        // Slot 0 is empty but only has a neighbour on one side
        assert_eq!(registry.assign_layer(3.42), slot(1));
    }

    #[test]
    fn test_placeholder_does_not_count_as_populated() {
        let mut registry = LayerRegistry::new();
        fill(&mut registry, slot(0), 1);
        fill(&mut registry, slot(3), 1);
        registry.normalize_sequence();
        assert_eq!(registry.bucket_slots(), vec![slot(0), slot(1), slot(2), slot(3)]);
        // Gaps of two slots are not sandwiched
        assert_eq!(registry.assign_layer(3.52), slot(2));
    }

    #[test]
    fn test_completion_threshold() {
        let mut registry = LayerRegistry::new();
        fill(&mut registry, slot(0), 31);
        assert!(registry.check_completions().is_empty());
        fill(&mut registry, slot(0), 1);
        assert_eq!(registry.check_completions(), vec![slot(0)]);
    }

    #[test]
    fn test_completions_are_outer_first() {
        let mut registry = LayerRegistry::new();
        fill(&mut registry, slot(0), 32);
        fill(&mut registry, slot(1), 32);
        fill(&mut registry, slot(2), 5);
        assert_eq!(registry.check_completions(), vec![slot(1), slot(0)]);
    }

    #[test]
    fn test_record_tracks_occupancy() {
        let mut registry = LayerRegistry::new();
        let id = registry.record_placement(PolygonKind::Pentagon, 7, face_landing(3, 3.3), slot(0));
        assert_eq!(registry.occupied_faces(), 1);
        assert_eq!(registry.occupant(FaceId(3)).map(|t| t.id), Some(id));
        assert_eq!(registry.column_top(FaceId(3)).map(|t| t.id), Some(id));

        let stacked = Landing {
            support: Support::Tile(id),
            ..face_landing(3, 3.4)
        };
        let top = registry.record_placement(PolygonKind::Pentagon, 7, stacked, slot(1));
        assert_eq!(registry.occupied_faces(), 1);
        assert_eq!(registry.column_top(FaceId(3)).map(|t| t.id), Some(top));
    }

    #[test]
    fn test_clear_removes_tiles_occupancy_and_bucket() {
        let mut registry = LayerRegistry::new();
        for face in 0..4 {
            registry.record_placement(PolygonKind::Hexagon, 0, face_landing(face, 3.3), slot(0));
        }
        fill(&mut registry, slot(1), 2);

        let removed = registry.clear(slot(0));
        assert_eq!(removed.len(), 4);
        assert_eq!(registry.occupied_faces(), 0);
        assert_eq!(registry.bucket_slots(), vec![slot(1)]);
        assert_eq!(registry.len(), 2);
        assert!(registry.clear(slot(5)).is_empty());
    }

    #[test]
    fn test_detach_outside_is_inner_to_outer() {
        let mut registry = LayerRegistry::new();
        fill(&mut registry, slot(0), 1);
        fill(&mut registry, slot(1), 2);
        fill(&mut registry, slot(3), 3);
        registry.normalize_sequence();

        let detached = registry.detach_outside(slot(0));
        let shape: Vec<(LayerSlot, usize)> = detached.iter().map(|(s, t)| (*s, t.len())).collect();
        assert_eq!(shape, vec![(slot(1), 2), (slot(3), 3)]);
        assert_eq!(registry.bucket_slots(), vec![slot(0)]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reinsert_moves_between_buckets() {
        let mut registry = LayerRegistry::new();
        let id = registry.record_placement(PolygonKind::Hexagon, 0, face_landing(1, 3.4), slot(1));
        let mut tile = registry.tile(id).cloned().unwrap();
        tile.layer = slot(0);
        registry.reinsert(tile);
        assert_eq!(registry.count(slot(0)), 1);
        assert_eq!(registry.count(slot(1)), 0);
        assert_eq!(registry.bucket_slots(), vec![slot(0)]);
        assert_eq!(registry.occupant(FaceId(1)).map(|t| t.id), Some(id));

        // New ids never collide with reinserted ones
        let next = registry.record_placement(PolygonKind::Hexagon, 0, free_landing(3.3), slot(0));
        assert!(next > id);
    }

    #[test]
    fn test_remove_single_tile() {
        let mut registry = LayerRegistry::new();
        let id = registry.record_placement(PolygonKind::Hexagon, 0, face_landing(2, 3.3), slot(0));
        assert!(registry.remove(id).is_some());
        assert!(registry.is_empty());
        assert_eq!(registry.occupied_faces(), 0);
        assert!(registry.bucket_slots().is_empty());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn test_reset() {
        let mut registry = LayerRegistry::new();
        fill(&mut registry, slot(0), 3);
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.layer_counts().is_empty());
    }

    #[test]
    fn test_clear_score() {
        assert_eq!(clear_score(&[32]), 800);
        assert_eq!(clear_score(&[32, 32]), 1800);
        assert_eq!(clear_score(&[32, 32, 33]), 32 * 25 * 2 + 33 * 25 + 300);
        assert_eq!(clear_score(&[]), 0);
    }

    proptest! {
        #[test]
        fn prop_assign_is_deterministic(distance in 2.0f32..5.0, populated in proptest::collection::vec(0usize..10, 0..6)) {
            let mut registry = LayerRegistry::new();
            for index in populated {
                fill(&mut registry, slot(index), 1);
            }
            let first = registry.assign_layer(distance);
            prop_assert_eq!(first, registry.assign_layer(distance));
            prop_assert_eq!(registry.clone().assign_layer(distance), first);
        }

        #[test]
        fn prop_empty_registry_picks_nearest(distance in 3.3f32..4.2) {
            let registry = LayerRegistry::new();
            let layer = registry.assign_layer(distance);
            prop_assert!((layer.radius() - distance).abs() <= 0.05 + 1e-5);
        }

        #[test]
        fn prop_completion_predicate(count in 0usize..40) {
            let mut registry = LayerRegistry::new();
            fill(&mut registry, slot(2), count);
            prop_assert_eq!(!registry.check_completions().is_empty(), count > 31);
        }

        #[test]
        fn prop_every_tile_in_one_bucket(ops in proptest::collection::vec((0usize..10, 0u32..32), 1..60)) {
            let mut registry = LayerRegistry::new();
            for (index, face) in ops {
                let layer = slot(index);
                registry.record_placement(PolygonKind::Hexagon, 0, face_landing(face, layer.radius()), layer);
            }
            let bucketed: usize = registry.layer_counts().iter().map(|(_, n)| n).sum();
            prop_assert_eq!(bucketed, registry.len());
            for tile in registry.tiles() {
                prop_assert!(registry.tiles_in(tile.layer).any(|t| t.id == tile.id));
            }
            prop_assert!(registry.occupied_faces() <= 32);
        }
    }
}
