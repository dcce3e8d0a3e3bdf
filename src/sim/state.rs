//! Game state and core session types
//!
//! One `GameState` owns everything a run needs: the surface, the sphere
//! frame, the layer registry, the clear pipeline and the falling tile.
//! Nothing lives in module-level state.

use glam::{Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::layers::{LayerRegistry, LayerSlot, PlacedTile, TileId, clear_score};
use super::pipeline::ClearPipeline;
use super::placement::{Landing, resolve_landing};
use super::polygon::PolygonKind;
use super::raycast::{RayHit, SphereFrame, Surface};
use crate::consts::MISMATCH_PENALTY;
use crate::error::PlacementError;
use crate::settings::Settings;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// A new tile appears on the next tick
    Spawning,
    /// The tile is dropping toward the sphere
    Falling,
    /// Tile settled; completions are checked once the countdown ends
    Landing { ticks_left: u32 },
    /// Tile was thrown away; respawn on the next tick
    Rejected,
    /// Clear pipeline running
    Clearing,
    /// Game is paused
    Paused,
    /// Run ended
    GameOver,
}

/// Tile colors (0xRRGGBB)
pub const PALETTE: [u32; 6] = [0xE4572E, 0x29335C, 0xF3A712, 0x669BBC, 0xA8C686, 0xB56576];

/// A tile waiting to spawn (or previewed as next)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PolygonKind,
    pub color: u32,
}

/// The single tile currently in the air (world space)
#[derive(Debug, Clone, PartialEq)]
pub struct FallingTile {
    pub kind: PolygonKind,
    pub color: u32,
    pub position: Vec3,
    pub orientation: Quat,
}

/// Where the falling tile would land (world space, presentation only)
#[derive(Debug, Clone, PartialEq)]
pub struct GhostTile {
    pub kind: PolygonKind,
    pub color: u32,
    pub position: Vec3,
    pub orientation: Quat,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    ScoreChanged { score: u64 },
    LevelChanged { level: u32 },
    /// (layer radius, tile count) for every bucket, inner to outer
    LayerCounts(Vec<(f32, usize)>),
    PieceSpawned { current: Piece, next: Piece },
    TileLanded { id: TileId, layer: f32 },
    ShapeMismatch { tile: PolygonKind, target: Option<PolygonKind> },
    /// Falling tile dropped without penalty
    TileDiscarded { reason: PlacementError },
    LayersCompleted { layers: Vec<f32>, points: u64 },
    LayerCleared { layer: f32, tiles: usize },
    /// Tiles that could only be placed radially during a collapse
    DegradedPlacement { tiles: Vec<TileId> },
    GameOver { score: u64 },
}

/// Complete session state
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    rng: Pcg32,
    pub settings: Settings,
    pub surface: Surface,
    pub frame: SphereFrame,
    pub registry: LayerRegistry,
    pub pipeline: ClearPipeline,
    pub phase: GamePhase,
    /// Phase to return to when unpausing
    pub resume_phase: GamePhase,
    pub score: u64,
    /// Never decreases during a run
    pub level: u32,
    pub falling: Option<FallingTile>,
    pub ghost: Option<GhostTile>,
    /// Preview of the next piece
    pub next: Piece,
    /// Simulation tick counter
    pub time_ticks: u64,
    events: Vec<GameEvent>,
}

impl GameState {
    /// Create a new session on the default truncated icosahedron
    pub fn new(seed: u64, settings: Settings) -> Self {
        Self::with_surface(seed, settings, Surface::truncated_icosahedron())
    }

    /// Create a new session on a supplied surface
    pub fn with_surface(seed: u64, settings: Settings, surface: Surface) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let next = draw_piece(&mut rng);
        let pipeline = ClearPipeline::new(settings.clear_fade_ticks(), settings.inter_clear_delay_ticks());
        Self {
            seed,
            rng,
            settings,
            surface,
            frame: SphereFrame::default(),
            registry: LayerRegistry::new(),
            pipeline,
            phase: GamePhase::Spawning,
            resume_phase: GamePhase::Spawning,
            score: 0,
            level: 1,
            falling: None,
            ghost: None,
            next,
            time_ticks: 0,
            events: Vec::new(),
        }
    }

    /// Start over with a new seed, keeping surface and settings
    pub fn reset(&mut self, seed: u64) {
        self.seed = seed;
        self.rng = Pcg32::seed_from_u64(seed);
        self.next = draw_piece(&mut self.rng);
        self.frame = SphereFrame::default();
        self.registry.reset();
        self.pipeline.reset();
        self.phase = GamePhase::Spawning;
        self.resume_phase = GamePhase::Spawning;
        self.score = 0;
        self.level = 1;
        self.falling = None;
        self.ghost = None;
        self.time_ticks = 0;
        self.events.clear();
        log::info!("Session reset with seed {}", seed);
    }

    /// Take the queued presentation events
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Current fall speed (world units per second)
    pub fn fall_speed(&self) -> f32 {
        self.settings.fall_speed(self.level)
    }

    /// Turn the next piece into the falling tile and draw a new preview
    pub fn spawn(&mut self) {
        let current = self.next;
        self.next = draw_piece(&mut self.rng);
        self.falling = Some(FallingTile {
            kind: current.kind,
            color: current.color,
            position: Vec3::Y * self.settings.spawn_height,
            orientation: Quat::IDENTITY,
        });
        self.ghost = None;
        self.phase = GamePhase::Falling;
        self.emit(GameEvent::PieceSpawned {
            current,
            next: self.next,
        });
    }

    /// Resolve a hit and record the tile in its layer
    pub fn place_tile(&mut self, kind: PolygonKind, color: u32, hit: &RayHit) -> Result<TileId, PlacementError> {
        let landing = resolve_landing(kind, hit, &self.surface, &self.registry)?;
        Ok(self.record_landing(kind, color, landing))
    }

    /// Record an already resolved landing
    pub fn record_landing(&mut self, kind: PolygonKind, color: u32, landing: Landing) -> TileId {
        let layer = self.registry.assign_layer(landing.position.length());
        let id = self.registry.record_placement(kind, color, landing, layer);
        log::debug!("Tile {:?} ({:?}) landed in layer {:.1}", id, kind, layer.radius());
        self.emit(GameEvent::TileLanded {
            id,
            layer: layer.radius(),
        });
        self.emit_layer_counts();
        id
    }

    /// A settled tile ends the run when it sits in the outermost layer and
    /// is currently above the height limit. Layer alone is not enough: the
    /// sphere can be turned.
    pub fn reaches_game_over(&self, tile: &PlacedTile) -> bool {
        tile.layer.is_outermost()
            && self.frame.local_to_world(tile.position).y > self.settings.game_over_height
    }

    pub fn enter_game_over(&mut self) {
        self.falling = None;
        self.ghost = None;
        self.phase = GamePhase::GameOver;
        log::info!("Game over with score {}", self.score);
        self.emit(GameEvent::GameOver { score: self.score });
    }

    /// Charge for a mismatched tile (floored at zero)
    pub fn apply_penalty(&mut self) {
        self.score = self.score.saturating_sub(MISMATCH_PENALTY);
        self.emit(GameEvent::ScoreChanged { score: self.score });
    }

    pub fn add_score(&mut self, points: u64) {
        self.score += points;
        self.emit(GameEvent::ScoreChanged { score: self.score });
        let level = Settings::level_for_score(self.score).max(self.level);
        if level != self.level {
            self.level = level;
            log::info!("Level {} (fall speed {:.2})", level, self.fall_speed());
            self.emit(GameEvent::LevelChanged { level });
        }
    }

    /// Score completed layers and hand them to the clear pipeline.
    ///
    /// Returns true when a clear was started.
    pub fn evaluate_completions(&mut self) -> bool {
        if self.pipeline.is_busy() {
            return false;
        }
        let layers = self.registry.check_completions();
        if layers.is_empty() {
            return false;
        }

        let counts: Vec<usize> = layers.iter().map(|&l| self.registry.count(l)).collect();
        let points = clear_score(&counts);
        log::info!("{} layer(s) complete: +{} points", layers.len(), points);

        let Some(events) = self.pipeline.start(&layers, &mut self.registry) else {
            return false;
        };
        self.add_score(points);
        self.emit(GameEvent::LayersCompleted {
            layers: layers.iter().map(|l| l.radius()).collect(),
            points,
        });
        self.forward_pipeline_events(events);
        true
    }

    pub(crate) fn forward_pipeline_events(&mut self, events: Vec<super::pipeline::PipelineEvent>) {
        use super::pipeline::PipelineEvent;
        for event in events {
            match event {
                PipelineEvent::LayerRemoved { layer, tiles } => {
                    self.emit(GameEvent::LayerCleared {
                        layer: layer.radius(),
                        tiles,
                    });
                    self.emit_layer_counts();
                }
                PipelineEvent::Collapsed { report, .. } => {
                    if !report.degraded.is_empty() {
                        self.emit(GameEvent::DegradedPlacement {
                            tiles: report.degraded,
                        });
                    }
                    self.emit_layer_counts();
                }
                PipelineEvent::Finished => {}
            }
        }
    }

    fn emit_layer_counts(&mut self) {
        let counts = self
            .registry
            .layer_counts()
            .into_iter()
            .map(|(slot, n)| (slot.radius(), n))
            .collect();
        self.emit(GameEvent::LayerCounts(counts));
    }

    /// Tiles in one layer (by canonical slot)
    pub fn layer_count(&self, layer: LayerSlot) -> usize {
        self.registry.count(layer)
    }
}

/// Draw a random piece; shapes follow the 12:20 face ratio of the sphere
fn draw_piece(rng: &mut Pcg32) -> Piece {
    let kind = if rng.random_range(0..32) < 12 {
        PolygonKind::Pentagon
    } else {
        PolygonKind::Hexagon
    };
    let color = PALETTE[rng.random_range(0..PALETTE.len())];
    Piece { kind, color }
}
