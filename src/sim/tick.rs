//! Fixed timestep simulation tick
//!
//! Core game loop that advances a session deterministically.

use glam::Vec2;

use super::placement::resolve_landing;
use super::raycast::cast_ray;
use super::state::{FallingTile, GameEvent, GamePhase, GameState, GhostTile};
use crate::error::PlacementError;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Sphere turn request: x is yaw, y is pitch, each in [-1, 1]
    pub turn: Vec2,
    /// Drop faster while held
    pub fast_drop: bool,
    /// Pause toggle
    pub pause: bool,
    /// Demo mode - the sphere steers itself
    pub autopilot: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.pause {
        match state.phase {
            GamePhase::Paused => state.phase = state.resume_phase,
            GamePhase::GameOver => {}
            phase => {
                state.resume_phase = phase;
                state.phase = GamePhase::Paused;
                return;
            }
        }
    }

    if matches!(state.phase, GamePhase::Paused | GamePhase::GameOver) {
        return;
    }

    state.time_ticks += 1;

    let mut input = input.clone();
    if input.autopilot {
        steer(state, &mut input);
    }

    // The sphere turns in every live phase; falling tiles stay put in world space
    let turn = input.turn.clamp(Vec2::splat(-1.0), Vec2::splat(1.0)) * state.settings.sphere_turn_speed * dt;
    if turn != Vec2::ZERO {
        state.frame.turn(turn.x, turn.y);
    }

    match state.phase {
        GamePhase::Spawning | GamePhase::Rejected => {
            if state.pipeline.is_busy() {
                state.phase = GamePhase::Clearing;
            } else {
                state.spawn();
            }
        }
        GamePhase::Falling => step_falling(state, &input, dt),
        GamePhase::Landing { ticks_left } => {
            let ticks_left = ticks_left.saturating_sub(1);
            if ticks_left > 0 {
                state.phase = GamePhase::Landing { ticks_left };
            } else if state.evaluate_completions() {
                state.phase = GamePhase::Clearing;
            } else {
                state.phase = GamePhase::Spawning;
            }
        }
        GamePhase::Clearing => {
            let events = state.pipeline.advance(&mut state.registry, &state.surface);
            state.forward_pipeline_events(events);
            // Collapsed tiles may complete another layer
            if !state.pipeline.is_busy() && !state.evaluate_completions() {
                state.phase = GamePhase::Spawning;
            }
        }
        GamePhase::Paused | GamePhase::GameOver => {}
    }
}

/// Autopilot: keep the sphere turning slowly, and quicken while a valid
/// landing is lined up
fn steer(state: &GameState, input: &mut TickInput) {
    if state.phase != GamePhase::Falling {
        return;
    }
    match state.ghost {
        Some(_) => {
            input.turn = Vec2::new(0.15, 0.05);
            input.fast_drop = true;
        }
        None => {
            input.turn = Vec2::new(1.0, 0.35);
            input.fast_drop = false;
        }
    }
}

fn step_falling(state: &mut GameState, input: &TickInput, dt: f32) {
    let Some(falling) = state.falling.clone() else {
        state.phase = GamePhase::Spawning;
        return;
    };

    let mut speed = state.fall_speed();
    if input.fast_drop {
        speed *= state.settings.fast_drop_multiplier;
    }
    let step = speed * dt;

    let local = state.frame.world_to_local(falling.position);
    let hit = cast_ray(&state.surface, state.registry.tiles(), local, -local)
        .into_iter()
        .next();

    let Some(hit) = hit else {
        state.ghost = None;
        fall(state, falling, step);
        return;
    };

    let half_depth = falling.kind.template().depth / 2.0;
    if hit.distance - half_depth > step {
        state.ghost = resolve_landing(falling.kind, &hit, &state.surface, &state.registry)
            .ok()
            .map(|landing| GhostTile {
                kind: falling.kind,
                color: falling.color,
                position: state.frame.local_to_world(landing.position),
                orientation: state.frame.orientation_to_world(landing.orientation),
            });
        fall(state, falling, step);
        return;
    }

    // Contact
    state.falling = None;
    state.ghost = None;
    match state.place_tile(falling.kind, falling.color, &hit) {
        Ok(id) => {
            let over = state
                .registry
                .tile(id)
                .is_some_and(|tile| state.reaches_game_over(tile));
            if over {
                state.enter_game_over();
            } else {
                state.phase = GamePhase::Landing {
                    ticks_left: state.settings.completion_check_delay_ticks,
                };
            }
        }
        Err(err) => {
            log::debug!("Tile rejected: {}", err);
            if let PlacementError::ShapeMismatch { tile, target } = err {
                state.emit(GameEvent::ShapeMismatch { tile, target });
                state.apply_penalty();
            } else {
                state.emit(GameEvent::TileDiscarded { reason: err });
            }
            state.phase = GamePhase::Rejected;
        }
    }
}

/// Move toward the sphere center; a tile that passes it without a hit is lost
fn fall(state: &mut GameState, mut falling: FallingTile, step: f32) {
    let distance = falling.position.length();
    if distance <= step {
        log::warn!("Falling tile reached the center without landing");
        state.falling = None;
        state.ghost = None;
        state.emit(GameEvent::TileDiscarded {
            reason: PlacementError::NoLandingTarget,
        });
        state.phase = GamePhase::Rejected;
        return;
    }
    falling.position *= (distance - step) / distance;
    state.falling = Some(falling);
}
