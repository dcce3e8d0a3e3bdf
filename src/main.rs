//! Polysphere entry point
//!
//! Runs a headless autopilot session and logs what happens. Usage:
//!
//! ```text
//! polysphere [settings.json] [seed] [seconds]
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use polysphere::Settings;
    use polysphere::consts::SIM_DT;
    use polysphere::sim::{GameEvent, GamePhase, GameState, TickInput, tick};

    env_logger::init();
    log::info!("Polysphere (headless) starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => Settings::load_or_default(path),
        None => Settings::default(),
    };
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42u64);
    let seconds = args.next().and_then(|s| s.parse().ok()).unwrap_or(120.0f32);

    let mut state = GameState::new(seed, settings);
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };
    let ticks = (seconds / SIM_DT) as u64;

    for _ in 0..ticks {
        tick(&mut state, &input, SIM_DT);
        for event in state.drain_events() {
            match event {
                GameEvent::LayersCompleted { layers, points } => {
                    log::info!("Completed {:?} for {} points", layers, points)
                }
                GameEvent::LevelChanged { level } => log::info!("Level {}", level),
                GameEvent::ShapeMismatch { tile, target } => {
                    log::info!("{:?} tile bounced off {:?}", tile, target)
                }
                GameEvent::DegradedPlacement { tiles } => {
                    log::warn!("{} tile(s) placed radially", tiles.len())
                }
                GameEvent::LayerCounts(_) | GameEvent::ScoreChanged { .. } => {}
                other => log::debug!("{:?}", other),
            }
        }
        if state.phase == GamePhase::GameOver {
            break;
        }
    }

    println!(
        "seed {}: score {} level {} tiles {} after {} ticks{}",
        seed,
        state.score,
        state.level,
        state.registry.len(),
        state.time_ticks,
        if state.phase == GamePhase::GameOver {
            " (game over)"
        } else {
            ""
        }
    );
}

#[cfg(target_arch = "wasm32")]
fn main() {}
