//! Layer clear sequencing
//!
//! Completed layers are cleared one at a time, outer to inner:
//!
//! ```text
//! Idle -> Fading{layer} -> (collapse) -> Cooldown -> Fading{next} ... -> Idle
//! ```
//!
//! A layer's tiles leave the registry as soon as it enters `Fading`; they
//! are kept here only so the presentation can flash and shrink them. The
//! collapse of the outer layers runs when the fade ends. While the pipeline
//! is busy nobody else may check completions or spawn.

use std::collections::VecDeque;

use super::collapse::{CollapseReport, collapse_outer_layers};
use super::layers::{LayerRegistry, LayerSlot, PlacedTile};
use super::raycast::Surface;

/// Current step of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClearStage {
    Idle,
    /// Removed tiles are animating out
    Fading { layer: LayerSlot, ticks_left: u32 },
    /// Fixed pause before the next queued clear
    Cooldown { ticks_left: u32 },
}

/// Progress notifications
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    /// A layer left the registry
    LayerRemoved { layer: LayerSlot, tiles: usize },
    /// Outer layers were re-landed after a clear
    Collapsed { layer: LayerSlot, report: CollapseReport },
    /// Queue drained, pipeline idle again
    Finished,
}

#[derive(Debug, Clone)]
pub struct ClearPipeline {
    stage: ClearStage,
    queue: VecDeque<LayerSlot>,
    fading: Vec<PlacedTile>,
    fade_ticks: u32,
    cooldown_ticks: u32,
}

impl ClearPipeline {
    pub fn new(fade_ticks: u32, cooldown_ticks: u32) -> Self {
        Self {
            stage: ClearStage::Idle,
            queue: VecDeque::new(),
            fading: Vec::new(),
            fade_ticks,
            cooldown_ticks,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.stage != ClearStage::Idle || !self.queue.is_empty()
    }

    /// Tiles of the layer currently fading out
    pub fn fading_tiles(&self) -> &[PlacedTile] {
        &self.fading
    }

    /// Fade progress of the current layer, 0 (just removed) to 1 (gone)
    pub fn fade_progress(&self) -> f32 {
        match self.stage {
            ClearStage::Fading { ticks_left, .. } if self.fade_ticks > 0 => {
                1.0 - ticks_left as f32 / self.fade_ticks as f32
            }
            ClearStage::Fading { .. } => 1.0,
            _ => 0.0,
        }
    }

    /// Queue completed layers and remove the first one right away.
    ///
    /// Refuses (returns `None`) while a previous clear is still running.
    pub fn start(
        &mut self,
        layers: &[LayerSlot],
        registry: &mut LayerRegistry,
    ) -> Option<Vec<PipelineEvent>> {
        if self.is_busy() {
            log::warn!("Clear requested while another is running; ignored");
            return None;
        }
        let mut queued = layers.to_vec();
        queued.sort_unstable_by(|a, b| b.cmp(a));
        queued.dedup();
        self.queue = queued.into();

        let mut events = Vec::new();
        self.begin_next(registry, &mut events);
        Some(events)
    }

    /// Advance one tick
    pub fn advance(&mut self, registry: &mut LayerRegistry, surface: &Surface) -> Vec<PipelineEvent> {
        let mut events = Vec::new();
        match self.stage {
            ClearStage::Idle => {}
            ClearStage::Fading { layer, ticks_left } => {
                let ticks_left = ticks_left.saturating_sub(1);
                if ticks_left > 0 {
                    self.stage = ClearStage::Fading { layer, ticks_left };
                } else {
                    self.fading.clear();
                    let report = collapse_outer_layers(layer, registry, surface);
                    events.push(PipelineEvent::Collapsed { layer, report });
                    if self.queue.is_empty() {
                        self.stage = ClearStage::Idle;
                        events.push(PipelineEvent::Finished);
                    } else {
                        self.stage = ClearStage::Cooldown {
                            ticks_left: self.cooldown_ticks,
                        };
                    }
                }
            }
            ClearStage::Cooldown { ticks_left } => {
                let ticks_left = ticks_left.saturating_sub(1);
                if ticks_left > 0 {
                    self.stage = ClearStage::Cooldown { ticks_left };
                } else {
                    self.begin_next(registry, &mut events);
                }
            }
        }
        events
    }

    fn begin_next(&mut self, registry: &mut LayerRegistry, events: &mut Vec<PipelineEvent>) {
        match self.queue.pop_front() {
            Some(layer) => {
                self.fading = registry.clear(layer);
                log::info!("Clearing layer {:.1} ({} tiles)", layer.radius(), self.fading.len());
                events.push(PipelineEvent::LayerRemoved {
                    layer,
                    tiles: self.fading.len(),
                });
                self.stage = ClearStage::Fading {
                    layer,
                    ticks_left: self.fade_ticks,
                };
            }
            None => {
                self.stage = ClearStage::Idle;
                events.push(PipelineEvent::Finished);
            }
        }
    }

    /// Drop everything in flight (new game)
    pub fn reset(&mut self) {
        self.stage = ClearStage::Idle;
        self.queue.clear();
        self.fading.clear();
    }
}
