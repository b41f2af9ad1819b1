//! Frame Animations
//!
//! An animation runs in stages. While active, on every tick that is a
//! multiple of its stage duration it enters stage
//! `tick / stage_duration % stage_count`. Each animation paints into its own
//! layer and clears it when it deactivates.

use tracing::debug;

use crate::core::coord::Coord;
use crate::render::layer::{Layer, Rgb};
use crate::render::renderer::{LayerId, Renderer};

/// Staged animation behaviour.
pub trait Animation {
    /// Ticks per stage.
    fn stage_duration(&self) -> u64;

    /// Number of stages in one cycle.
    fn stage_count(&self) -> u64;

    /// Enter `stage`. Return `false` to deactivate.
    fn on_stage(&mut self, stage: u64, layer: &mut Layer) -> bool;

    /// Forget per-run state.
    fn reset(&mut self) {}
}

/// An animation plus its active flag.
#[derive(Debug)]
pub struct Staged<A> {
    animation: A,
    active: bool,
}

impl<A: Animation> Staged<A> {
    /// Wrap an inactive animation.
    pub fn new(animation: A) -> Self {
        Self { animation, active: false }
    }

    /// Start running.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// True while running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Borrow the animation.
    pub fn get(&self) -> &A {
        &self.animation
    }

    /// Mutably borrow the animation.
    pub fn get_mut(&mut self) -> &mut A {
        &mut self.animation
    }

    /// Advance one tick.
    pub fn advance(&mut self, tick: u64, layer: &mut Layer) {
        if !self.active {
            return;
        }
        let duration = self.animation.stage_duration().max(1);
        if tick % duration == 0 {
            let stage = tick / duration % self.animation.stage_count().max(1);
            if !self.animation.on_stage(stage, layer) {
                self.deactivate(layer);
            }
        }
    }

    /// Stop, clear the layer and reset.
    pub fn deactivate(&mut self, layer: &mut Layer) {
        self.active = false;
        layer.clear();
        self.animation.reset();
    }
}

// =============================================================================
// DESTRUCTION BLINK
// =============================================================================

/// Blinks destroyed cells off and on.
#[derive(Clone, Debug)]
pub struct DestructionBlink {
    cells: Vec<Coord>,
    blinks: u32,
    max_blinks: u32,
}

impl DestructionBlink {
    /// Default number of blinks
    pub const DEFAULT_BLINKS: u32 = 12;

    /// Create a blinker that stops after `max_blinks` blinks.
    pub fn new(max_blinks: u32) -> Self {
        Self { cells: Vec::new(), blinks: 0, max_blinks }
    }

    /// Queue a destroyed cell, in field coordinates.
    pub fn add_cell(&mut self, cell: Coord) {
        self.cells.push(cell);
    }

    /// Queued cells.
    pub fn cells(&self) -> &[Coord] {
        &self.cells
    }

    /// Blinks so far.
    pub fn blinks(&self) -> u32 {
        self.blinks
    }
}

impl Animation for DestructionBlink {
    fn stage_duration(&self) -> u64 {
        2
    }

    fn stage_count(&self) -> u64 {
        2
    }

    fn on_stage(&mut self, stage: u64, layer: &mut Layer) -> bool {
        if stage == 1 {
            for cell in &self.cells {
                layer.set(*cell, Some(Rgb::OFF));
            }
            self.blinks += 1;
            self.blinks <= self.max_blinks
        } else {
            layer.clear();
            true
        }
    }

    fn reset(&mut self) {
        self.blinks = 0;
        self.cells.clear();
    }
}

// =============================================================================
// ERROR INDICATOR
// =============================================================================

/// Blinking red X over the whole field. Never deactivates on its own.
#[derive(Clone, Debug)]
pub struct ErrorIndicator {
    period: u64,
    cross: Vec<Coord>,
}

impl ErrorIndicator {
    /// Create an indicator blinking once per `period` ticks per stage.
    pub fn new(width: i32, height: i32, period: u64) -> Self {
        let cross = (0..height)
            .flat_map(|y| (0..width).map(move |x| Coord::new(x, y)))
            .filter(|c| c.x == c.y || c.x + c.y == width - 1)
            .collect();
        Self { period, cross }
    }

    /// Cells of the X.
    pub fn cross(&self) -> &[Coord] {
        &self.cross
    }
}

impl Animation for ErrorIndicator {
    fn stage_duration(&self) -> u64 {
        self.period
    }

    fn stage_count(&self) -> u64 {
        2
    }

    fn on_stage(&mut self, stage: u64, layer: &mut Layer) -> bool {
        if stage == 1 {
            layer.fill(Rgb::OFF);
            for cell in &self.cross {
                layer.set(*cell, Some(Rgb::RED));
            }
        } else {
            layer.clear();
        }
        true
    }
}

// =============================================================================
// ANIMATOR
// =============================================================================

/// The engine's animations, in priority order.
#[derive(Debug)]
pub struct Animator {
    /// Error indicator
    pub error: Staged<ErrorIndicator>,
    /// Destruction blink
    pub blink: Staged<DestructionBlink>,
}

impl Animator {
    /// Create both animations inactive.
    pub fn new(width: i32, height: i32, refresh_rate: u32, max_blinks: u32) -> Self {
        Self {
            error: Staged::new(ErrorIndicator::new(width, height, refresh_rate as u64)),
            blink: Staged::new(DestructionBlink::new(max_blinks)),
        }
    }

    /// True if any animation is running.
    pub fn is_active(&self) -> bool {
        self.error.is_active() || self.blink.is_active()
    }

    /// Show the error indicator.
    pub fn activate_error(&mut self) {
        if !self.error.is_active() {
            debug!("Error indicator activated");
        }
        self.error.activate();
    }

    /// Queue destroyed cells for blinking and start the blinker.
    pub fn blink_cells<I: IntoIterator<Item = Coord>>(&mut self, cells: I) {
        let blinker = self.blink.get_mut();
        let before = blinker.cells().len();
        for cell in cells {
            blinker.add_cell(cell);
        }
        if blinker.cells().len() > before {
            self.blink.activate();
        }
    }

    /// Advance animations for this tick.
    ///
    /// With `exclusive`, only the highest-priority active animation runs.
    /// Returns `true` if any animation was active.
    pub fn advance(&mut self, tick: u64, renderer: &mut Renderer, exclusive: bool) -> bool {
        let mut any = false;

        if self.error.is_active() {
            self.error.advance(tick, renderer.layer_mut(LayerId::Error));
            any = true;
            if exclusive {
                return true;
            }
        }
        if self.blink.is_active() {
            self.blink.advance(tick, renderer.layer_mut(LayerId::Blink));
            any = true;
        }
        any
    }
}
