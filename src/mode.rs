//! The two-state machine that decides which update/render path runs.
//!
//! Placement shows static positioning instructions and runs no simulation.
//! Animation owns a live particle population and paints the metaball field
//! every tick. Leaving Animation always discards the population; there is no
//! paused-with-particles state.

use rand::rngs::StdRng;

use crate::field::{MetaballField, Rgb, Surface};
use crate::sim::{Bounds, ParticleSystem, Tuning};

pub const PLACEMENT_HELP: [&str; 4] = [
    "Arrow keys nudge the panel",
    "Shift+Arrows resize it",
    "Enter saves and lights the lava",
    "Q quits",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Placement,
    Animation,
}

pub struct ModeController {
    mode: Mode,
    system: ParticleSystem,
    field: MetaballField,
    rng: StdRng,
    color: Rgb,
    dirty: bool,
}

impl ModeController {
    /// Starts in Placement; the bootstrap commits immediately when a valid
    /// persisted configuration exists.
    pub fn new(tuning: Tuning, rng: StdRng, color: Rgb) -> Self {
        Self {
            mode: Mode::Placement,
            system: ParticleSystem::new(tuning),
            field: MetaballField::new(&tuning),
            rng,
            color,
            dirty: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Placement → Animation with finalized bounds and color. Re-entrant:
    /// committing while already animating respawns the population in place
    /// rather than creating a second simulation.
    pub fn commit(&mut self, bounds: Bounds, color: Rgb) {
        self.color = color;
        self.system.spawn(bounds, &mut self.rng);
        self.mode = Mode::Animation;
        self.dirty = true;
    }

    /// Animation → Placement. The population is discarded and rebuilt fresh
    /// on the next commit. A no-op when already in Placement.
    pub fn reposition(&mut self) {
        if self.mode == Mode::Placement {
            return;
        }
        self.system.clear();
        self.mode = Mode::Placement;
        self.dirty = true;
    }

    /// Re-runs the color side effect without a state transition.
    pub fn reload_color(&mut self, color: Rgb) {
        self.color = color;
        self.dirty = true;
    }

    /// One fixed-rate tick. Returns whether the frame is now dirty, which is
    /// also the host's cue for any per-tick OS-level effects.
    pub fn on_tick(&mut self, bounds: Bounds) -> bool {
        if self.mode != Mode::Animation || bounds.is_degenerate() {
            return false;
        }
        self.system.update_all(bounds, &mut self.rng);
        self.dirty = true;
        true
    }

    /// Paint the current mode's frame. Runs strictly after the tick that
    /// dirtied it; the surface is borrowed for this call only.
    pub fn render(&mut self, surface: &mut dyn Surface, bounds: Bounds) {
        match self.mode {
            Mode::Placement => {
                for (row, line) in PLACEMENT_HELP.iter().enumerate() {
                    surface.overlay_line(row, line);
                }
            }
            Mode::Animation => {
                self.field
                    .render(surface, bounds, self.system.particles(), self.color);
            }
        }
        self.dirty = false;
    }

    pub fn frame_dirty(&self) -> bool {
        self.dirty
    }
}
