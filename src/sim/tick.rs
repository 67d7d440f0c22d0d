//! Tick inputs and host-side frame stepping
//!
//! The simulation polls input once per tick through [`InputSource`]. Hosts
//! that wrap a real keyboard or gamepad implement it; [`TickInput`] is the
//! plain-data version used by tests, replays and the headless driver.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::components::Direction;
use crate::consts::MAX_SUBSTEPS;

/// Input collaborator polled once per tick
pub trait InputSource {
    /// Whether a move in `direction` was pressed this tick
    fn move_pressed(&self, direction: Direction) -> bool;
    /// Whether pause was pressed this tick
    fn pause_pressed(&self) -> bool;
}

/// At most one direction per tick, resolved up > down > left > right
pub fn sample_intent(input: &dyn InputSource) -> Option<Direction> {
    Direction::PRIORITY
        .into_iter()
        .find(|&dir| input.move_pressed(dir))
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Pause toggle
    pub pause: bool,
}

impl TickInput {
    /// Input with a single direction pressed
    pub fn steer(direction: Direction) -> Self {
        let mut input = Self::default();
        input.press(direction);
        input
    }

    pub fn pause() -> Self {
        Self {
            pause: true,
            ..Default::default()
        }
    }

    pub fn press(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.up = true,
            Direction::Down => self.down = true,
            Direction::Left => self.left = true,
            Direction::Right => self.right = true,
        }
    }
}

impl InputSource for TickInput {
    fn move_pressed(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    fn pause_pressed(&self) -> bool {
        self.pause
    }
}

/// Fixed-step accumulator for hosts with variable frame times
#[derive(Debug, Clone)]
pub struct FrameClock {
    step: Duration,
    accumulator: Duration,
}

impl FrameClock {
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            accumulator: Duration::ZERO,
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Bank a frame's elapsed time and return how many ticks to run
    ///
    /// Capped at `MAX_SUBSTEPS`; time beyond the cap is dropped so a long
    /// stall cannot snowball.
    pub fn advance(&mut self, frame: Duration) -> u32 {
        if self.step.is_zero() {
            return 0;
        }
        self.accumulator += frame;
        let mut ticks = 0;
        while self.accumulator >= self.step && ticks < MAX_SUBSTEPS {
            self.accumulator -= self.step;
            ticks += 1;
        }
        if ticks == MAX_SUBSTEPS && self.accumulator >= self.step {
            log::warn!(
                "Dropping {:?} of simulation time after {} substeps",
                self.accumulator,
                MAX_SUBSTEPS
            );
            self.accumulator = Duration::ZERO;
        }
        ticks
    }
}
