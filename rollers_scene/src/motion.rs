//! The two scripted motion generators that drive every animated actor.
//!
//! Vehicles shuttle back and forth along the road with an [`Oscillator`];
//! background groups (road tiles, trees, lamps, ...) slide forward with a
//! [`Conveyor`] and snap back once they pass their wrap threshold. Both
//! operate on a single coordinate so the scene decides which axis they own.

use serde::{Deserialize, Serialize};

/// Which way an oscillating actor is currently heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Heading toward the lower bound at the forward speed.
    MovingLower,
    /// Heading toward the upper bound at the backward speed.
    MovingUpper,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillatorConfig {
    pub lower_bound: f32,
    pub upper_bound: f32,
    /// Speed applied while moving toward `lower_bound`.
    pub forward_speed: f32,
    /// Speed applied while moving toward `upper_bound`.
    pub backward_speed: f32,
}

/// Back-and-forth generator between two bounds.
///
/// Movement is applied first and the bound guards are evaluated afterwards,
/// so a large step may carry the position past a bound for one frame before
/// the flipped direction brings it back. Scene tuning depends on that
/// overshoot; positions are never clamped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Oscillator {
    config: OscillatorConfig,
    direction: Direction,
}

impl Oscillator {
    pub fn new(config: OscillatorConfig, initial: Direction) -> Self {
        Self {
            config,
            direction: initial,
        }
    }

    pub fn config(&self) -> &OscillatorConfig {
        &self.config
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn advance(&mut self, position: &mut f32, delta_time: f32) {
        match self.direction {
            Direction::MovingLower => *position -= self.config.forward_speed * delta_time,
            Direction::MovingUpper => *position += self.config.backward_speed * delta_time,
        }

        if *position <= self.config.lower_bound {
            self.direction = Direction::MovingUpper;
        }
        if *position >= self.config.upper_bound {
            self.direction = Direction::MovingLower;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConveyorConfig {
    /// Position at which the anchor snaps back.
    pub wrap_threshold: f32,
    /// Position the anchor snaps back to.
    pub reset_value: f32,
}

/// One-way looping generator.
///
/// The anchor advances at `speed` and is hard reset to `reset_value` once it
/// reaches `wrap_threshold`. The reset discards any remainder so the tile
/// pattern repeats at exactly the same offsets every lap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conveyor {
    config: ConveyorConfig,
    speed: f32,
}

impl Conveyor {
    pub fn new(config: ConveyorConfig, speed: f32) -> Self {
        Self { config, speed }
    }

    pub fn config(&self) -> &ConveyorConfig {
        &self.config
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    /// Returns true when this step wrapped the anchor back to its reset value.
    pub fn advance(&mut self, position: &mut f32, delta_time: f32) -> bool {
        *position += self.speed * delta_time;
        if *position >= self.config.wrap_threshold {
            *position = self.config.reset_value;
            return true;
        }
        false
    }
}
