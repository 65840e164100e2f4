// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::time::{Duration, Instant};

use tracing::debug;

pub mod mouth;

/// The default length of time the gate is held closed after the bow changes
/// direction.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2);

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum GateError {
    #[error("lower threshold {lower} must be below upper threshold {upper}")]
    ThresholdOrder { lower: f64, upper: f64 },
}

/// A validated pair of hysteresis thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    lower: f64,
    upper: f64,
}

impl Thresholds {
    /// Creates the threshold pair. The lower threshold must be strictly below
    /// the upper one.
    pub fn new(lower: f64, upper: f64) -> Result<Thresholds, GateError> {
        // Written this way so NaN is rejected too.
        if !(lower < upper) {
            return Err(GateError::ThresholdOrder { lower, upper });
        }
        Ok(Thresholds { lower, upper })
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }
}

/// A gate edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
}

/// What the gate reports for a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub is_open: bool,
    pub transition: Option<Transition>,
}

/// Inputs for a single tick. Any of them may be missing from a packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateInput {
    /// Filtered, unsigned magnitude of the bowing motion.
    pub magnitude: Option<f64>,
    /// Discrete direction code supplied by the source.
    pub direction: Option<f64>,
    /// Raw signed velocity, used for direction when there is no code.
    pub raw_velocity: Option<f64>,
}

impl GateInput {
    fn direction(&self) -> Option<i8> {
        let finite = |value: &f64| value.is_finite();
        self.direction
            .filter(finite)
            .or(self.raw_velocity.filter(finite))
            .map(sign)
    }
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GateState {
    pub current_direction: i8,
    /// The last non-zero direction seen before the current tick.
    pub previous_direction: i8,
    pub magnitude: f64,
    pub last_transition: Option<Instant>,
    pub reversal_at: Option<Instant>,
    pub is_open: bool,
}

/// Decides whether the bow is "playing" using hysteresis on the motion
/// magnitude, closing briefly whenever the bow changes direction.
#[derive(Debug, Clone)]
pub struct GatingStateMachine {
    thresholds: Thresholds,
    debounce: Duration,
    state: GateState,
}

impl GatingStateMachine {
    /// Creates a closed gate.
    pub fn new(thresholds: Thresholds, debounce: Duration) -> GatingStateMachine {
        GatingStateMachine {
            thresholds,
            debounce,
            state: GateState::default(),
        }
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    /// Updates the thresholds and debounce window. The open/closed state is
    /// kept.
    pub fn reconfigure(&mut self, thresholds: Thresholds, debounce: Duration) {
        self.thresholds = thresholds;
        self.debounce = debounce;
    }

    /// Advances the gate by one tick.
    pub fn tick(&mut self, input: GateInput, now: Instant) -> Decision {
        let magnitude = match input.magnitude.filter(|m| m.is_finite()) {
            Some(magnitude) => magnitude,
            None => return self.hold(),
        };
        self.state.magnitude = magnitude;

        if let Some(direction) = input.direction() {
            if self.state.current_direction != 0 {
                self.state.previous_direction = self.state.current_direction;
            }
            self.state.current_direction = direction;

            let previous = self.state.previous_direction;
            if previous != 0 && direction != 0 && previous != direction {
                // Consume the reversal so it only fires once.
                self.state.previous_direction = direction;
                self.state.reversal_at = Some(now);
                debug!(from = previous, to = direction, "Bow direction reversed.");
                return self.set_open(false, now);
            }
        }

        if let Some(reversal_at) = self.state.reversal_at {
            if now.saturating_duration_since(reversal_at) < self.debounce {
                return self.set_open(false, now);
            }
        }

        if !self.state.is_open && magnitude >= self.thresholds.upper {
            self.set_open(true, now)
        } else if self.state.is_open && magnitude < self.thresholds.lower {
            self.set_open(false, now)
        } else {
            self.hold()
        }
    }

    fn hold(&self) -> Decision {
        Decision {
            is_open: self.state.is_open,
            transition: None,
        }
    }

    fn set_open(&mut self, open: bool, now: Instant) -> Decision {
        if self.state.is_open == open {
            return self.hold();
        }

        self.state.is_open = open;
        self.state.last_transition = Some(now);
        Decision {
            is_open: open,
            transition: Some(if open {
                Transition::Opened
            } else {
                Transition::Closed
            }),
        }
    }
}
