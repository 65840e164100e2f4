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
use std::{
    error::Error,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use crate::mapping::SegmentMapper;

mod mock;
mod udp;

pub use udp::UdpSender;

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(15);

/// A vibration command for the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorCommand {
    pub duration: u8,
    pub amplitude: u8,
}

impl fmt::Display for ActuatorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VIB:{}:{}", self.duration, self.amplitude)
    }
}

/// Delivers actuator commands to the haptic device.
pub trait Sender: Send + Sync {
    fn send(&self, command: &ActuatorCommand) -> Result<(), Box<dyn Error>>;
}

/// Gets a sender for the given address. Addresses starting with "mock" get a
/// mock sender.
pub fn get_sender(address: &str) -> Result<Arc<dyn Sender>, Box<dyn Error>> {
    if address.starts_with("mock") {
        return Ok(Arc::new(mock::Sender::new()));
    }

    Ok(Arc::new(UdpSender::new(address.parse()?)?))
}

/// Turns bowing magnitude into rate limited vibration commands while the
/// instrument is playing. Ticks that arrive before the interval has elapsed
/// are dropped.
#[derive(Debug, Clone)]
pub struct HapticEncoder {
    interval: Duration,
    lower_threshold: f64,
    duration: SegmentMapper,
    amplitude: SegmentMapper,
    last_emission: Option<Instant>,
}

impl HapticEncoder {
    pub fn new(
        interval: Duration,
        lower_threshold: f64,
        duration: SegmentMapper,
        amplitude: SegmentMapper,
    ) -> HapticEncoder {
        HapticEncoder {
            interval,
            lower_threshold,
            duration,
            amplitude,
            last_emission: None,
        }
    }

    /// Replaces the encoder settings, keeping the rate limiter state.
    pub fn reconfigure(
        &mut self,
        interval: Duration,
        lower_threshold: f64,
        duration: SegmentMapper,
        amplitude: SegmentMapper,
    ) {
        self.interval = interval;
        self.lower_threshold = lower_threshold;
        self.duration = duration;
        self.amplitude = amplitude;
    }

    /// Returns a command if one should be sent for this tick.
    pub fn tick(
        &mut self,
        magnitude: Option<f64>,
        playing: bool,
        now: Instant,
    ) -> Option<ActuatorCommand> {
        if !playing {
            return None;
        }
        let magnitude = magnitude.filter(|m| m.is_finite() && *m >= self.lower_threshold)?;
        if self
            .last_emission
            .is_some_and(|last| now.saturating_duration_since(last) < self.interval)
        {
            return None;
        }

        self.last_emission = Some(now);
        Some(ActuatorCommand {
            duration: self.duration.map_u8(magnitude),
            amplitude: self.amplitude.map_u8(magnitude),
        })
    }
}
