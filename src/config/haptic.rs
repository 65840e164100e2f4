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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::{haptic::DEFAULT_INTERVAL, mapping::SegmentMapper};

/// A YAML representation of the haptic feedback configuration.
#[derive(Deserialize, Clone)]
pub(super) struct HapticFile {
    #[serde(default = "default_enabled")]
    enabled: bool,
    /// Minimum time between two vibration commands, e.g. "15ms".
    interval: Option<String>,
    lower_threshold: f64,
    /// Where to send commands. "mock" selects the mock sender.
    address: String,
    duration: SegmentMapper,
    amplitude: SegmentMapper,
}

fn default_enabled() -> bool {
    true
}

/// The validated haptic feedback configuration.
#[derive(Clone, Debug)]
pub struct Haptic {
    interval: Duration,
    lower_threshold: f64,
    address: String,
    duration: SegmentMapper,
    amplitude: SegmentMapper,
}

impl Haptic {
    pub fn new(
        interval: Duration,
        lower_threshold: f64,
        address: &str,
        duration: SegmentMapper,
        amplitude: SegmentMapper,
    ) -> Haptic {
        Haptic {
            interval,
            lower_threshold,
            address: address.to_string(),
            duration,
            amplitude,
        }
    }

    /// Resolves the file representation. Disabled haptics resolve to None.
    pub(super) fn resolve(file: HapticFile) -> Result<Option<Haptic>, ConfigError> {
        if !file.enabled {
            return Ok(None);
        }
        if !file.lower_threshold.is_finite() {
            return Err(ConfigError::Invalid(
                "haptic.lower_threshold must be a number".to_string(),
            ));
        }

        let interval = match file.interval {
            Some(interval) => DurationString::from_string(interval)
                .map_err(|e| ConfigError::Duration {
                    name: "haptic.interval",
                    message: e.to_string(),
                })?
                .into(),
            None => DEFAULT_INTERVAL,
        };

        Ok(Some(Haptic {
            interval,
            lower_threshold: file.lower_threshold,
            address: file.address,
            duration: file.duration,
            amplitude: file.amplitude,
        }))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn lower_threshold(&self) -> f64 {
        self.lower_threshold
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn duration(&self) -> SegmentMapper {
        self.duration
    }

    pub fn amplitude(&self) -> SegmentMapper {
        self.amplitude
    }
}
