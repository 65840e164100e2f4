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
use midly::num::u7;
use serde::Deserialize;

use super::error::ConfigError;
use crate::mapping::SegmentMapper;

const DEFAULT_NOTE: u8 = 62;
const DEFAULT_MODULATION_CC: u8 = 1;
const DEFAULT_BOW_PRESSURE_CC: u8 = 2;

/// How the performance state reacts to note changes and which controllers
/// it drives.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Performance {
    /// The note selected at the start of the session.
    note: u8,
    /// Retune a sounding note immediately instead of waiting for the next stroke.
    slide_play: bool,
    /// Whether modulation is driven. When off, modulation is held at zero.
    modulation: bool,
    /// Whether bow pressure is driven. When off, bow pressure is held at zero.
    bow_pressure: bool,
    modulation_cc: u8,
    bow_pressure_cc: u8,
}

impl Default for Performance {
    fn default() -> Self {
        Performance {
            note: DEFAULT_NOTE,
            slide_play: true,
            modulation: true,
            bow_pressure: false,
            modulation_cc: DEFAULT_MODULATION_CC,
            bow_pressure_cc: DEFAULT_BOW_PRESSURE_CC,
        }
    }
}

impl Performance {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("note", self.note),
            ("modulation_cc", self.modulation_cc),
            ("bow_pressure_cc", self.bow_pressure_cc),
        ] {
            if value > 127 {
                return Err(ConfigError::Invalid(format!(
                    "performance.{} must be between 0 and 127, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn note(&self) -> u7 {
        u7::from_int_lossy(self.note)
    }

    pub fn slide_play(&self) -> bool {
        self.slide_play
    }

    pub fn modulation(&self) -> bool {
        self.modulation
    }

    pub fn bow_pressure(&self) -> bool {
        self.bow_pressure
    }

    pub fn modulation_cc(&self) -> u7 {
        u7::from_int_lossy(self.modulation_cc)
    }

    pub fn bow_pressure_cc(&self) -> u7 {
        u7::from_int_lossy(self.bow_pressure_cc)
    }
}

/// The range mappings for each expression control. A control without a
/// mapping is not driven by motion.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Mappings {
    /// Bow magnitude to note-on velocity.
    velocity: Option<SegmentMapper>,
    /// Bow magnitude to channel pressure.
    pressure: Option<SegmentMapper>,
    /// Head roll to modulation.
    modulation: Option<SegmentMapper>,
    /// Head pitch to bow pressure.
    bow_pressure: Option<SegmentMapper>,
    /// Horizontal gaze to pitch bend.
    pitch_bend: Option<SegmentMapper>,
}

impl Mappings {
    pub fn new(
        velocity: Option<SegmentMapper>,
        pressure: Option<SegmentMapper>,
        modulation: Option<SegmentMapper>,
        bow_pressure: Option<SegmentMapper>,
        pitch_bend: Option<SegmentMapper>,
    ) -> Mappings {
        Mappings {
            velocity,
            pressure,
            modulation,
            bow_pressure,
            pitch_bend,
        }
    }

    pub fn velocity(&self) -> Option<&SegmentMapper> {
        self.velocity.as_ref()
    }

    pub fn pressure(&self) -> Option<&SegmentMapper> {
        self.pressure.as_ref()
    }

    pub fn modulation(&self) -> Option<&SegmentMapper> {
        self.modulation.as_ref()
    }

    pub fn bow_pressure(&self) -> Option<&SegmentMapper> {
        self.bow_pressure.as_ref()
    }

    pub fn pitch_bend(&self) -> Option<&SegmentMapper> {
        self.pitch_bend.as_ref()
    }
}
