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
use midly::num::u4;
use serde::Deserialize;

use super::error::ConfigError;

const DEFAULT_MIDI_CHANNEL: u8 = 1;

/// A YAML representation of the MIDI output configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Midi {
    /// The MIDI device.
    device: String,

    /// The MIDI channel to play on, 1 through 16.
    #[serde(default = "default_channel")]
    channel: u8,
}

fn default_channel() -> u8 {
    DEFAULT_MIDI_CHANNEL
}

impl Midi {
    /// New will create a new MIDI configuration.
    pub fn new(device: &str, channel: u8) -> Midi {
        Midi {
            device: device.to_string(),
            channel,
        }
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=16).contains(&self.channel) {
            return Err(ConfigError::Invalid(format!(
                "midi.channel must be between 1 and 16, got {}",
                self.channel
            )));
        }
        Ok(())
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the zero based MIDI channel.
    pub fn channel(&self) -> u4 {
        u4::from_int_lossy(self.channel.saturating_sub(1))
    }
}
