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

use crate::{filter::FilterError, gate::GateError};

/// Typed error for config load/parse/validation failures so callers can
/// distinguish e.g. file-not-found from an invalid threshold pair without
/// string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid thresholds for {name}: {source}")]
    Thresholds {
        name: &'static str,
        #[source]
        source: GateError,
    },

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("Invalid duration for {name}: {message}")]
    Duration { name: &'static str, message: String },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
