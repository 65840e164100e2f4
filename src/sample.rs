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
use std::{fmt, str::FromStr};

use serde::Deserialize;

/// Identifies a tracking source, e.g. "head-tracker" or "phone".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Creates a new source ID.
    pub fn new(id: impl Into<String>) -> SourceId {
        SourceId(id.into())
    }

    /// Returns the source ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        SourceId::new(id)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A semantic channel reported by a tracking source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterId {
    HeadYawPosition,
    HeadYawVelocity,
    HeadYawAcceleration,
    HeadPitchPosition,
    HeadPitchVelocity,
    HeadPitchAcceleration,
    HeadRollPosition,
    HeadRollVelocity,
    HeadRollAcceleration,
    /// Discrete signed bow direction (-1, 0 or 1) computed by the source.
    BowDirection,
    MouthAperture,
    GazeX,
    GazeY,
}

impl ParameterId {
    /// Every parameter, motion channels first.
    pub const ALL: [ParameterId; 13] = [
        ParameterId::HeadYawPosition,
        ParameterId::HeadYawVelocity,
        ParameterId::HeadYawAcceleration,
        ParameterId::HeadPitchPosition,
        ParameterId::HeadPitchVelocity,
        ParameterId::HeadPitchAcceleration,
        ParameterId::HeadRollPosition,
        ParameterId::HeadRollVelocity,
        ParameterId::HeadRollAcceleration,
        ParameterId::BowDirection,
        ParameterId::MouthAperture,
        ParameterId::GazeX,
        ParameterId::GazeY,
    ];

    /// The auxiliary channels. These are routed by source pins rather than by
    /// the active motion source.
    pub const AUXILIARY: [ParameterId; 3] = [
        ParameterId::MouthAperture,
        ParameterId::GazeX,
        ParameterId::GazeY,
    ];

    /// Returns true for position/velocity/acceleration style channels.
    pub fn is_motion(&self) -> bool {
        !self.is_auxiliary()
    }

    /// Returns true for mouth aperture and gaze.
    pub fn is_auxiliary(&self) -> bool {
        matches!(
            self,
            ParameterId::MouthAperture | ParameterId::GazeX | ParameterId::GazeY
        )
    }

    /// Iterates over the motion channels.
    pub fn motion() -> impl Iterator<Item = ParameterId> {
        ParameterId::ALL.into_iter().filter(ParameterId::is_motion)
    }

    /// The snake case name of the parameter.
    pub fn name(&self) -> &'static str {
        match self {
            ParameterId::HeadYawPosition => "head_yaw_position",
            ParameterId::HeadYawVelocity => "head_yaw_velocity",
            ParameterId::HeadYawAcceleration => "head_yaw_acceleration",
            ParameterId::HeadPitchPosition => "head_pitch_position",
            ParameterId::HeadPitchVelocity => "head_pitch_velocity",
            ParameterId::HeadPitchAcceleration => "head_pitch_acceleration",
            ParameterId::HeadRollPosition => "head_roll_position",
            ParameterId::HeadRollVelocity => "head_roll_velocity",
            ParameterId::HeadRollAcceleration => "head_roll_acceleration",
            ParameterId::BowDirection => "bow_direction",
            ParameterId::MouthAperture => "mouth_aperture",
            ParameterId::GazeX => "gaze_x",
            ParameterId::GazeY => "gaze_y",
        }
    }
}

impl fmt::Display for ParameterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown parameter '{0}'")]
pub struct UnknownParameter(String);

impl FromStr for ParameterId {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParameterId::ALL
            .into_iter()
            .find(|parameter| parameter.name() == s)
            .ok_or_else(|| UnknownParameter(s.to_string()))
    }
}

/// A packet of parameter values from a single source. The parameters keep
/// the order they were inserted in and each parameter appears at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSample {
    source: SourceId,
    parameters: Vec<(ParameterId, f64)>,
}

impl SensorSample {
    /// Creates a new sample. Repeated parameters overwrite the earlier value
    /// while keeping the earlier position.
    pub fn new(
        source: impl Into<SourceId>,
        parameters: impl IntoIterator<Item = (ParameterId, f64)>,
    ) -> SensorSample {
        let mut sample = SensorSample {
            source: source.into(),
            parameters: Vec::new(),
        };
        for (parameter, value) in parameters {
            sample.insert(parameter, value);
        }
        sample
    }

    /// Inserts or replaces the value for the given parameter.
    pub fn insert(&mut self, parameter: ParameterId, value: f64) {
        match self.parameters.iter_mut().find(|(p, _)| *p == parameter) {
            Some(entry) => entry.1 = value,
            None => self.parameters.push((parameter, value)),
        }
    }

    /// The source that produced this sample.
    pub fn source(&self) -> &SourceId {
        &self.source
    }

    /// The parameters in this sample.
    pub fn parameters(&self) -> &[(ParameterId, f64)] {
        &self.parameters
    }

    /// Gets the value of the given parameter, if present.
    pub fn get(&self, parameter: ParameterId) -> Option<f64> {
        self.parameters
            .iter()
            .find(|(p, _)| *p == parameter)
            .map(|(_, value)| *value)
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Drops parameters whose values are NaN or infinite. Returns the number
    /// of parameters dropped.
    pub fn retain_finite(&mut self) -> usize {
        let before = self.parameters.len();
        self.parameters.retain(|(_, value)| value.is_finite());
        before - self.parameters.len()
    }
}
