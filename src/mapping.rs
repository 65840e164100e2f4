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
use serde::Deserialize;

/// Errors produced when a mapper is configured with an unusable range.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("input range is empty (in_min == in_max == {0})")]
    EmptyInputRange(f64),
    #[error("input range is reversed ({in_min} > {in_max}) and invert is not set")]
    ReversedInputRange { in_min: f64, in_max: f64 },
    #[error("mapper bounds must be finite")]
    NonFinite,
}

/// The YAML representation of a mapper.
#[derive(Deserialize, Clone, Copy, Debug)]
pub struct SegmentRange {
    in_min: f64,
    in_max: f64,
    out_min: f64,
    out_max: f64,
    #[serde(default)]
    invert: bool,
}

/// An affine remap from an input range onto an output range. Input is
/// clamped to the input range and the result is clamped to the output range.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(try_from = "SegmentRange")]
pub struct SegmentMapper {
    in_min: f64,
    in_max: f64,
    out_min: f64,
    out_max: f64,
    invert: bool,
}

impl SegmentMapper {
    /// Creates a new mapper. A descending input range is only accepted when
    /// `invert` is set, in which case the descending range is the inversion.
    pub fn new(
        in_min: f64,
        in_max: f64,
        out_min: f64,
        out_max: f64,
        invert: bool,
    ) -> Result<SegmentMapper, MappingError> {
        if ![in_min, in_max, out_min, out_max]
            .iter()
            .all(|bound| bound.is_finite())
        {
            return Err(MappingError::NonFinite);
        }
        if in_min == in_max {
            return Err(MappingError::EmptyInputRange(in_min));
        }
        if in_min > in_max {
            if !invert {
                return Err(MappingError::ReversedInputRange { in_min, in_max });
            }
            return Ok(SegmentMapper {
                in_min: in_max,
                in_max: in_min,
                out_min,
                out_max,
                invert: true,
            });
        }

        Ok(SegmentMapper {
            in_min,
            in_max,
            out_min,
            out_max,
            invert,
        })
    }

    /// Maps the given value onto the output range.
    pub fn map(&self, x: f64) -> f64 {
        let x = if x.is_nan() {
            self.in_min
        } else {
            x.clamp(self.in_min, self.in_max)
        };
        let mut position = (x - self.in_min) / (self.in_max - self.in_min);
        if self.invert {
            position = 1.0 - position;
        }

        let y = self.out_min + position * (self.out_max - self.out_min);
        y.clamp(self.out_min.min(self.out_max), self.out_min.max(self.out_max))
    }

    /// Maps the value and rounds it into a MIDI data byte.
    pub fn map_u7(&self, x: f64) -> u8 {
        self.map(x).round().clamp(0.0, 127.0) as u8
    }

    /// Maps the value and rounds it into a full byte.
    pub fn map_u8(&self, x: f64) -> u8 {
        self.map(x).round().clamp(0.0, 255.0) as u8
    }
}

impl TryFrom<SegmentRange> for SegmentMapper {
    type Error = MappingError;

    fn try_from(range: SegmentRange) -> Result<Self, Self::Error> {
        SegmentMapper::new(
            range.in_min,
            range.in_max,
            range.out_min,
            range.out_max,
            range.invert,
        )
    }
}
