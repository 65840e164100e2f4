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
use std::collections::HashMap;

use crate::sample::ParameterId;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error("decay factor {0} must be strictly between 0 and 1")]
    Decay(f64),
}

/// Exponential moving average smoother.
#[derive(Debug, Clone)]
pub struct DecayFilter {
    /// Weight given to the previous state on every push.
    decay: f64,
    state: f64,
}

impl DecayFilter {
    /// Creates a new filter with the given decay factor.
    pub fn new(decay: f64) -> Result<DecayFilter, FilterError> {
        if !(decay > 0.0 && decay < 1.0) {
            return Err(FilterError::Decay(decay));
        }

        Ok(DecayFilter { decay, state: 0.0 })
    }

    /// Blends the value into the filter state. Non-finite values are ignored.
    pub fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.state = self.decay * self.state + (1.0 - self.decay) * value;
        }
    }

    /// Returns the current smoothed value.
    pub fn pull(&self) -> f64 {
        self.state
    }

    /// Changes the decay factor, keeping the accumulated state.
    pub fn set_decay(&mut self, decay: f64) -> Result<(), FilterError> {
        if !(decay > 0.0 && decay < 1.0) {
            return Err(FilterError::Decay(decay));
        }
        self.decay = decay;
        Ok(())
    }
}

/// The filters belonging to a single consumer, one per monitored parameter.
/// Banks are created once when their consumer is constructed.
#[derive(Debug, Clone)]
pub struct FilterBank {
    filters: HashMap<ParameterId, DecayFilter>,
}

impl FilterBank {
    /// Creates a filter for each of the given parameters.
    pub fn new(
        decay: f64,
        parameters: impl IntoIterator<Item = ParameterId>,
    ) -> Result<FilterBank, FilterError> {
        let filters = parameters
            .into_iter()
            .map(|parameter| Ok((parameter, DecayFilter::new(decay)?)))
            .collect::<Result<HashMap<_, _>, FilterError>>()?;

        Ok(FilterBank { filters })
    }

    /// Pushes a value into the filter for the parameter. Returns false if this
    /// bank doesn't monitor the parameter.
    pub fn push(&mut self, parameter: ParameterId, value: f64) -> bool {
        match self.filters.get_mut(&parameter) {
            Some(filter) => {
                filter.push(value);
                true
            }
            None => false,
        }
    }

    /// Returns the smoothed value for the parameter, if monitored.
    pub fn pull(&self, parameter: ParameterId) -> Option<f64> {
        self.filters.get(&parameter).map(DecayFilter::pull)
    }

    /// Changes the decay factor of every filter in the bank.
    pub fn set_decay(&mut self, decay: f64) -> Result<(), FilterError> {
        for filter in self.filters.values_mut() {
            filter.set_decay(decay)?;
        }
        Ok(())
    }
}
