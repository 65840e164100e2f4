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
use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::info;

use crate::sample::{ParameterId, SourceId};

/// Whether rules allow or deny the parameters they match.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Only parameters matched by a rule pass.
    #[default]
    Allow,
    /// Everything passes except parameters matched by a rule.
    Deny,
}

/// A single routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutingRule {
    /// Matches every parameter from the source.
    Source(SourceId),
    /// Matches one parameter from the source.
    Parameter(SourceId, ParameterId),
}

impl RoutingRule {
    fn source(&self) -> &SourceId {
        match self {
            RoutingRule::Source(source) => source,
            RoutingRule::Parameter(source, _) => source,
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RouterError {
    #[error("{0} is a motion parameter and can't be pinned to a source")]
    NotAuxiliary(ParameterId),
}

/// Decides which parameters from which sources reach the rest of the pipeline.
#[derive(Debug, Default)]
pub struct ParameterRouter {
    mode: RoutingMode,
    rules: HashSet<RoutingRule>,
    /// Auxiliary parameters pinned to the source that supplies them.
    pins: HashMap<ParameterId, SourceId>,
    /// Pins installed by a source switch rather than `pin_auxiliary`. These
    /// move to the next selected source.
    following: HashSet<ParameterId>,
    active_source: Option<SourceId>,
}

impl ParameterRouter {
    /// Creates an empty router in the given mode.
    pub fn new(mode: RoutingMode) -> ParameterRouter {
        ParameterRouter {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RoutingMode) {
        self.mode = mode;
    }

    pub fn rules(&self) -> impl Iterator<Item = &RoutingRule> {
        self.rules.iter()
    }

    /// Adds a rule. Returns false if the rule already existed.
    pub fn add_rule(&mut self, rule: RoutingRule) -> bool {
        self.rules.insert(rule)
    }

    /// Removes a rule. Returns false if the rule didn't exist.
    pub fn remove_rule(&mut self, rule: &RoutingRule) -> bool {
        self.rules.remove(rule)
    }

    /// Removes every rule. Pins are untouched.
    pub fn clear_rules(&mut self) {
        self.rules.clear();
    }

    /// Pins an auxiliary parameter to a source. The pin is kept across source
    /// switches until it is removed.
    pub fn pin_auxiliary(
        &mut self,
        parameter: ParameterId,
        source: SourceId,
    ) -> Result<(), RouterError> {
        if !parameter.is_auxiliary() {
            return Err(RouterError::NotAuxiliary(parameter));
        }
        self.following.remove(&parameter);
        self.pins.insert(parameter, source);
        Ok(())
    }

    pub fn unpin_auxiliary(&mut self, parameter: ParameterId) -> Option<SourceId> {
        self.following.remove(&parameter);
        self.pins.remove(&parameter)
    }

    /// The source an auxiliary parameter is pinned to.
    pub fn auxiliary_source(&self, parameter: ParameterId) -> Option<&SourceId> {
        self.pins.get(&parameter)
    }

    /// The source most recently selected to supply motion parameters.
    pub fn active_source(&self) -> Option<&SourceId> {
        self.active_source.as_ref()
    }

    /// Makes the given source the only supplier of motion parameters. The
    /// router switches to allow mode, every existing rule is replaced by one
    /// rule per motion parameter for the new source. Auxiliary parameters
    /// without an explicit pin follow it.
    pub fn select_active_source(&mut self, source: SourceId) {
        self.mode = RoutingMode::Allow;
        self.rules.clear();
        self.rules.extend(
            ParameterId::motion()
                .map(|parameter| RoutingRule::Parameter(source.clone(), parameter)),
        );
        for parameter in ParameterId::AUXILIARY {
            if !self.pins.contains_key(&parameter) || self.following.contains(&parameter) {
                self.pins.insert(parameter, source.clone());
                self.following.insert(parameter);
            }
        }

        info!(source = source.as_str(), "Selected active motion source.");
        self.active_source = Some(source);
    }

    /// Returns true if the parameter from the given source passes.
    pub fn allows(&self, source: &SourceId, parameter: ParameterId) -> bool {
        let ruled = self.rules.contains(&RoutingRule::Source(source.clone()))
            || self
                .rules
                .contains(&RoutingRule::Parameter(source.clone(), parameter));

        match self.mode {
            RoutingMode::Allow => {
                ruled
                    || (parameter.is_auxiliary()
                        && self.pins.get(&parameter).is_some_and(|pin| pin == source))
            }
            RoutingMode::Deny => !ruled,
        }
    }

    /// Returns the subset of the parameters that pass, in their original order.
    pub fn filter(
        &self,
        source: &SourceId,
        parameters: &[(ParameterId, f64)],
    ) -> Vec<(ParameterId, f64)> {
        parameters
            .iter()
            .filter(|(parameter, _)| self.allows(source, *parameter))
            .copied()
            .collect()
    }

    /// Returns true if any rule mentions the source.
    pub fn knows_source(&self, source: &SourceId) -> bool {
        self.rules.iter().any(|rule| rule.source() == source)
            || self.pins.values().any(|pin| pin == source)
    }
}
