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
use std::{collections::HashMap, path::Path, time::Duration};

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

use super::{
    error::ConfigError,
    haptic::{Haptic, HapticFile},
    midi::Midi,
    osc::Osc,
    performance::{Mappings, Performance},
};
use crate::{
    filter::DecayFilter,
    gate::{self, mouth, Thresholds},
    router::RoutingMode,
    sample::SourceId,
};

const DEFAULT_FILTER_DECAY: f64 = 0.8;

/// A YAML representation of the settings file.
#[derive(Deserialize)]
struct SettingsFile {
    /// The source that supplies motion parameters.
    active_source: String,
    /// Per source settings.
    #[serde(default)]
    sources: HashMap<String, Source>,
    #[serde(default)]
    routing: RoutingMode,
    #[serde(default = "default_filter_decay")]
    filter_decay: f64,
    gate: GateFile,
    #[serde(default)]
    mouth_gate: MouthGateFile,
    #[serde(default)]
    performance: Performance,
    #[serde(default)]
    mappings: Mappings,
    haptic: Option<HapticFile>,
    osc: Option<Osc>,
    midi: Option<Midi>,
}

fn default_filter_decay() -> f64 {
    DEFAULT_FILTER_DECAY
}

/// Settings for a single tracking source.
#[derive(Deserialize, Clone, Debug)]
pub struct Source {
    /// Multiplier applied to the source's motion parameters.
    #[serde(default = "default_sensitivity")]
    sensitivity: f64,
}

fn default_sensitivity() -> f64 {
    1.0
}

impl Source {
    pub fn new(sensitivity: f64) -> Source {
        Source { sensitivity }
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }
}

#[derive(Deserialize)]
struct GateFile {
    lower_threshold: f64,
    upper_threshold: f64,
    /// How long the gate stays closed after a bow reversal, e.g. "2ms".
    debounce: Option<String>,
}

#[derive(Deserialize)]
#[serde(default)]
struct MouthGateFile {
    enabled: bool,
    lower_threshold: f64,
    upper_threshold: f64,
}

impl Default for MouthGateFile {
    fn default() -> Self {
        MouthGateFile {
            enabled: true,
            lower_threshold: mouth::DEFAULT_LOWER_THRESHOLD,
            upper_threshold: mouth::DEFAULT_UPPER_THRESHOLD,
        }
    }
}

/// The validated settings. Every threshold pair, range and duration has been
/// checked, so consumers can read them on every tick without failing.
#[derive(Clone, Debug)]
pub struct Settings {
    active_source: SourceId,
    sources: HashMap<SourceId, Source>,
    routing: RoutingMode,
    filter_decay: f64,
    gate: Thresholds,
    debounce: Duration,
    mouth_gate: Option<Thresholds>,
    performance: Performance,
    mappings: Mappings,
    haptic: Option<Haptic>,
    osc: Option<Osc>,
    midi: Option<Midi>,
}

impl Settings {
    /// Creates settings with defaults for everything but the active source and
    /// the gate thresholds.
    pub fn new(active_source: &str, gate: Thresholds) -> Settings {
        Settings {
            active_source: SourceId::new(active_source),
            sources: HashMap::new(),
            routing: RoutingMode::Allow,
            filter_decay: DEFAULT_FILTER_DECAY,
            gate,
            debounce: gate::DEFAULT_DEBOUNCE,
            mouth_gate: None,
            performance: Performance::default(),
            mappings: Mappings::default(),
            haptic: None,
            osc: None,
            midi: None,
        }
    }

    /// Parse the settings from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Settings, ConfigError> {
        Settings::resolve(
            Config::builder()
                .add_source(File::from(path))
                .build()?
                .try_deserialize::<SettingsFile>()?,
        )
    }

    /// Parse the settings from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Settings, ConfigError> {
        Settings::resolve(
            Config::builder()
                .add_source(File::from_str(yaml, FileFormat::Yaml))
                .build()?
                .try_deserialize::<SettingsFile>()?,
        )
    }

    fn resolve(file: SettingsFile) -> Result<Settings, ConfigError> {
        // Rejects a decay outside (0, 1) the same way the filters would.
        DecayFilter::new(file.filter_decay)?;

        let gate = Thresholds::new(file.gate.lower_threshold, file.gate.upper_threshold)
            .map_err(|source| ConfigError::Thresholds {
                name: "gate",
                source,
            })?;
        let debounce = match file.gate.debounce {
            Some(debounce) => DurationString::from_string(debounce)
                .map_err(|e| ConfigError::Duration {
                    name: "gate.debounce",
                    message: e.to_string(),
                })?
                .into(),
            None => gate::DEFAULT_DEBOUNCE,
        };

        let mouth_gate = if file.mouth_gate.enabled {
            Some(
                Thresholds::new(
                    file.mouth_gate.lower_threshold,
                    file.mouth_gate.upper_threshold,
                )
                .map_err(|source| ConfigError::Thresholds {
                    name: "mouth_gate",
                    source,
                })?,
            )
        } else {
            None
        };

        for (name, source) in file.sources.iter() {
            if !(source.sensitivity.is_finite() && source.sensitivity > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "sensitivity for source {} must be a positive number, got {}",
                    name, source.sensitivity
                )));
            }
        }
        if file.active_source.is_empty() {
            return Err(ConfigError::Invalid(
                "active_source must not be empty".to_string(),
            ));
        }

        file.performance.validate()?;
        if let Some(midi) = file.midi.as_ref() {
            midi.validate()?;
        }
        let haptic = match file.haptic {
            Some(haptic) => Haptic::resolve(haptic)?,
            None => None,
        };

        Ok(Settings {
            active_source: SourceId::new(file.active_source),
            sources: file
                .sources
                .into_iter()
                .map(|(name, source)| (SourceId::new(name), source))
                .collect(),
            routing: file.routing,
            filter_decay: file.filter_decay,
            gate,
            debounce,
            mouth_gate,
            performance: file.performance,
            mappings: file.mappings,
            haptic,
            osc: file.osc,
            midi: file.midi,
        })
    }

    pub fn active_source(&self) -> &SourceId {
        &self.active_source
    }

    /// The sensitivity multiplier for the source. Unknown sources get 1.
    pub fn sensitivity(&self, source: &SourceId) -> f64 {
        self.sources
            .get(source)
            .map(Source::sensitivity)
            .unwrap_or(1.0)
    }

    pub fn routing(&self) -> RoutingMode {
        self.routing
    }

    pub fn filter_decay(&self) -> f64 {
        self.filter_decay
    }

    pub fn gate(&self) -> Thresholds {
        self.gate
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// The mouth gate thresholds, or None if the mouth gate is disabled.
    pub fn mouth_gate(&self) -> Option<Thresholds> {
        self.mouth_gate
    }

    pub fn performance(&self) -> &Performance {
        &self.performance
    }

    pub fn mappings(&self) -> &Mappings {
        &self.mappings
    }

    pub fn haptic(&self) -> Option<&Haptic> {
        self.haptic.as_ref()
    }

    pub fn osc(&self) -> Option<&Osc> {
        self.osc.as_ref()
    }

    pub fn midi(&self) -> Option<&Midi> {
        self.midi.as_ref()
    }

    pub fn with_source(mut self, source: &str, settings: Source) -> Settings {
        self.sources.insert(SourceId::new(source), settings);
        self
    }

    pub fn with_mouth_gate(mut self, mouth_gate: Option<Thresholds>) -> Settings {
        self.mouth_gate = mouth_gate;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Settings {
        self.debounce = debounce;
        self
    }

    pub fn with_performance(mut self, performance: Performance) -> Settings {
        self.performance = performance;
        self
    }

    pub fn with_mappings(mut self, mappings: Mappings) -> Settings {
        self.mappings = mappings;
        self
    }

    pub fn with_haptic(mut self, haptic: Option<Haptic>) -> Settings {
        self.haptic = haptic;
        self
    }

    pub fn with_active_source(mut self, source: &str) -> Settings {
        self.active_source = SourceId::new(source);
        self
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, time::Duration};

    use super::*;

    const FULL: &str = r#"
        active_source: head-tracker
        sources:
          head-tracker:
            sensitivity: 1.5
          phone: {}
        routing: allow
        filter_decay: 0.5
        gate:
          lower_threshold: 1
          upper_threshold: 2
          debounce: 5ms
        mouth_gate:
          lower_threshold: 8
          upper_threshold: 12
        performance:
          note: 60
          slide_play: false
          bow_pressure: true
          bow_pressure_cc: 11
        mappings:
          velocity: { in_min: 1, in_max: 6, out_min: 40, out_max: 127 }
          bow_pressure: { in_min: -20, in_max: 20, out_min: 0, out_max: 127, invert: true }
        haptic:
          interval: 20ms
          lower_threshold: 1.0
          address: mock-haptic
          duration: { in_min: 1, in_max: 6, out_min: 10, out_max: 60 }
          amplitude: { in_min: 1, in_max: 6, out_min: 80, out_max: 255 }
        osc:
          port: 9100
        midi:
          device: mock-midi
          channel: 3
    "#;

    #[test]
    fn test_full_settings() -> Result<(), Box<dyn Error>> {
        let settings = Settings::from_yaml(FULL)?;

        assert_eq!("head-tracker", settings.active_source().as_str());
        assert_eq!(1.5, settings.sensitivity(&"head-tracker".into()));
        assert_eq!(1.0, settings.sensitivity(&"phone".into()));
        assert_eq!(1.0, settings.sensitivity(&"unknown".into()));
        assert_eq!(RoutingMode::Allow, settings.routing());
        assert_eq!(0.5, settings.filter_decay());
        assert_eq!(Thresholds::new(1.0, 2.0)?, settings.gate());
        assert_eq!(Duration::from_millis(5), settings.debounce());
        assert_eq!(Some(Thresholds::new(8.0, 12.0)?), settings.mouth_gate());

        let performance = settings.performance();
        assert_eq!(60, performance.note().as_int());
        assert!(!performance.slide_play());
        assert!(performance.modulation());
        assert!(performance.bow_pressure());
        assert_eq!(1, performance.modulation_cc().as_int());
        assert_eq!(11, performance.bow_pressure_cc().as_int());

        let mappings = settings.mappings();
        assert!(mappings.velocity().is_some());
        assert!(mappings.pressure().is_none());
        assert_eq!(
            Some(127.0),
            mappings.bow_pressure().map(|mapper| mapper.map(-20.0))
        );

        let haptic = settings.haptic().expect("haptic should be enabled");
        assert_eq!(Duration::from_millis(20), haptic.interval());
        assert_eq!("mock-haptic", haptic.address());

        assert_eq!(Some(9100), settings.osc().map(|osc| osc.port()));
        let midi = settings.midi().expect("midi should be configured");
        assert_eq!("mock-midi", midi.device());
        assert_eq!(2, midi.channel().as_int());
        Ok(())
    }

    #[test]
    fn test_minimal_settings_defaults() -> Result<(), Box<dyn Error>> {
        let settings = Settings::from_yaml(
            r#"
            active_source: phone
            gate: { lower_threshold: 0.5, upper_threshold: 1.5 }
            "#,
        )?;

        assert_eq!(super::DEFAULT_FILTER_DECAY, settings.filter_decay());
        assert_eq!(crate::gate::DEFAULT_DEBOUNCE, settings.debounce());
        assert_eq!(Some(Thresholds::new(10.0, 15.0)?), settings.mouth_gate());
        assert_eq!(62, settings.performance().note().as_int());
        assert!(settings.performance().slide_play());
        assert!(settings.haptic().is_none());
        assert!(settings.midi().is_none());
        Ok(())
    }

    #[test]
    fn test_disabled_sections() -> Result<(), Box<dyn Error>> {
        let settings = Settings::from_yaml(
            r#"
            active_source: phone
            gate: { lower_threshold: 0.5, upper_threshold: 1.5 }
            mouth_gate: { enabled: false }
            haptic:
              enabled: false
              lower_threshold: 1.0
              address: mock
              duration: { in_min: 1, in_max: 6, out_min: 10, out_max: 60 }
              amplitude: { in_min: 1, in_max: 6, out_min: 80, out_max: 255 }
            "#,
        )?;

        assert!(settings.mouth_gate().is_none());
        assert!(settings.haptic().is_none());
        Ok(())
    }

    fn assert_invalid(yaml: &str) {
        assert!(
            Settings::from_yaml(yaml).is_err(),
            "expected settings to be rejected:\n{}",
            yaml
        );
    }

    #[test]
    fn test_invalid_settings_rejected() {
        // Threshold order.
        assert_invalid(
            r#"
            active_source: phone
            gate: { lower_threshold: 2, upper_threshold: 2 }
            "#,
        );
        assert_invalid(
            r#"
            active_source: phone
            gate: { lower_threshold: 1, upper_threshold: 2 }
            mouth_gate: { lower_threshold: 15, upper_threshold: 10 }
            "#,
        );
        // Degenerate mapper range.
        assert_invalid(
            r#"
            active_source: phone
            gate: { lower_threshold: 1, upper_threshold: 2 }
            mappings:
              velocity: { in_min: 3, in_max: 3, out_min: 0, out_max: 127 }
            "#,
        );
        // Decay outside (0, 1).
        assert_invalid(
            r#"
            active_source: phone
            filter_decay: 1.0
            gate: { lower_threshold: 1, upper_threshold: 2 }
            "#,
        );
        // Bad duration.
        assert_invalid(
            r#"
            active_source: phone
            gate: { lower_threshold: 1, upper_threshold: 2, debounce: soon }
            "#,
        );
        // Out of range MIDI values.
        assert_invalid(
            r#"
            active_source: phone
            gate: { lower_threshold: 1, upper_threshold: 2 }
            performance: { note: 200 }
            "#,
        );
        assert_invalid(
            r#"
            active_source: phone
            gate: { lower_threshold: 1, upper_threshold: 2 }
            midi: { device: mock, channel: 17 }
            "#,
        );
        // Non positive sensitivity.
        assert_invalid(
            r#"
            active_source: phone
            gate: { lower_threshold: 1, upper_threshold: 2 }
            sources:
              phone: { sensitivity: 0 }
            "#,
        );
    }

    #[test]
    fn test_threshold_error_is_typed() {
        let result = Settings::from_yaml(
            r#"
            active_source: phone
            gate: { lower_threshold: 3, upper_threshold: 2 }
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Thresholds { name: "gate", .. })
        ));
    }
}
