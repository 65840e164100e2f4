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
use std::{sync::Arc, time::Instant};

use midly::num::u7;
use tracing::{debug, trace, warn};

use crate::{
    config::{Haptic, Settings},
    filter::{FilterBank, FilterError},
    gate::{mouth::MouthGate, GateInput, GatingStateMachine, Transition},
    haptic::{ActuatorCommand, HapticEncoder},
    performance::{ControlEvent, PerformanceState},
    router::{ParameterRouter, RoutingMode},
    sample::{ParameterId, SensorSample, SourceId},
};

mod task;

pub use task::{spawn, Input};

/// The parameters smoothed for each consumer.
const BOW_PARAMETERS: [ParameterId; 1] = [ParameterId::HeadYawVelocity];
const EXPRESSION_PARAMETERS: [ParameterId; 3] = [
    ParameterId::HeadRollPosition,
    ParameterId::HeadPitchPosition,
    ParameterId::GazeX,
];
const HAPTIC_PARAMETERS: [ParameterId; 1] = [ParameterId::HeadYawVelocity];

/// What a single packet produced.
#[derive(Debug, Default, PartialEq)]
pub struct Output {
    /// Control events in the order they were produced.
    pub events: Vec<ControlEvent>,
    /// A vibration command, if one is due.
    pub haptic: Option<ActuatorCommand>,
}

impl Output {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.haptic.is_none()
    }
}

/// Runs the processing pipeline for every packet. The engine owns the router,
/// the filter banks, both gates and the performance state, so a single owner
/// serializes all mutation.
///
/// Each packet goes through these stages, in order:
///
/// 1. Malformed packets are dropped.
/// 2. The active source is re-applied if the settings changed it.
/// 3. The router removes parameters the source may not supply.
/// 4. Motion parameters are scaled by the source's sensitivity.
/// 5. Values are pushed into the bow, expression and haptic filter banks.
/// 6. The mouth gate updates the veto.
/// 7. The bow magnitude sets the velocity for the next note-on.
/// 8. The gate ticks and drives `playing`.
/// 9. Pressure, modulation, bow pressure and pitch bend follow their inputs.
/// 10. The haptic encoder ticks.
/// 11. Queued control events are drained.
pub struct Engine {
    router: ParameterRouter,
    /// The source and mode last applied to the router.
    routing: Option<(SourceId, RoutingMode)>,
    bow: FilterBank,
    expression: FilterBank,
    haptic_filters: FilterBank,
    gate: GatingStateMachine,
    mouth_gate: MouthGate,
    performance: PerformanceState,
    haptic: Option<HapticEncoder>,
    /// The settings snapshot last applied.
    settings: Arc<Settings>,
}

impl Engine {
    /// Creates an engine from the given settings.
    pub fn new(settings: Arc<Settings>) -> Result<Engine, FilterError> {
        let decay = settings.filter_decay();
        let mouth_gate = match settings.mouth_gate() {
            Some(thresholds) => MouthGate::new(thresholds),
            None => MouthGate::default(),
        };

        let mut engine = Engine {
            router: ParameterRouter::new(settings.routing()),
            routing: None,
            bow: FilterBank::new(decay, BOW_PARAMETERS)?,
            expression: FilterBank::new(decay, EXPRESSION_PARAMETERS)?,
            haptic_filters: FilterBank::new(decay, HAPTIC_PARAMETERS)?,
            gate: GatingStateMachine::new(settings.gate(), settings.debounce()),
            mouth_gate,
            performance: PerformanceState::new(settings.performance().note()),
            haptic: settings.haptic().map(new_encoder),
            settings: settings.clone(),
        };
        engine.apply_routing(&settings);
        Ok(engine)
    }

    pub fn router(&self) -> &ParameterRouter {
        &self.router
    }

    /// Mutable access to the router for rule changes between packets.
    pub fn router_mut(&mut self) -> &mut ParameterRouter {
        &mut self.router
    }

    pub fn gate(&self) -> &GatingStateMachine {
        &self.gate
    }

    pub fn performance(&self) -> &PerformanceState {
        &self.performance
    }

    /// Processes one packet. Returns None if the packet produced no update,
    /// either because it was malformed or because the router blocked all of it.
    pub fn process(
        &mut self,
        mut sample: SensorSample,
        settings: &Arc<Settings>,
        now: Instant,
    ) -> Option<Output> {
        let dropped = sample.retain_finite();
        if sample.is_empty() {
            debug!(
                source = sample.source().as_str(),
                dropped, "Dropping malformed packet."
            );
            return None;
        }

        self.apply(settings);

        let source = sample.source().clone();
        let mut parameters = self.router.filter(&source, sample.parameters());
        if parameters.is_empty() {
            trace!(
                source = source.as_str(),
                known = self.router.knows_source(&source),
                "Router blocked packet."
            );
            return None;
        }

        let sensitivity = settings.sensitivity(&source);
        for (parameter, value) in parameters.iter_mut() {
            if parameter.is_motion() && *parameter != ParameterId::BowDirection {
                *value *= sensitivity;
            }
        }
        let get = |wanted: ParameterId| {
            parameters
                .iter()
                .find(|(parameter, _)| *parameter == wanted)
                .map(|(_, value)| *value)
        };

        for (parameter, value) in parameters.iter() {
            self.bow.push(*parameter, *value);
            self.expression.push(*parameter, *value);
            self.haptic_filters.push(*parameter, *value);
        }

        // Mouth gate.
        if settings.mouth_gate().is_some() {
            let blocking = self.mouth_gate.update(get(ParameterId::MouthAperture));
            self.performance.set_mouth_gate_blocking(blocking);
        } else {
            self.performance.set_mouth_gate_blocking(false);
        }

        // The bow magnitude is only known when this packet carries bowing motion.
        let raw_velocity = get(ParameterId::HeadYawVelocity);
        let magnitude = raw_velocity
            .and(self.bow.pull(ParameterId::HeadYawVelocity))
            .map(f64::abs);

        let mappings = settings.mappings();
        if let (Some(magnitude), Some(mapper)) = (magnitude, mappings.velocity()) {
            self.performance.set_velocity(mapper.map_u7(magnitude));
        }

        let decision = self.gate.tick(
            GateInput {
                magnitude,
                direction: get(ParameterId::BowDirection),
                raw_velocity,
            },
            now,
        );
        if let Some(transition) = decision.transition {
            debug!(
                source = source.as_str(),
                opened = transition == Transition::Opened,
                magnitude = self.gate.state().magnitude,
                "Gate transition."
            );
        }
        // Repeating the level is a no-op, so a note refused by the mouth gate
        // starts on the first open tick after the veto lifts.
        self.performance.set_playing(decision.is_open);

        let performance = settings.performance();
        if let (Some(magnitude), Some(mapper)) = (magnitude, mappings.pressure()) {
            self.performance.set_pressure(mapper.map_u7(magnitude));
        }
        if let Some(mapper) = mappings.modulation() {
            if get(ParameterId::HeadRollPosition).is_some() {
                let roll = self.expression.pull(ParameterId::HeadRollPosition);
                self.performance.set_modulation(
                    roll.map(|roll| mapper.map_u7(roll)).unwrap_or_default(),
                    performance.modulation(),
                    performance.modulation_cc(),
                );
            }
        }
        if let Some(mapper) = mappings.bow_pressure() {
            if get(ParameterId::HeadPitchPosition).is_some() {
                let pitch = self.expression.pull(ParameterId::HeadPitchPosition);
                self.performance.set_bow_pressure(
                    pitch.map(|pitch| mapper.map_u7(pitch)).unwrap_or_default(),
                    performance.bow_pressure(),
                    performance.bow_pressure_cc(),
                );
            }
        }
        if let Some(mapper) = mappings.pitch_bend() {
            if get(ParameterId::GazeX).is_some() {
                if let Some(gaze) = self.expression.pull(ParameterId::GazeX) {
                    self.performance.set_pitch_bend(mapper.map(gaze));
                }
            }
        }

        let playing = self.performance.playing();
        let haptic = match self.haptic.as_mut() {
            Some(encoder) => {
                let magnitude = raw_velocity
                    .and(self.haptic_filters.pull(ParameterId::HeadYawVelocity))
                    .map(f64::abs);
                encoder.tick(magnitude, playing, now)
            }
            None => None,
        };

        Some(Output {
            events: self.performance.take_events(),
            haptic,
        })
    }

    /// Selects the note to play, following the configured slide play policy.
    pub fn select_note(&mut self, note: u7, settings: &Arc<Settings>) -> Vec<ControlEvent> {
        self.apply(settings);
        self.performance
            .set_selected_note(note, settings.performance().slide_play());
        self.performance.take_events()
    }

    /// Stops any sounding note. Used when the session ends.
    pub fn release(&mut self) -> Vec<ControlEvent> {
        self.performance.release();
        self.performance.take_events()
    }

    /// Applies a new settings snapshot. Component state (filters, gate
    /// direction, the sounding note) carries over.
    fn apply(&mut self, settings: &Arc<Settings>) {
        if Arc::ptr_eq(&self.settings, settings) {
            return;
        }
        debug!("Applying new settings.");

        let decay = settings.filter_decay();
        for bank in [&mut self.bow, &mut self.expression, &mut self.haptic_filters] {
            if let Err(e) = bank.set_decay(decay) {
                // Settings reject invalid decays at load.
                warn!(err = %e, "Keeping previous filter decay.");
            }
        }

        self.gate.reconfigure(settings.gate(), settings.debounce());
        if let Some(thresholds) = settings.mouth_gate() {
            self.mouth_gate.set_thresholds(thresholds);
        }

        self.haptic = match (self.haptic.take(), settings.haptic()) {
            (Some(mut encoder), Some(haptic)) => {
                encoder.reconfigure(
                    haptic.interval(),
                    haptic.lower_threshold(),
                    haptic.duration(),
                    haptic.amplitude(),
                );
                Some(encoder)
            }
            (None, Some(haptic)) => Some(new_encoder(haptic)),
            (_, None) => None,
        };

        let note = settings.performance().note();
        if note != self.settings.performance().note() {
            self.performance
                .set_selected_note(note, settings.performance().slide_play());
        }

        self.apply_routing(settings);
        self.settings = settings.clone();
    }

    /// Points the router at the configured active source. In deny mode the
    /// router starts with no rules, so every source passes.
    fn apply_routing(&mut self, settings: &Settings) {
        let wanted = (settings.active_source().clone(), settings.routing());
        if self.routing.as_ref() == Some(&wanted) {
            return;
        }

        match wanted.1 {
            RoutingMode::Allow => self.router.select_active_source(wanted.0.clone()),
            RoutingMode::Deny => {
                self.router.set_mode(RoutingMode::Deny);
                self.router.clear_rules();
            }
        }
        self.routing = Some(wanted);
    }
}

fn new_encoder(haptic: &Haptic) -> HapticEncoder {
    HapticEncoder::new(
        haptic.interval(),
        haptic.lower_threshold(),
        haptic.duration(),
        haptic.amplitude(),
    )
}

#[cfg(test)]
mod test {
    use std::{
        error::Error,
        sync::Arc,
        time::{Duration, Instant},
    };

    use midly::num::u7;

    use super::{Engine, Output};
    use crate::{
        config::{Haptic, Mappings, Settings, Source},
        gate::Thresholds,
        haptic::ActuatorCommand,
        mapping::SegmentMapper,
        performance::ControlEvent,
        router::RoutingRule,
        sample::{ParameterId, SensorSample},
    };

    const NOTE: u8 = 62;

    fn settings() -> Result<Settings, Box<dyn Error>> {
        Ok(Settings::new("head", Thresholds::new(1.0, 2.0)?))
    }

    fn engine(settings: &Arc<Settings>) -> Engine {
        Engine::new(settings.clone()).expect("engine")
    }

    fn yaw(source: &str, velocity: f64) -> SensorSample {
        SensorSample::new(source, [(ParameterId::HeadYawVelocity, velocity)])
    }

    /// Pushes the same velocity enough times for the filter to settle.
    fn settle(
        engine: &mut Engine,
        settings: &Arc<Settings>,
        source: &str,
        velocity: f64,
        now: &mut Instant,
    ) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        for _ in 0..60 {
            *now += Duration::from_millis(1);
            if let Some(output) = engine.process(yaw(source, velocity), settings, *now) {
                events.extend(output.events);
            }
        }
        events
    }

    fn note_on(note: u8, velocity: u8) -> ControlEvent {
        ControlEvent::NoteOn {
            note: u7::from_int_lossy(note),
            velocity: u7::from_int_lossy(velocity),
        }
    }

    fn note_off(note: u8) -> ControlEvent {
        ControlEvent::NoteOff {
            note: u7::from_int_lossy(note),
        }
    }

    #[test]
    fn test_bowing_plays_and_stops() -> Result<(), Box<dyn Error>> {
        let settings = Arc::new(settings()?);
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        let events = settle(&mut engine, &settings, "head", 3.0, &mut now);
        assert_eq!(vec![note_on(NOTE, 100)], events);
        assert!(engine.performance().playing());

        let events = settle(&mut engine, &settings, "head", 0.0, &mut now);
        assert_eq!(vec![note_off(NOTE)], events);
        assert!(!engine.performance().playing());
        Ok(())
    }

    #[test]
    fn test_malformed_packets_are_dropped() -> Result<(), Box<dyn Error>> {
        let settings = Arc::new(settings()?);
        let mut engine = engine(&settings);
        let now = Instant::now();

        assert_eq!(
            None,
            engine.process(SensorSample::new("head", []), &settings, now)
        );
        assert_eq!(
            None,
            engine.process(yaw("head", f64::NAN), &settings, now)
        );
        assert_eq!(
            None,
            engine.process(yaw("head", f64::INFINITY), &settings, now)
        );
        assert!(!engine.gate().is_open());
        Ok(())
    }

    #[test]
    fn test_inactive_source_is_blocked() -> Result<(), Box<dyn Error>> {
        let settings = Arc::new(settings()?);
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        let events = settle(&mut engine, &settings, "phone", 3.0, &mut now);
        assert!(events.is_empty());
        assert!(!engine.gate().is_open());
        Ok(())
    }

    #[test]
    fn test_source_switch_tie_break() -> Result<(), Box<dyn Error>> {
        let first = Arc::new(settings()?);
        let mut engine = engine(&first);
        let mut now = Instant::now();

        settle(&mut engine, &first, "head", 3.0, &mut now);
        assert!(engine.performance().playing());

        // Switch to the phone. A late packet from the old source is blocked,
        // so it can't keep the gate open or flip it.
        let second = Arc::new(settings()?.with_active_source("phone"));
        now += Duration::from_millis(1);
        assert_eq!(None, engine.process(yaw("head", 100.0), &second, now));
        assert_eq!(Some(&"phone".into()), engine.router().active_source());

        let events = settle(&mut engine, &second, "phone", 0.0, &mut now);
        assert_eq!(vec![note_off(NOTE)], events);
        Ok(())
    }

    #[test]
    fn test_deny_mode_passes_everything() -> Result<(), Box<dyn Error>> {
        let settings = Arc::new(Settings::from_yaml(
            r#"
            active_source: head
            routing: deny
            gate: { lower_threshold: 1, upper_threshold: 2 }
            "#,
        )?);
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        let events = settle(&mut engine, &settings, "phone", 3.0, &mut now);
        assert_eq!(vec![note_on(NOTE, 100)], events);

        engine
            .router_mut()
            .add_rule(RoutingRule::Source("phone".into()));
        now += Duration::from_millis(1);
        assert_eq!(None, engine.process(yaw("phone", 0.0), &settings, now));
        Ok(())
    }

    #[test]
    fn test_sensitivity_scales_motion() -> Result<(), Box<dyn Error>> {
        // 1.5 alone never reaches the upper threshold, but doubled it does.
        let plain = Arc::new(settings()?);
        let mut engine_plain = engine(&plain);
        let mut now = Instant::now();
        assert!(settle(&mut engine_plain, &plain, "head", 1.5, &mut now).is_empty());

        let scaled = Arc::new(settings()?.with_source("head", Source::new(2.0)));
        let mut engine_scaled = engine(&scaled);
        assert_eq!(
            vec![note_on(NOTE, 100)],
            settle(&mut engine_scaled, &scaled, "head", 1.5, &mut now)
        );
        Ok(())
    }

    #[test]
    fn test_mouth_gate_vetoes_and_releases() -> Result<(), Box<dyn Error>> {
        let settings =
            Arc::new(settings()?.with_mouth_gate(Some(Thresholds::new(10.0, 15.0)?)));
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        now += Duration::from_millis(1);
        engine.process(
            SensorSample::new("head", [(ParameterId::MouthAperture, 5.0)]),
            &settings,
            now,
        );
        assert!(engine.performance().mouth_gate_blocking());

        // Bowing hard while the mouth is closed doesn't start the note.
        assert!(settle(&mut engine, &settings, "head", 3.0, &mut now).is_empty());
        assert!(engine.gate().is_open());

        // Opening the mouth lets the next tick start exactly one note.
        now += Duration::from_millis(1);
        let output = engine
            .process(
                SensorSample::new(
                    "head",
                    [
                        (ParameterId::MouthAperture, 20.0),
                        (ParameterId::HeadYawVelocity, 3.0),
                    ],
                ),
                &settings,
                now,
            )
            .expect("output");
        assert_eq!(vec![note_on(NOTE, 100)], output.events);

        // Closing it again stops the note.
        now += Duration::from_millis(1);
        let output = engine
            .process(
                SensorSample::new("head", [(ParameterId::MouthAperture, 2.0)]),
                &settings,
                now,
            )
            .expect("output");
        assert_eq!(vec![note_off(NOTE)], output.events);
        Ok(())
    }

    #[test]
    fn test_auxiliaries_follow_source_switch() -> Result<(), Box<dyn Error>> {
        let mouth = Thresholds::new(10.0, 15.0)?;
        let first = Arc::new(settings()?.with_mouth_gate(Some(mouth)));
        let mut engine = engine(&first);
        let mut now = Instant::now();

        now += Duration::from_millis(1);
        engine.process(
            SensorSample::new("head", [(ParameterId::MouthAperture, 2.0)]),
            &first,
            now,
        );
        assert!(engine.performance().mouth_gate_blocking());

        // The new source supplies the mouth aperture too, so it can lift the
        // veto left behind by the old one.
        let second = Arc::new(
            settings()?
                .with_mouth_gate(Some(mouth))
                .with_active_source("phone"),
        );
        let mut events = Vec::new();
        for _ in 0..60 {
            now += Duration::from_millis(1);
            let sample = SensorSample::new(
                "phone",
                [
                    (ParameterId::MouthAperture, 30.0),
                    (ParameterId::HeadYawVelocity, 3.0),
                ],
            );
            if let Some(output) = engine.process(sample, &second, now) {
                events.extend(output.events);
            }
        }

        assert_eq!(
            Some(&"phone".into()),
            engine.router().auxiliary_source(ParameterId::MouthAperture)
        );
        assert!(!engine.performance().mouth_gate_blocking());
        assert_eq!(vec![note_on(NOTE, 100)], events);
        Ok(())
    }

    #[test]
    fn test_reversal_retriggers() -> Result<(), Box<dyn Error>> {
        let settings = Arc::new(settings()?.with_debounce(Duration::from_millis(2)));
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        let bow = |direction: f64| {
            SensorSample::new(
                "head",
                [
                    (ParameterId::HeadYawVelocity, 3.0),
                    (ParameterId::BowDirection, direction),
                ],
            )
        };

        let mut events = Vec::new();
        for _ in 0..60 {
            now += Duration::from_millis(1);
            events.extend(engine.process(bow(1.0), &settings, now).expect("output").events);
        }
        assert_eq!(vec![note_on(NOTE, 100)], events);

        // The reversal closes the gate and holds it for the window.
        now += Duration::from_millis(1);
        let output = engine.process(bow(-1.0), &settings, now).expect("output");
        assert_eq!(vec![note_off(NOTE)], output.events);
        now += Duration::from_millis(1);
        let output = engine.process(bow(-1.0), &settings, now).expect("output");
        assert!(output.events.is_empty());

        // After the window the stroke restarts the note.
        now += Duration::from_millis(2);
        let output = engine.process(bow(-1.0), &settings, now).expect("output");
        assert_eq!(vec![note_on(NOTE, 100)], output.events);
        Ok(())
    }

    #[test]
    fn test_velocity_and_expression_mappings() -> Result<(), Box<dyn Error>> {
        let mappings = Mappings::new(
            Some(SegmentMapper::new(1.0, 6.0, 40.0, 127.0, false)?),
            Some(SegmentMapper::new(1.0, 6.0, 0.0, 127.0, false)?),
            Some(SegmentMapper::new(-30.0, 30.0, 0.0, 127.0, false)?),
            None,
            Some(SegmentMapper::new(0.0, 1.0, -1.0, 1.0, false)?),
        );
        let settings = Arc::new(settings()?.with_mappings(mappings));
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        let events = settle(&mut engine, &settings, "head", 6.0, &mut now);
        // Pressure follows the magnitude up; the note starts with the velocity
        // mapped from the magnitude at that tick.
        let note_ons: Vec<_> = events
            .iter()
            .filter(|event| matches!(event, ControlEvent::NoteOn { .. }))
            .collect();
        assert_eq!(1, note_ons.len());
        assert!(events
            .iter()
            .any(|event| matches!(event, ControlEvent::ChannelPressure { .. })));
        assert_eq!(127, engine.performance().pressure().as_int());

        // A packet with only head roll only drives modulation.
        now += Duration::from_millis(1);
        let output = engine
            .process(
                SensorSample::new("head", [(ParameterId::HeadRollPosition, 30.0)]),
                &settings,
                now,
            )
            .expect("output");
        assert!(matches!(
            output.events.as_slice(),
            [ControlEvent::ControlChange { controller, .. }] if controller.as_int() == 1
        ));
        assert!(engine.performance().playing());

        // Gaze drives pitch bend.
        now += Duration::from_millis(1);
        let output = engine
            .process(
                SensorSample::new("head", [(ParameterId::GazeX, 1.0)]),
                &settings,
                now,
            )
            .expect("output");
        assert!(matches!(
            output.events.as_slice(),
            [ControlEvent::PitchBend { value }] if *value > -1.0
        ));
        Ok(())
    }

    #[test]
    fn test_disabled_modulation_is_held_at_zero() -> Result<(), Box<dyn Error>> {
        let mappings = Mappings::new(
            None,
            None,
            Some(SegmentMapper::new(-30.0, 30.0, 0.0, 127.0, false)?),
            None,
            None,
        );
        let performance = Settings::from_yaml(
            r#"
            active_source: head
            gate: { lower_threshold: 1, upper_threshold: 2 }
            performance: { modulation: false }
            "#,
        )?
        .performance()
        .clone();
        let settings = Arc::new(
            settings()?
                .with_mappings(mappings)
                .with_performance(performance),
        );
        let mut engine = engine(&settings);

        let output = engine
            .process(
                SensorSample::new("head", [(ParameterId::HeadRollPosition, 30.0)]),
                &settings,
                Instant::now(),
            )
            .expect("output");
        assert!(output.events.is_empty());
        assert_eq!(0, engine.performance().modulation().as_int());
        Ok(())
    }

    #[test]
    fn test_select_note_slide_play() -> Result<(), Box<dyn Error>> {
        let settings = Arc::new(settings()?);
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        // Not playing: the selection is silent.
        assert!(engine.select_note(u7::from_int_lossy(64), &settings).is_empty());

        settle(&mut engine, &settings, "head", 3.0, &mut now);
        assert_eq!(
            vec![note_off(64), note_on(67, 100)],
            engine.select_note(u7::from_int_lossy(67), &settings)
        );
        assert_eq!(vec![note_off(67)], engine.release());
        assert!(engine.release().is_empty());
        Ok(())
    }

    #[test]
    fn test_select_note_without_slide_waits() -> Result<(), Box<dyn Error>> {
        let performance = Settings::from_yaml(
            r#"
            active_source: head
            gate: { lower_threshold: 1, upper_threshold: 2 }
            performance: { slide_play: false }
            "#,
        )?
        .performance()
        .clone();
        let settings = Arc::new(settings()?.with_performance(performance));
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        settle(&mut engine, &settings, "head", 3.0, &mut now);
        assert!(engine.select_note(u7::from_int_lossy(70), &settings).is_empty());

        assert_eq!(
            vec![note_off(NOTE)],
            settle(&mut engine, &settings, "head", 0.0, &mut now)
        );
        assert_eq!(
            vec![note_on(70, 100)],
            settle(&mut engine, &settings, "head", 3.0, &mut now)
        );
        Ok(())
    }

    #[test]
    fn test_haptic_commands_while_playing() -> Result<(), Box<dyn Error>> {
        let haptic = Haptic::new(
            Duration::from_millis(15),
            1.0,
            "mock",
            SegmentMapper::new(1.0, 6.0, 10.0, 60.0, false)?,
            SegmentMapper::new(1.0, 6.0, 80.0, 255.0, false)?,
        );
        let settings = Arc::new(settings()?.with_haptic(Some(haptic)));
        let mut engine = engine(&settings);
        let mut now = Instant::now();

        let mut commands = Vec::new();
        for _ in 0..1000 {
            now += Duration::from_millis(1);
            if let Some(Output {
                haptic: Some(command),
                ..
            }) = engine.process(yaw("head", 6.0), &settings, now)
            {
                commands.push(command);
            }
        }

        assert!(!commands.is_empty());
        assert!(commands.len() <= 67, "{} commands", commands.len());
        assert_eq!(
            Some(&ActuatorCommand {
                duration: 60,
                amplitude: 255
            }),
            commands.last()
        );
        Ok(())
    }

    #[test]
    fn test_settings_change_applies() -> Result<(), Box<dyn Error>> {
        let first = Arc::new(settings()?);
        let mut engine = engine(&first);
        let mut now = Instant::now();

        // Raising the thresholds keeps the gate closed for the same motion.
        let second = Arc::new(Settings::new("head", Thresholds::new(4.0, 5.0)?));
        assert!(settle(&mut engine, &second, "head", 3.0, &mut now).is_empty());

        let third = Arc::new(
            Settings::new("head", Thresholds::new(4.0, 5.0)?).with_performance(
                Settings::from_yaml(
                    r#"
                    active_source: head
                    gate: { lower_threshold: 1, upper_threshold: 2 }
                    performance: { note: 50 }
                    "#,
                )?
                .performance()
                .clone(),
            ),
        );
        now += Duration::from_millis(1);
        engine.process(yaw("head", 0.0), &third, now);
        assert_eq!(50, engine.performance().selected_note().as_int());
        Ok(())
    }
}
