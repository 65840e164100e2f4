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
use std::mem;

use midly::num::u7;
use tracing::{debug, trace};

/// Control events produced by the performance state. These are handed to a
/// [`crate::midi::Sink`] after each packet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    NoteOn { note: u7, velocity: u7 },
    NoteOff { note: u7 },
    ControlChange { controller: u7, value: u7 },
    ChannelPressure { value: u7 },
    /// Pitch bend in the range [-1, 1].
    PitchBend { value: f64 },
}

/// Clamps the value into a 7 bit MIDI data byte.
pub fn clamp_u7(value: u8) -> u7 {
    u7::from_int_lossy(value.min(127))
}

/// The single source of truth for what the instrument is doing. All setters
/// are guarded: they only change state (and only queue events) when the
/// requested value is allowed and actually different.
#[derive(Debug)]
pub struct PerformanceState {
    playing: bool,
    selected_note: u7,
    /// The note to switch to on the next note-on when slide play is off.
    pending_note: Option<u7>,
    /// The note that has been turned on and not yet turned off.
    sounding_note: Option<u7>,
    velocity: u7,
    pressure: u7,
    modulation: u7,
    bow_pressure: u7,
    pitch_bend: f64,
    mouth_gate_blocking: bool,
    outbox: Vec<ControlEvent>,
}

impl PerformanceState {
    /// Creates a silent state with the given note selected.
    pub fn new(selected_note: u7) -> PerformanceState {
        PerformanceState {
            playing: false,
            selected_note,
            pending_note: None,
            sounding_note: None,
            velocity: u7::from_int_lossy(100),
            pressure: u7::from_int_lossy(0),
            modulation: u7::from_int_lossy(0),
            bow_pressure: u7::from_int_lossy(0),
            pitch_bend: 0.0,
            mouth_gate_blocking: false,
            outbox: Vec::new(),
        }
    }

    pub fn playing(&self) -> bool {
        self.playing
    }

    pub fn selected_note(&self) -> u7 {
        self.selected_note
    }

    pub fn pending_note(&self) -> Option<u7> {
        self.pending_note
    }

    pub fn sounding_note(&self) -> Option<u7> {
        self.sounding_note
    }

    pub fn velocity(&self) -> u7 {
        self.velocity
    }

    pub fn pressure(&self) -> u7 {
        self.pressure
    }

    pub fn modulation(&self) -> u7 {
        self.modulation
    }

    pub fn bow_pressure(&self) -> u7 {
        self.bow_pressure
    }

    pub fn pitch_bend(&self) -> f64 {
        self.pitch_bend
    }

    pub fn mouth_gate_blocking(&self) -> bool {
        self.mouth_gate_blocking
    }

    /// Drains the events queued since the last call.
    pub fn take_events(&mut self) -> Vec<ControlEvent> {
        mem::take(&mut self.outbox)
    }

    /// Starts or stops the note. Starting is refused while the mouth gate is
    /// blocking. Returns true if the playing state changed.
    pub fn set_playing(&mut self, playing: bool) -> bool {
        if playing == self.playing {
            return false;
        }

        if playing {
            if self.mouth_gate_blocking {
                trace!("Mouth gate is blocking, not starting note.");
                return false;
            }
            if let Some(pending) = self.pending_note.take() {
                self.selected_note = pending;
            }
            self.playing = true;
            self.note_on(self.selected_note);
        } else {
            self.playing = false;
            self.note_off();
        }

        true
    }

    /// Sets the mouth gate veto. Blocking while playing stops the note.
    pub fn set_mouth_gate_blocking(&mut self, blocking: bool) -> bool {
        if blocking == self.mouth_gate_blocking {
            return false;
        }

        self.mouth_gate_blocking = blocking;
        if blocking && self.playing {
            debug!("Mouth gate closed while playing, stopping note.");
            self.playing = false;
            self.note_off();
        }
        true
    }

    /// Selects the note to play. While playing, slide play retunes the note
    /// immediately; otherwise the note waits for the next note-on.
    pub fn set_selected_note(&mut self, note: u7, slide_play: bool) -> bool {
        if !self.playing {
            let changed = self.selected_note != note || self.pending_note.is_some();
            self.selected_note = note;
            self.pending_note = None;
            return changed;
        }

        if self.sounding_note == Some(note) {
            return self.pending_note.take().is_some();
        }

        if slide_play {
            self.note_off();
            self.selected_note = note;
            self.pending_note = None;
            self.note_on(note);
        } else {
            self.pending_note = Some(note);
        }
        true
    }

    /// Sets the velocity used by the next note-on.
    pub fn set_velocity(&mut self, velocity: u8) -> bool {
        let velocity = clamp_u7(velocity);
        let changed = velocity != self.velocity;
        self.velocity = velocity;
        changed
    }

    pub fn set_pressure(&mut self, pressure: u8) -> bool {
        let pressure = clamp_u7(pressure);
        if pressure == self.pressure {
            return false;
        }

        self.pressure = pressure;
        self.outbox.push(ControlEvent::ChannelPressure { value: pressure });
        true
    }

    /// Sets modulation. Forced to zero when modulation control is disabled.
    pub fn set_modulation(&mut self, modulation: u8, enabled: bool, controller: u7) -> bool {
        let value = if enabled {
            clamp_u7(modulation)
        } else {
            u7::from_int_lossy(0)
        };
        if value == self.modulation {
            return false;
        }

        self.modulation = value;
        self.outbox.push(ControlEvent::ControlChange { controller, value });
        true
    }

    /// Sets bow pressure. Forced to zero when bow pressure control is disabled.
    pub fn set_bow_pressure(&mut self, bow_pressure: u8, enabled: bool, controller: u7) -> bool {
        let value = if enabled {
            clamp_u7(bow_pressure)
        } else {
            u7::from_int_lossy(0)
        };
        if value == self.bow_pressure {
            return false;
        }

        self.bow_pressure = value;
        self.outbox.push(ControlEvent::ControlChange { controller, value });
        true
    }

    pub fn set_pitch_bend(&mut self, pitch_bend: f64) -> bool {
        if !pitch_bend.is_finite() {
            return false;
        }
        let value = pitch_bend.clamp(-1.0, 1.0);
        if value == self.pitch_bend {
            return false;
        }

        self.pitch_bend = value;
        self.outbox.push(ControlEvent::PitchBend { value });
        true
    }

    /// Stops any sounding note at the end of a session.
    pub fn release(&mut self) {
        self.pending_note = None;
        self.set_playing(false);
    }

    fn note_on(&mut self, note: u7) {
        // A sounding note is always turned off before another starts.
        self.note_off();
        // Velocity 0 would read as a note-off on the wire.
        let velocity = self.velocity.max(u7::from_int_lossy(1));
        self.sounding_note = Some(note);
        self.outbox.push(ControlEvent::NoteOn { note, velocity });
    }

    fn note_off(&mut self) {
        if let Some(note) = self.sounding_note.take() {
            self.outbox.push(ControlEvent::NoteOff { note });
        }
    }
}
