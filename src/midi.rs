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
use std::{error::Error, fmt, sync::Arc};

use midly::{
    live::LiveEvent,
    num::{u4, u7},
    MidiMessage, PitchBend,
};
use tracing::error;

use crate::performance::ControlEvent;

mod midir;
mod mock;

/// Receives the control events of a performance. Implementations decide how
/// the events reach an instrument.
pub trait Sink: Send + Sync {
    fn note_on(&self, note: u7, velocity: u7) -> Result<(), Box<dyn Error>>;

    fn note_off(&self, note: u7) -> Result<(), Box<dyn Error>>;

    fn control_change(&self, controller: u7, value: u7) -> Result<(), Box<dyn Error>>;

    fn channel_pressure(&self, value: u7) -> Result<(), Box<dyn Error>>;

    /// Bends the pitch, `value` is in the range [-1, 1].
    fn pitch_bend(&self, value: f64) -> Result<(), Box<dyn Error>>;
}

/// A MIDI output device.
pub trait Device: fmt::Display + Send + Sync {
    /// Returns the name of the device.
    fn name(&self) -> String;

    /// Emits an event.
    fn emit(&self, event: LiveEvent<'static>) -> Result<(), Box<dyn Error>>;

    #[cfg(test)]
    fn to_mock(&self) -> Result<Arc<mock::Device>, Box<dyn Error>>;
}

/// Lists the MIDI output ports known to midir.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    midir::list()
}

/// Gets a device with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    };

    Ok(Arc::new(midir::get(name)?))
}

/// A sink that writes events to a MIDI device on a single channel.
pub struct Output {
    device: Arc<dyn Device>,
    channel: u4,
}

impl Output {
    pub fn new(device: Arc<dyn Device>, channel: u4) -> Output {
        Output { device, channel }
    }

    pub fn device(&self) -> Arc<dyn Device> {
        self.device.clone()
    }

    fn send(&self, message: MidiMessage) -> Result<(), Box<dyn Error>> {
        self.device.emit(LiveEvent::Midi {
            channel: self.channel,
            message,
        })
    }
}

impl Sink for Output {
    fn note_on(&self, note: u7, velocity: u7) -> Result<(), Box<dyn Error>> {
        self.send(MidiMessage::NoteOn {
            key: note,
            vel: velocity,
        })
    }

    fn note_off(&self, note: u7) -> Result<(), Box<dyn Error>> {
        self.send(MidiMessage::NoteOff {
            key: note,
            vel: u7::from_int_lossy(0),
        })
    }

    fn control_change(&self, controller: u7, value: u7) -> Result<(), Box<dyn Error>> {
        self.send(MidiMessage::Controller { controller, value })
    }

    fn channel_pressure(&self, value: u7) -> Result<(), Box<dyn Error>> {
        self.send(MidiMessage::ChannelAftertouch { vel: value })
    }

    fn pitch_bend(&self, value: f64) -> Result<(), Box<dyn Error>> {
        self.send(MidiMessage::PitchBend {
            bend: PitchBend::from_f64(value.clamp(-1.0, 1.0)),
        })
    }
}

/// Hands the events to the sink in order. Every event is attempted; the first
/// failure is returned to the caller.
pub fn dispatch(sink: &dyn Sink, events: &[ControlEvent]) -> Result<(), Box<dyn Error>> {
    let mut first_error: Option<Box<dyn Error>> = None;

    for event in events {
        let result = match *event {
            ControlEvent::NoteOn { note, velocity } => sink.note_on(note, velocity),
            ControlEvent::NoteOff { note } => sink.note_off(note),
            ControlEvent::ControlChange { controller, value } => {
                sink.control_change(controller, value)
            }
            ControlEvent::ChannelPressure { value } => sink.channel_pressure(value),
            ControlEvent::PitchBend { value } => sink.pitch_bend(value),
        };

        if let Err(e) = result {
            error!(err = e.as_ref(), event = ?event, "Error emitting control event.");
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
