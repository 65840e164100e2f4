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
use std::{error::Error, fmt};

use midir::{MidiOutput, MidiOutputConnection};
use midly::live::LiveEvent;
use parking_lot::Mutex;
use tracing::{info, span, Level};

/// A MIDI output port opened through midir.
pub struct Device {
    name: String,
    connection: Mutex<MidiOutputConnection>,
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn emit(&self, event: LiveEvent<'static>) -> Result<(), Box<dyn Error>> {
        let mut buf: Vec<u8> = Vec::with_capacity(8);
        event.write(&mut buf)?;
        self.connection.lock().send(&buf)?;
        Ok(())
    }

    #[cfg(test)]
    fn to_mock(&self) -> Result<std::sync::Arc<super::mock::Device>, Box<dyn Error>> {
        Err("not a mock".into())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Lists the names of the available output ports.
pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
    let output = MidiOutput::new("headbow output listing")?;

    Ok(output
        .ports()
        .iter()
        .filter_map(|port| output.port_name(port).ok())
        .collect())
}

/// Opens the first output port whose name contains the given name.
pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
    let span = span!(Level::INFO, "open MIDI output (midir)");
    let _enter = span.enter();

    let output = MidiOutput::new("headbow output")?;
    let port = output
        .ports()
        .into_iter()
        .find(|port| {
            output
                .port_name(port)
                .is_ok_and(|port_name| port_name.contains(name))
        })
        .ok_or_else(|| format!("no MIDI output device found named {}", name))?;
    let port_name = output.port_name(&port)?;

    let connection = output
        .connect(&port, "headbow")
        .map_err(|e| e.to_string())?;
    info!(device = port_name, "Connected to MIDI output.");

    Ok(Device {
        name: port_name,
        connection: Mutex::new(connection),
    })
}
