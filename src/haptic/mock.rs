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
use std::{error::Error, sync::Arc};

use parking_lot::Mutex;
use tracing::debug;

use super::ActuatorCommand;

/// A mock actuator. Records the commands it was sent.
#[derive(Clone, Default)]
pub struct Sender {
    sent: Arc<Mutex<Vec<ActuatorCommand>>>,
}

impl Sender {
    pub fn new() -> Sender {
        Sender::default()
    }

    /// Gets every command sent so far.
    #[cfg(test)]
    pub fn sent(&self) -> Vec<ActuatorCommand> {
        self.sent.lock().clone()
    }
}

impl super::Sender for Sender {
    fn send(&self, command: &ActuatorCommand) -> Result<(), Box<dyn Error>> {
        debug!(command = command.to_string(), "Sending actuator command (mock).");
        self.sent.lock().push(*command);
        Ok(())
    }
}
