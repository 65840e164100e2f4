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

const DEFAULT_PORT: u16 = 9000;

/// The configuration for the OSC sample source.
#[derive(Deserialize, Clone, Debug)]
pub struct Osc {
    /// The UDP port to listen on.
    #[serde(default = "default_port")]
    port: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for Osc {
    fn default() -> Self {
        Osc { port: DEFAULT_PORT }
    }
}

impl Osc {
    pub fn new(port: u16) -> Osc {
        Osc { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
