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
use std::io;

use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::engine::Input;

pub mod osc;

/// A tracking source. Drivers run independently of each other and of the
/// engine, and only talk to it through the input queue.
pub trait Driver: Send + Sync + 'static {
    fn monitor_samples(&self, inputs_tx: Sender<Input>) -> JoinHandle<Result<(), io::Error>>;
}
