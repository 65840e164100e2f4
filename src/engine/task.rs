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
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, info, span, Level};

use super::Engine;
use crate::{config::Handle, haptic, midi, sample::SensorSample};

/// How many inputs may wait for the engine before producers are slowed down.
const QUEUE_SIZE: usize = 256;

/// Inputs accepted by the processing task.
#[derive(Debug)]
pub enum Input {
    /// A packet from a tracking source.
    Sample(SensorSample),
    /// A note chosen by the user interface.
    SelectNote(u7),
}

/// Starts the processing task. The task owns the engine and handles inputs
/// in arrival order, reading the current settings for each one. Clone the
/// returned sender for every producer. Once all senders are dropped the task
/// stops the sounding note and exits.
pub fn spawn(
    engine: Engine,
    config: Handle,
    sink: Arc<dyn midi::Sink>,
    sender: Option<Arc<dyn haptic::Sender>>,
) -> (Sender<Input>, JoinHandle<()>) {
    let (inputs_tx, inputs_rx) = mpsc::channel(QUEUE_SIZE);
    let handle = tokio::spawn(run(engine, config, sink, sender, inputs_rx));
    (inputs_tx, handle)
}

async fn run(
    mut engine: Engine,
    config: Handle,
    sink: Arc<dyn midi::Sink>,
    sender: Option<Arc<dyn haptic::Sender>>,
    mut inputs_rx: Receiver<Input>,
) {
    let span = span!(Level::INFO, "engine");
    let _enter = span.enter();

    info!(
        active_source = config.current().active_source().as_str(),
        "Engine started."
    );

    while let Some(input) = inputs_rx.recv().await {
        let settings = config.current();
        match input {
            Input::Sample(sample) => {
                let Some(output) = engine.process(sample, &settings, Instant::now()) else {
                    continue;
                };

                // Failures are logged per event; the stream carries on.
                let _ = midi::dispatch(sink.as_ref(), &output.events);

                if let (Some(command), Some(sender)) = (output.haptic, sender.as_ref()) {
                    if let Err(e) = sender.send(&command) {
                        error!(
                            err = e.as_ref(),
                            command = command.to_string(),
                            "Error sending actuator command."
                        );
                    }
                }
            }
            Input::SelectNote(note) => {
                debug!(note = note.as_int(), "Note selected.");
                let events = engine.select_note(note, &settings);
                let _ = midi::dispatch(sink.as_ref(), &events);
            }
        }
    }

    info!("All inputs closed, engine stopping.");
    let events = engine.release();
    let _ = midi::dispatch(sink.as_ref(), &events);
}
