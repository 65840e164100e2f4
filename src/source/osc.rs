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
use std::{
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
    sync::Arc,
};

use midly::num::u7;
use rosc::{OscMessage, OscPacket, OscType};
use tokio::{net::UdpSocket, sync::mpsc::Sender, task::JoinHandle};
use tracing::{debug, error, info, span, Level};

use crate::{
    config,
    engine::Input,
    sample::{ParameterId, SensorSample, SourceId},
};

/// The address used to select a note, with a single integer argument.
const NOTE_ADDRESS: &str = "/note";

/// Receives tracking data over OSC.
///
/// Each value is a message addressed `/<source>/<parameter>` with one numeric
/// argument, e.g. `/head-tracker/head_yaw_velocity 2.5`. Messages that arrive
/// together in a bundle become a single packet per source.
pub struct Driver {
    addr: SocketAddr,
}

impl Driver {
    pub fn new(config: &config::Osc) -> Arc<Driver> {
        Arc::new(Driver {
            addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port())),
        })
    }
}

impl super::Driver for Driver {
    fn monitor_samples(&self, inputs_tx: Sender<Input>) -> JoinHandle<Result<(), io::Error>> {
        let addr = self.addr;

        tokio::spawn(async move {
            let span = span!(Level::INFO, "OSC source");
            let _enter = span.enter();

            let socket = UdpSocket::bind(addr).await?;
            info!(addr = addr.to_string(), "OSC source started.");

            let mut buf = [0u8; rosc::decoder::MTU];
            loop {
                let size = match socket.recv_from(&mut buf).await {
                    Ok((size, _)) => size,
                    Err(e) => {
                        error!(err = e.to_string(), "Error receiving UDP.");
                        continue;
                    }
                };

                let packet = match rosc::decoder::decode_udp(&buf[..size]) {
                    Ok((_, packet)) => packet,
                    Err(e) => {
                        error!(err = e.to_string(), "Error decoding OSC message");
                        continue;
                    }
                };

                for input in inputs_from_packet(packet) {
                    if inputs_tx.send(input).await.is_err() {
                        info!("Engine closed, OSC source stopping.");
                        return Ok(());
                    }
                }
            }
        })
    }
}

/// Turns an OSC packet into engine inputs. Values that can't be understood
/// are skipped.
pub fn inputs_from_packet(packet: OscPacket) -> Vec<Input> {
    let mut messages = Vec::new();
    flatten(packet, &mut messages);

    let mut inputs = Vec::new();
    let mut samples: Vec<SensorSample> = Vec::new();
    for message in messages {
        if message.addr == NOTE_ADDRESS {
            match note_from_args(&message.args) {
                Some(note) => inputs.push(Input::SelectNote(note)),
                None => debug!(args = ?message.args, "Ignoring note selection."),
            }
            continue;
        }

        let Some((source, parameter)) = parse_address(&message.addr) else {
            debug!(addr = message.addr, "Ignoring OSC message.");
            continue;
        };
        let Some(value) = message.args.first().and_then(value_from_arg) else {
            debug!(addr = message.addr, "Ignoring OSC message without a value.");
            continue;
        };

        match samples.iter_mut().find(|sample| sample.source() == &source) {
            Some(sample) => sample.insert(parameter, value),
            None => samples.push(SensorSample::new(source, [(parameter, value)])),
        }
    }

    inputs.extend(samples.into_iter().map(Input::Sample));
    inputs
}

fn flatten(packet: OscPacket, messages: &mut Vec<OscMessage>) {
    match packet {
        OscPacket::Message(message) => messages.push(message),
        OscPacket::Bundle(bundle) => {
            for packet in bundle.content {
                flatten(packet, messages);
            }
        }
    }
}

/// Splits `/<source>/<parameter>`.
fn parse_address(addr: &str) -> Option<(SourceId, ParameterId)> {
    let mut parts = addr.strip_prefix('/')?.split('/');
    let source = parts.next().filter(|source| !source.is_empty())?;
    let parameter = parts.next()?.parse::<ParameterId>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((SourceId::new(source), parameter))
}

fn value_from_arg(arg: &OscType) -> Option<f64> {
    match arg {
        OscType::Float(value) => Some(f64::from(*value)),
        OscType::Double(value) => Some(*value),
        OscType::Int(value) => Some(f64::from(*value)),
        OscType::Long(value) => Some(*value as f64),
        _ => None,
    }
}

fn note_from_args(args: &[OscType]) -> Option<u7> {
    let note = match args.first()? {
        OscType::Int(note) => i64::from(*note),
        OscType::Long(note) => *note,
        _ => return None,
    };
    u8::try_from(note)
        .ok()
        .filter(|note| *note <= 127)
        .map(u7::from_int_lossy)
}
