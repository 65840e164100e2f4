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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};
use headbow::config::{Handle, Settings};
use headbow::engine::{self, Engine};
use headbow::source::{self, Driver};
use headbow::{haptic, midi};
use tracing::{error, info};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=head tracked bowed instrument

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/headbow
ExecStart=/usr/local/bin/headbow start "$HEADBOW_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=headbow.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Plays a bowed instrument with head, mouth and gaze tracking."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available MIDI output devices.
    MidiDevices {},
    /// Checks that a settings file is valid.
    Verify {
        /// The path to the settings file.
        config_path: String,
    },
    /// Starts the instrument.
    Start {
        /// The path to the settings file.
        config_path: String,
    },
    /// Prints a systemd service definition.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Verify { config_path } => {
            let settings = Settings::deserialize(&PathBuf::from(&config_path))?;
            println!("{} is valid.", config_path);
            println!("- active source: {}", settings.active_source());
            println!(
                "- gate: {} to {}",
                settings.gate().lower(),
                settings.gate().upper()
            );
            match settings.midi() {
                Some(midi) => println!("- MIDI device: {}", midi.device()),
                None => println!("- MIDI device: none"),
            }
            println!(
                "- haptic feedback: {}",
                if settings.haptic().is_some() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
        Commands::Start { config_path } => start(PathBuf::from(config_path)).await?,
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}

/// Wires the configured sources, engine and outputs together and runs until
/// interrupted.
async fn start(config_path: PathBuf) -> Result<(), Box<dyn Error>> {
    let config = Handle::load(&config_path)?;
    let settings = config.current();

    #[cfg(feature = "reload")]
    let _watcher = headbow::config::Watcher::new(config.clone())?;

    let midi_config = settings
        .midi()
        .ok_or("a midi section is required to start")?;
    let device = midi::get_device(midi_config.device())?;
    info!(device = device.to_string(), "Using MIDI device.");
    let sink = Arc::new(midi::Output::new(device, midi_config.channel()));

    let sender = match settings.haptic() {
        Some(haptic) => Some(haptic::get_sender(haptic.address())?),
        None => None,
    };

    let engine = Engine::new(settings.clone())?;
    let (inputs_tx, processing) = engine::spawn(engine, config.clone(), sink, sender);

    let osc_config = settings.osc().cloned().unwrap_or_else(|| {
        info!("No osc section, listening on the default port.");
        headbow::config::Osc::default()
    });
    let osc = source::osc::Driver::new(&osc_config);
    let mut osc_join = osc.monitor_samples(inputs_tx);

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, shutting down.");
        }
        result = &mut osc_join => {
            match result {
                Ok(Ok(())) => info!("OSC source stopped."),
                Ok(Err(e)) => error!(err = e.to_string(), "OSC source failed."),
                Err(e) => error!(err = e.to_string(), "OSC source task failed."),
            }
        }
    }

    // The OSC source owns the last input sender; aborting it closes the queue,
    // which makes the engine release the sounding note and exit.
    osc_join.abort();
    processing.await?;
    Ok(())
}
