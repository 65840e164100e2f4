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
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use tracing::{info, warn};

use super::{error::ConfigError, settings::Settings};

/// A shared handle to the current settings. Readers get a cheap snapshot and
/// never observe a partially applied update.
#[derive(Clone)]
pub struct Handle {
    /// The file the settings were loaded from, if any.
    path: Option<PathBuf>,
    current: Arc<RwLock<Arc<Settings>>>,
}

impl Handle {
    /// Creates a handle around already resolved settings.
    pub fn new(settings: Settings) -> Handle {
        Handle {
            path: None,
            current: Arc::new(RwLock::new(Arc::new(settings))),
        }
    }

    /// Loads the settings from the given file.
    pub fn load(path: &Path) -> Result<Handle, ConfigError> {
        let settings = Settings::deserialize(path)?;
        Ok(Handle {
            path: Some(path.to_path_buf()),
            current: Arc::new(RwLock::new(Arc::new(settings))),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns a snapshot of the current settings.
    pub fn current(&self) -> Arc<Settings> {
        self.current.read().clone()
    }

    /// Replaces the current settings.
    pub fn replace(&self, settings: Settings) {
        *self.current.write() = Arc::new(settings);
    }

    /// Reloads the settings from the file. On failure the previous settings
    /// stay in effect and the error is returned.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };

        match Settings::deserialize(path) {
            Ok(settings) => {
                self.replace(settings);
                info!(path = %path.display(), "Reloaded settings");
                Ok(())
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    err = %e,
                    "Failed to reload settings, keeping previous settings"
                );
                Err(e)
            }
        }
    }
}
