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
    error::Error,
    path::{Path, PathBuf},
    time::Duration,
};

use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tracing::{debug, info, warn};

use super::handle::Handle;

/// Editors tend to write a file in several steps.
const DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches the settings file and reloads the handle when it changes. The
/// watch stops when the returned watcher is dropped.
pub struct Watcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl Watcher {
    pub fn new(handle: Handle) -> Result<Watcher, Box<dyn Error>> {
        let path = match handle.path() {
            Some(path) => path.canonicalize()?,
            None => return Err("settings were not loaded from a file".into()),
        };
        // Watching the directory survives editors that replace the file.
        let watch_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        info!(
            path = %path.display(),
            dir = %watch_dir.display(),
            "Watching settings for changes"
        );

        let target = path.clone();
        let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
            let events = match result {
                Ok(events) => events,
                Err(e) => {
                    warn!(path = %target.display(), err = ?e, "Settings watcher failed");
                    return;
                }
            };

            if !events.iter().any(|event| matches_target(&event.path, &target)) {
                return;
            }
            debug!(path = %target.display(), "Settings file changed");

            // Failures are logged by the handle, which keeps the previous settings.
            let _ = handle.reload();
        })?;

        debouncer
            .watcher()
            .watch(&watch_dir, RecursiveMode::NonRecursive)?;

        Ok(Watcher {
            _debouncer: debouncer,
        })
    }
}

fn matches_target(path: &Path, target: &Path) -> bool {
    if path == target {
        return true;
    }
    match path.canonicalize() {
        Ok(path) => path == target,
        Err(_) => path.file_name() == target.file_name(),
    }
}
