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
    thread,
    time::{Duration, Instant},
};

/// How long background tasks get to catch up before a test gives up.
const DEADLINE: Duration = Duration::from_secs(10);

/// Polls `condition` until it holds, panicking with `what` if the deadline
/// passes first. Polling starts fast and slows down to 100ms.
pub fn eventually(condition: impl Fn() -> bool, what: &str) {
    let deadline = Instant::now() + DEADLINE;
    let mut interval = Duration::from_millis(2);

    while !condition() {
        assert!(Instant::now() < deadline, "{}", what);
        thread::sleep(interval);
        interval = (interval * 2).min(Duration::from_millis(100));
    }
}
