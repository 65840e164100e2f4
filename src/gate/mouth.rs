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
use tracing::debug;

use super::Thresholds;

pub const DEFAULT_LOWER_THRESHOLD: f64 = 10.0;
pub const DEFAULT_UPPER_THRESHOLD: f64 = 15.0;

/// Vetoes playing while the mouth is closed. Blocks when the aperture drops
/// below the lower threshold and unblocks once it rises above the upper one.
#[derive(Debug, Clone)]
pub struct MouthGate {
    thresholds: Thresholds,
    blocking: bool,
}

impl Default for MouthGate {
    fn default() -> Self {
        MouthGate::new(Thresholds {
            lower: DEFAULT_LOWER_THRESHOLD,
            upper: DEFAULT_UPPER_THRESHOLD,
        })
    }
}

impl MouthGate {
    /// Creates a gate that isn't blocking.
    pub fn new(thresholds: Thresholds) -> MouthGate {
        MouthGate {
            thresholds,
            blocking: false,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking
    }

    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    /// Updates the gate with the latest aperture, if any, and returns whether
    /// it is blocking.
    pub fn update(&mut self, aperture: Option<f64>) -> bool {
        let Some(aperture) = aperture.filter(|a| a.is_finite()) else {
            return self.blocking;
        };

        if !self.blocking && aperture < self.thresholds.lower() {
            debug!(aperture, "Mouth gate blocking.");
            self.blocking = true;
        } else if self.blocking && aperture > self.thresholds.upper() {
            debug!(aperture, "Mouth gate released.");
            self.blocking = false;
        }
        self.blocking
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mouth_hysteresis() {
        let mut gate = MouthGate::default();
        assert!(!gate.is_blocking());

        let blocking: Vec<bool> = [20.0, 12.0, 9.9, 12.0, 15.0, 15.1, 11.0, 10.0]
            .into_iter()
            .map(|aperture| gate.update(Some(aperture)))
            .collect();

        assert_eq!(
            vec![false, false, true, true, true, false, false, false],
            blocking
        );
    }

    #[test]
    fn test_missing_aperture_holds() {
        let mut gate = MouthGate::default();
        assert!(gate.update(Some(0.0)));
        assert!(gate.update(None));
        assert!(gate.update(Some(f64::NAN)));
    }

    #[test]
    fn test_custom_thresholds() -> Result<(), crate::gate::GateError> {
        let mut gate = MouthGate::new(Thresholds::new(0.2, 0.4)?);
        assert!(gate.update(Some(0.1)));
        assert!(gate.update(Some(0.35)));
        gate.set_thresholds(Thresholds::new(0.2, 0.3)?);
        assert!(!gate.update(Some(0.35)));
        Ok(())
    }
}
