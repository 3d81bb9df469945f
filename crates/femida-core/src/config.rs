// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Detection configuration: rectangle-finder policies and rectifier tolerances.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FemidaError, Result};

/// Open interval on one image axis. A missing bound is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Window {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Window {
    pub const UNBOUNDED: Window = Window {
        min: None,
        max: None,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Everything strictly greater than `min`.
    pub fn above(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    /// Strict containment on both bounds.
    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value > min) && self.max.is_none_or(|max| value < max)
    }
}

/// How the near-white score of a candidate decides acceptance.
///
/// The score is the mean of a 0/255 mask of near-white pixels, so it lies in
/// `[0, 255]`; dark filled markers score low.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BrightnessRule {
    /// Accept when the score is strictly below `threshold`.
    Below { threshold: f64 },
    /// Accept when the score falls outside `[low, high]`.
    OutsideWindow { low: f64, high: f64 },
}

impl BrightnessRule {
    pub fn accepts(&self, score: f64) -> bool {
        match *self {
            Self::Below { threshold } => score < threshold,
            Self::OutsideWindow { low, high } => score < low || score > high,
        }
    }
}

/// Filtering policy for one run of the rectangle finder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectanglePolicy {
    /// Candidates whose first extent is not strictly above this are noise.
    pub min_width: f64,
    /// Candidates whose second extent is not strictly above this are noise.
    pub min_height: f64,
    pub brightness: BrightnessRule,
    /// Accepted range for the candidate centre's x coordinate.
    pub x_window: Window,
    /// Accepted range for the candidate centre's y coordinate.
    pub y_window: Window,
    /// Added to both extents of every accepted candidate.
    pub margin: f64,
}

impl RectanglePolicy {
    /// Solid corner markers used for perspective correction.
    pub fn marker() -> Self {
        Self {
            min_width: 40.0,
            min_height: 40.0,
            brightness: BrightnessRule::Below { threshold: 100.0 },
            x_window: Window::UNBOUNDED,
            y_window: Window::UNBOUNDED,
            margin: 0.0,
        }
    }

    /// Looser policy for auxiliary printed boxes, restricted to a window and
    /// grown by 15px to cover under-detected borders.
    pub fn auxiliary(x_window: Window, y_window: Window) -> Self {
        Self {
            min_width: 50.0,
            min_height: 50.0,
            brightness: BrightnessRule::Below { threshold: 200.0 },
            x_window,
            y_window,
            margin: 15.0,
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        if !(self.min_width >= 0.0 && self.min_height >= 0.0) {
            return Err(FemidaError::Config(format!(
                "{name}: minimum extents must be non-negative"
            )));
        }
        if !(self.margin >= 0.0) {
            return Err(FemidaError::Config(format!(
                "{name}: margin must be non-negative"
            )));
        }
        let in_range = |v: f64| (0.0..=255.0).contains(&v);
        let ok = match self.brightness {
            BrightnessRule::Below { threshold } => in_range(threshold),
            BrightnessRule::OutsideWindow { low, high } => {
                in_range(low) && in_range(high) && low <= high
            }
        };
        if !ok {
            return Err(FemidaError::Config(format!(
                "{name}: brightness thresholds must lie in 0..=255"
            )));
        }
        Ok(())
    }
}

impl Default for RectanglePolicy {
    fn default() -> Self {
        Self::marker()
    }
}

/// Tunable detection settings. The defaults reproduce the calibrated sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Policy used to find the four corner markers.
    pub marker: RectanglePolicy,
    /// Policy used for the experimental bottom-strip box search on a
    /// rectified sheet.
    pub auxiliary: RectanglePolicy,
    /// Anchor triangles smaller than this fraction of the destination canvas
    /// area are treated as collinear.
    pub degenerate_area_ratio: f64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            marker: RectanglePolicy::marker(),
            auxiliary: RectanglePolicy::auxiliary(Window::UNBOUNDED, Window::above(3000.0)),
            degenerate_area_ratio: 1e-6,
        }
    }
}

impl DetectConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.marker.validate("marker")?;
        self.auxiliary.validate("auxiliary")?;
        if !(self.degenerate_area_ratio > 0.0 && self.degenerate_area_ratio < 1.0) {
            return Err(FemidaError::Config(
                "degenerate_area_ratio must lie in (0, 1)".into(),
            ));
        }
        Ok(())
    }
}
