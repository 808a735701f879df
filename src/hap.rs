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
use serde_json::Value;

/// A single event produced by a pattern.
///
/// The value is kept as an untyped mapping of control names to values. It is
/// interpreted once, when the hap reaches the renderer.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Hap {
    /// Onset of the hap, in cycles.
    pub begin: f64,
    /// Length of the hap, in cycles.
    pub duration: f64,
    /// The control parameters (s, n, note, gain, ...).
    #[serde(default)]
    pub value: Value,
    /// Side-channel data attached by the pattern.
    #[serde(default)]
    pub context: HapContext,
}

/// Side-channel data carried alongside a hap's value.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct HapContext {
    /// Velocity, multiplied into the hap's gain. Defaults to 1.
    pub velocity: Option<f64>,
}

impl Hap {
    /// Creates a hap with the given onset, duration and value.
    pub fn new(begin: f64, duration: f64, value: Value) -> Hap {
        Hap {
            begin,
            duration,
            value,
            context: HapContext::default(),
        }
    }

    /// Returns a copy of this hap with the given context velocity.
    pub fn with_velocity(mut self, velocity: f64) -> Hap {
        self.context.velocity = Some(velocity);
        self
    }

    /// Returns a copy of this hap moved to a new onset.
    pub fn at(&self, begin: f64) -> Hap {
        Hap {
            begin,
            ..self.clone()
        }
    }

    /// The context velocity, defaulting to 1.
    pub fn velocity(&self) -> f64 {
        self.context.velocity.unwrap_or(1.0)
    }
}
