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
use std::time::Duration;

use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CHANNELS: u16 = 2;
const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Audio {
    /// The audio device. "default" picks the host's default output.
    #[serde(default = "default_device")]
    device: String,

    /// Preferred sample rate in Hz (default: 44100)
    sample_rate: Option<u32>,

    /// Preferred number of output channels (default: 2)
    channels: Option<u16>,

    /// How far ahead of the clock events are scheduled (default: 100ms)
    latency: Option<String>,
}

fn default_device() -> String {
    "default".to_string()
}

impl Default for Audio {
    fn default() -> Self {
        Audio::new(&default_device())
    }
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            sample_rate: None,
            channels: None,
            latency: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the preferred sample rate (default: 44100)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the preferred channel count (default: 2)
    pub fn channels(&self) -> u16 {
        self.channels.unwrap_or(DEFAULT_CHANNELS).max(1)
    }

    /// Returns the scheduling latency (default: 100ms)
    pub fn latency(&self) -> Result<Duration, ConfigError> {
        match &self.latency {
            Some(latency) => DurationString::from_string(latency.clone())
                .map(Duration::from)
                .map_err(|e| ConfigError::InvalidDuration {
                    value: latency.clone(),
                    reason: e.to_string(),
                }),
            None => Ok(DEFAULT_LATENCY),
        }
    }
}
