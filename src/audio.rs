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
use std::{error::Error, fmt, sync::Arc};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::config;
use crate::dsp::Chain;
use crate::render::RenderError;

pub mod cpal;
pub mod mixer;
pub mod mock;
mod thread_priority;

/// The audio clock that every event is scheduled against.
pub trait Clock: fmt::Display + Send + Sync {
    /// Current time in seconds. Monotonic, relative to when the device started.
    fn now(&self) -> f64;

    /// The device's sample rate.
    fn sample_rate(&self) -> u32;

    /// The sink that chains are connected to.
    fn destination(&self) -> &Destination;
}

/// The device output. Connected chains play until they finish.
#[derive(Clone, Debug)]
pub struct Destination {
    tx: crossbeam_channel::Sender<Chain>,
}

impl Destination {
    /// Creates a destination and the receiving end a mixer reads from.
    pub fn new() -> (Destination, crossbeam_channel::Receiver<Chain>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Destination { tx }, rx)
    }

    /// Hands a chain to the device.
    pub fn connect(&self, chain: Chain) -> Result<(), RenderError> {
        self.tx.send(chain).map_err(|_| RenderError::Disconnected)
    }
}

/// The process-wide clock, created on first use and never torn down.
static CLOCK: Mutex<Option<Arc<dyn Clock>>> = parking_lot::const_mutex(None);

/// Gets the process-wide clock, opening the device described by the
/// configuration the first time. Later calls return the same clock and
/// ignore the configuration.
pub fn get_clock(config: &config::Audio) -> Result<Arc<dyn Clock>, Box<dyn Error>> {
    let mut clock = CLOCK.lock();
    if let Some(clock) = clock.as_ref() {
        debug!(clock = %clock, "Reusing audio clock");
        return Ok(clock.clone());
    }

    let device = config.device();
    let created: Arc<dyn Clock> = if device.starts_with("mock") {
        Arc::new(mock::Clock::get(device, config.sample_rate()))
    } else {
        Arc::new(cpal::Clock::open(config)?)
    };

    info!(clock = %created, "Opened audio clock");
    *clock = Some(created.clone());
    Ok(created)
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::list_devices()
}
