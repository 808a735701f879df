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
use std::collections::VecDeque;
use std::fmt;

use parking_lot::{Mutex, MutexGuard};

use super::Destination;
use crate::dsp::Chain;

/// The most chains a mock clock keeps. Older ones are dropped first.
pub const MAX_RECORDED: usize = 1024;

/// A mock clock. Doesn't play anything: time only moves when told to, and
/// connected chains are kept for inspection until they finish.
pub struct Clock {
    name: String,
    sample_rate: u32,
    now: Mutex<f64>,
    destination: Destination,
    connected: crossbeam_channel::Receiver<Chain>,
    recorded: Mutex<VecDeque<Chain>>,
}

impl Clock {
    /// Gets the given mock clock.
    pub fn get(name: &str, sample_rate: u32) -> Clock {
        let (destination, connected) = Destination::new();
        Clock {
            name: name.to_string(),
            sample_rate,
            now: Mutex::new(0.0),
            destination,
            connected,
            recorded: Mutex::new(VecDeque::new()),
        }
    }

    /// Moves the clock to the given time.
    pub fn set_now(&self, now: f64) {
        *self.now.lock() = now;
    }

    /// Moves the clock forward.
    pub fn advance(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }

    /// Returns the chains connected since the last call that haven't
    /// finished yet.
    pub fn take_scheduled(&self) -> Vec<Chain> {
        self.record().drain(..).collect()
    }

    /// Moves newly connected chains into the record, dropping finished ones
    /// and the oldest past [MAX_RECORDED].
    fn record(&self) -> MutexGuard<'_, VecDeque<Chain>> {
        let mut recorded = self.recorded.lock();
        recorded.extend(self.connected.try_iter());

        let now = *self.now.lock();
        recorded.retain(|chain| !chain.is_finished(now));
        let excess = recorded.len().saturating_sub(MAX_RECORDED);
        recorded.drain(..excess);
        recorded
    }
}

impl super::Clock for Clock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn destination(&self) -> &Destination {
        // Trimmed on every connect.
        drop(self.record());
        &self.destination
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
