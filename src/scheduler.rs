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

//! Drives haps into an output ahead of time.
//!
//! The scheduler wakes up every tick, asks its source for the haps starting
//! before the next tick, and triggers them with their onsets pushed back by
//! the latency. Rendering then has until the onset to load whatever it needs.

use std::{sync::Arc, time::Duration};

use serde::Deserialize;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, span, Instrument, Level};

use crate::hap::Hap;
use crate::render::{Output, Trigger};

/// Default time between queries.
const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Default time between triggering a hap and its onset.
const DEFAULT_LATENCY: Duration = Duration::from_millis(100);

/// Something that produces haps for a span of cycles.
pub trait HapSource: Send + Sync {
    /// Returns the haps whose onsets lie in [begin, end), in onset order.
    fn query(&self, begin: f64, end: f64) -> Vec<Hap>;
}

fn default_cycles() -> f64 {
    1.0
}

/// A fixed list of haps repeated forever.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Sequence {
    /// Cycles per second.
    pub cps: f64,
    /// Length of the loop in cycles. Haps should start within it.
    #[serde(default = "default_cycles")]
    pub cycles: f64,
    #[serde(default)]
    pub haps: Vec<Hap>,
}

impl HapSource for Sequence {
    fn query(&self, begin: f64, end: f64) -> Vec<Hap> {
        if !self.cycles.is_finite() || self.cycles <= 0.0 || end <= begin {
            return vec![];
        }

        let first = (begin / self.cycles).floor() as i64;
        let last = (end / self.cycles).ceil() as i64;
        let mut haps: Vec<Hap> = (first..=last)
            .flat_map(|repeat| {
                let offset = repeat as f64 * self.cycles;
                self.haps.iter().map(move |hap| hap.at(offset + hap.begin))
            })
            .filter(|hap| hap.begin >= begin && hap.begin < end)
            .collect();
        haps.sort_by(|a, b| a.begin.total_cmp(&b.begin));
        haps
    }
}

/// Queries a hap source on a timer and triggers what it returns.
pub struct Scheduler {
    source: Arc<dyn HapSource>,
    output: Arc<dyn Output>,
    cps: f64,
    latency: Duration,
    tick: Duration,
}

impl Scheduler {
    pub fn new(source: Arc<dyn HapSource>, output: Arc<dyn Output>, cps: f64) -> Scheduler {
        Scheduler {
            source,
            output,
            cps,
            latency: DEFAULT_LATENCY,
            tick: DEFAULT_TICK,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Scheduler {
        self.latency = latency;
        self
    }

    pub fn with_tick(mut self, tick: Duration) -> Scheduler {
        self.tick = tick;
        self
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    /// Builds the triggers for the haps starting in [from, to) cycles.
    /// `reference` is the scheduler's current time in seconds.
    pub fn plan(&self, from: f64, to: f64, reference: f64) -> Vec<Trigger> {
        let latency = self.latency.as_secs_f64();
        self.source
            .query(from, to)
            .into_iter()
            .map(|hap| Trigger {
                onset: hap.begin / self.cps + latency,
                reference,
                cps: self.cps,
                hap,
            })
            .collect()
    }

    /// Runs until the given number of cycles has been triggered and reached,
    /// or forever if no limit is given.
    pub async fn run(&self, cycles: Option<f64>) {
        let span = span!(Level::INFO, "scheduler");

        async move {
            info!(cps = self.cps, cycles = ?cycles, "Scheduler started");

            let start = Instant::now();
            let tick = self.tick.as_secs_f64();
            let mut interval = tokio::time::interval(self.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut queried = 0.0;
            loop {
                interval.tick().await;

                let now = start.elapsed().as_secs_f64();
                let horizon = (now + tick) * self.cps;
                let to = cycles.map_or(horizon, |cycles| horizon.min(cycles));
                if to > queried {
                    let triggers = self.plan(queried, to, now);
                    debug!(from = queried, to, haps = triggers.len(), "Queried haps");
                    for trigger in triggers {
                        self.output.trigger(trigger);
                    }
                    queried = to;
                }

                if cycles.is_some_and(|cycles| queried >= cycles) {
                    break;
                }
            }

            // Wait for the last onsets to come around.
            if let Some(cycles) = cycles {
                let end = cycles / self.cps + self.latency.as_secs_f64();
                if let Ok(remaining) = Duration::try_from_secs_f64(end - start.elapsed().as_secs_f64())
                {
                    tokio::time::sleep(remaining).await;
                }
            }

            info!("Scheduler finished");
        }
        .instrument(span)
        .await
    }
}
