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
// Core audio mixing logic that can be used by both CPAL and test implementations
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::dsp::Chain;

/// Mixes every connected chain into interleaved output, independent of any
/// audio backend.
pub struct AudioMixer {
    /// Chains currently playing or waiting for their start time.
    chains: Vec<Chain>,
    /// Newly connected chains.
    incoming: crossbeam_channel::Receiver<Chain>,
    /// Number of output channels
    num_channels: u16,
    /// Sample rate
    sample_rate: u32,
    /// Frames rendered so far. This is the clock.
    rendered_frames: Arc<AtomicU64>,
}

impl AudioMixer {
    /// Creates a new audio mixer
    pub fn new(
        incoming: crossbeam_channel::Receiver<Chain>,
        num_channels: u16,
        sample_rate: u32,
    ) -> Self {
        Self {
            chains: Vec::new(),
            incoming,
            num_channels: num_channels.max(1),
            sample_rate: sample_rate.max(1),
            rendered_frames: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared handle to the rendered frame counter.
    pub fn frame_counter(&self) -> Arc<AtomicU64> {
        self.rendered_frames.clone()
    }

    /// Seconds rendered so far.
    pub fn now(&self) -> f64 {
        self.rendered_frames.load(Ordering::Acquire) as f64 / f64::from(self.sample_rate)
    }

    /// Number of chains not yet finished.
    pub fn active(&self) -> usize {
        self.chains.len()
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mixes the next block of frames into the interleaved output buffer.
    pub fn process_into_output(&mut self, output: &mut [f32], num_frames: usize) {
        self.chains.extend(self.incoming.try_iter());

        let channels = self.num_channels as usize;
        let first_frame = self.rendered_frames.load(Ordering::Acquire);
        let rate = f64::from(self.sample_rate);
        output.fill(0.0);

        for (index, frame) in output.chunks_mut(channels).take(num_frames).enumerate() {
            let time = (first_frame + index as u64) as f64 / rate;

            let mut mixed = [0.0f32; 2];
            for chain in self.chains.iter_mut() {
                if time < chain.start() {
                    continue;
                }
                let [left, right] = chain.render(time);
                mixed[0] += left;
                mixed[1] += right;
            }

            if channels == 1 {
                frame[0] = (mixed[0] + mixed[1]) / 2.0;
            } else {
                frame[0] = mixed[0];
                frame[1] = mixed[1];
            }
        }

        let end = (first_frame + num_frames as u64) as f64 / rate;
        self.chains.retain(|chain| !chain.is_finished(end));
        self.rendered_frames
            .fetch_add(num_frames as u64, Ordering::AcqRel);
    }
}
