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
use std::{f64::consts::TAU, fmt, sync::Arc};

use super::Frame;

/// Oscillator wave shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Parses a sound name into a waveform.
    pub fn from_name(name: &str) -> Option<Waveform> {
        match name {
            "sine" => Some(Waveform::Sine),
            "square" => Some(Waveform::Square),
            "triangle" => Some(Waveform::Triangle),
            "sawtooth" => Some(Waveform::Sawtooth),
            _ => None,
        }
    }

    /// The waveform value at a phase in [0, 1). Every shape starts at zero
    /// (or its rising edge) and peaks at 1.
    fn sample(&self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 1.0 - 4.0 * ((phase + 0.25).fract() - 0.5).abs(),
            Waveform::Sawtooth => 2.0 * (phase + 0.5).fract() - 1.0,
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Triangle => "triangle",
            Waveform::Sawtooth => "sawtooth",
        };
        write!(f, "{}", name)
    }
}

/// A periodic tone generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f64,
    pub start: f64,
    pub stop: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, start: f64, stop: f64) -> Oscillator {
        Oscillator {
            waveform,
            frequency,
            start,
            stop,
        }
    }

    fn value_at(&self, time: f64) -> f32 {
        if time < self.start || time >= self.stop {
            return 0.0;
        }
        let phase = (self.frequency * (time - self.start)).rem_euclid(1.0);
        self.waveform.sample(phase) as f32
    }
}

/// Decoded audio held in memory, interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    data: Arc<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Creates a buffer from interleaved samples.
    pub fn new(data: Vec<f32>, channels: u16, sample_rate: u32) -> AudioBuffer {
        AudioBuffer {
            data: Arc::new(data),
            channels: channels.max(1),
            sample_rate,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// The interleaved samples.
    pub fn samples(&self) -> &[f32] {
        &self.data
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    /// Natural duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// The stereo frame at an integer position. Mono is copied to both sides,
    /// anything beyond two channels is ignored.
    fn frame(&self, index: usize) -> Frame {
        let channels = self.channels as usize;
        let base = index * channels;
        match self.data.get(base..base + channels) {
            Some([mono]) => [*mono, *mono],
            Some([left, right, ..]) => [*left, *right],
            _ => [0.0, 0.0],
        }
    }
}

/// Plays a region of an [AudioBuffer] at a playback rate.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferSource {
    pub buffer: AudioBuffer,
    pub playback_rate: f64,
    /// Position in the buffer, in seconds, where playback begins.
    pub offset: f64,
    pub start: f64,
    pub stop: f64,
}

impl BufferSource {
    pub fn new(
        buffer: AudioBuffer,
        playback_rate: f64,
        offset: f64,
        start: f64,
        stop: f64,
    ) -> BufferSource {
        BufferSource {
            buffer,
            playback_rate,
            offset,
            start,
            stop,
        }
    }

    fn frame_at(&self, time: f64) -> Frame {
        if time < self.start || time >= self.stop {
            return [0.0, 0.0];
        }

        let position = (self.offset + (time - self.start) * self.playback_rate)
            * f64::from(self.buffer.sample_rate());
        if position < 0.0 {
            return [0.0, 0.0];
        }

        let index = position.floor() as usize;
        if index >= self.buffer.frames() {
            return [0.0, 0.0];
        }

        let fraction = (position - position.floor()) as f32;
        let current = self.buffer.frame(index);
        let next = self.buffer.frame(index + 1);
        [
            current[0] + (next[0] - current[0]) * fraction,
            current[1] + (next[1] - current[1]) * fraction,
        ]
    }
}

/// The single source at the head of a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Oscillator(Oscillator),
    Buffer(BufferSource),
}

impl Source {
    /// Renders one frame at an absolute time.
    pub fn frame_at(&self, time: f64) -> Frame {
        match self {
            Source::Oscillator(oscillator) => {
                let value = oscillator.value_at(time);
                [value, value]
            }
            Source::Buffer(buffer) => buffer.frame_at(time),
        }
    }

    /// Whether the source has a single channel. Affects panning.
    pub fn is_mono(&self) -> bool {
        match self {
            Source::Oscillator(_) => true,
            Source::Buffer(buffer) => buffer.buffer.channels() == 1,
        }
    }

    pub fn start(&self) -> f64 {
        match self {
            Source::Oscillator(oscillator) => oscillator.start,
            Source::Buffer(buffer) => buffer.start,
        }
    }

    pub fn stop(&self) -> f64 {
        match self {
            Source::Oscillator(oscillator) => oscillator.stop,
            Source::Buffer(buffer) => buffer.stop,
        }
    }
}
