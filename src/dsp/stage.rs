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
use std::f64::consts::{FRAC_PI_2, TAU};

use super::{Frame, Param};

/// Multiplies the signal by an automated level.
#[derive(Debug, Clone, PartialEq)]
pub struct Gain {
    pub level: Param,
}

impl Gain {
    pub fn new(level: Param) -> Gain {
        Gain { level }
    }

    /// A gain stage holding a constant level.
    pub fn fixed(level: f32) -> Gain {
        Gain {
            level: Param::new(level),
        }
    }
}

/// Biquad filter responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Lowpass,
    Highpass,
    Bandpass,
}

/// Minimum Q, to keep the coefficients finite.
const MIN_Q: f64 = 0.0001;

/// A second order IIR filter using the RBJ cookbook coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct Biquad {
    kind: FilterKind,
    frequency: f64,
    q: f64,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    /// Per channel: x[n-1], x[n-2], y[n-1], y[n-2].
    state: [[f32; 4]; 2],
}

impl Biquad {
    pub fn new(kind: FilterKind, frequency: f64, q: f64, sample_rate: u32) -> Biquad {
        let sample_rate = f64::from(sample_rate.max(1));
        let nyquist = sample_rate / 2.0;
        let frequency = frequency.clamp(1.0, nyquist * 0.999);
        let q = q.max(MIN_Q);

        let w0 = TAU * frequency / sample_rate;
        let (sin, cos) = w0.sin_cos();
        let alpha = sin / (2.0 * q);

        let (b0, b1, b2) = match kind {
            FilterKind::Lowpass => ((1.0 - cos) / 2.0, 1.0 - cos, (1.0 - cos) / 2.0),
            FilterKind::Highpass => ((1.0 + cos) / 2.0, -(1.0 + cos), (1.0 + cos) / 2.0),
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos;
        let a2 = 1.0 - alpha;

        Biquad {
            kind,
            frequency,
            q,
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
            state: [[0.0; 4]; 2],
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    pub fn q(&self) -> f64 {
        self.q
    }

    fn process(&mut self, frame: Frame) -> Frame {
        let mut out = [0.0; 2];
        for (channel, input) in frame.into_iter().enumerate() {
            let [x1, x2, y1, y2] = self.state[channel];
            let y = self.b0 * input + self.b1 * x1 + self.b2 * x2 - self.a1 * y1 - self.a2 * y2;
            self.state[channel] = [input, x1, y, y1];
            out[channel] = y;
        }
        out
    }
}

/// Equal power stereo panner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panner {
    /// -1 is hard left, 1 is hard right.
    pub pan: f32,
}

impl Panner {
    pub fn new(pan: f32) -> Panner {
        Panner {
            pan: pan.clamp(-1.0, 1.0),
        }
    }

    fn process(&self, [left, right]: Frame, mono: bool) -> Frame {
        let pan = f64::from(self.pan);

        if mono {
            let x = (pan + 1.0) / 2.0;
            let (gain_r, gain_l) = (x * FRAC_PI_2).sin_cos();
            return [left * gain_l as f32, left * gain_r as f32];
        }

        let x = if pan <= 0.0 { pan + 1.0 } else { pan };
        let (gain_r, gain_l) = (x * FRAC_PI_2).sin_cos();
        let (gain_l, gain_r) = (gain_l as f32, gain_r as f32);
        if pan <= 0.0 {
            [left + right * gain_l, right * gain_r]
        } else {
            [left * gain_l, right + left * gain_r]
        }
    }
}

/// The kind of a stage, used to inspect a chain's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Gain,
    Lowpass,
    Highpass,
    Bandpass,
    Panner,
}

/// One processing stage in a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Gain(Gain),
    Filter(Biquad),
    Panner(Panner),
}

impl Stage {
    /// Processes one frame at an absolute time.
    pub fn process(&mut self, frame: Frame, time: f64, mono: bool) -> Frame {
        match self {
            Stage::Gain(gain) => {
                let level = gain.level.value_at(time);
                [frame[0] * level, frame[1] * level]
            }
            Stage::Filter(filter) => filter.process(frame),
            Stage::Panner(panner) => panner.process(frame, mono),
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Stage::Gain(_) => StageKind::Gain,
            Stage::Filter(filter) => match filter.kind() {
                FilterKind::Lowpass => StageKind::Lowpass,
                FilterKind::Highpass => StageKind::Highpass,
                FilterKind::Bandpass => StageKind::Bandpass,
            },
            Stage::Panner(_) => StageKind::Panner,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(filter: &mut Biquad, input: f32, frames: usize) -> f32 {
        let mut out = [0.0; 2];
        for _ in 0..frames {
            out = filter.process([input, input]);
        }
        out[0]
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = Biquad::new(FilterKind::Lowpass, 1000.0, 1.0, 44100);
        assert!((settle(&mut filter, 1.0, 4096) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let mut filter = Biquad::new(FilterKind::Highpass, 1000.0, 1.0, 44100);
        assert!(settle(&mut filter, 1.0, 4096).abs() < 1e-3);
    }

    #[test]
    fn test_bandpass_blocks_dc() {
        let mut filter = Biquad::new(FilterKind::Bandpass, 1000.0, 1.0, 44100);
        assert!(settle(&mut filter, 1.0, 4096).abs() < 1e-3);
    }

    #[test]
    fn test_filter_clamps() {
        let filter = Biquad::new(FilterKind::Lowpass, 100_000.0, 0.0, 44100);
        assert!(filter.frequency() < 22050.0);
        assert_eq!(filter.q(), MIN_Q);
    }

    #[test]
    fn test_mono_panner() {
        let center = Panner::new(0.0).process([1.0, 1.0], true);
        assert!((center[0] - center[1]).abs() < 1e-6);
        assert!((center[0] - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);

        let left = Panner::new(-1.0).process([1.0, 1.0], true);
        assert!((left[0] - 1.0).abs() < 1e-6);
        assert!(left[1].abs() < 1e-6);

        let right = Panner::new(1.0).process([1.0, 1.0], true);
        assert!(right[0].abs() < 1e-6);
        assert!((right[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_panner() {
        let center = Panner::new(0.0).process([0.5, 0.25], false);
        assert!((center[0] - 0.5).abs() < 1e-6);
        assert!((center[1] - 0.25).abs() < 1e-6);

        let left = Panner::new(-1.0).process([0.5, 0.25], false);
        assert!((left[0] - 0.75).abs() < 1e-6);
        assert!(left[1].abs() < 1e-6);
    }

    #[test]
    fn test_gain_stage_follows_param() {
        let mut level = Param::new(1.0);
        level.set_value_at_time(0.5, 1.0);
        let mut stage = Stage::Gain(Gain::new(level));

        assert_eq!(stage.process([1.0, -1.0], 0.0, false), [1.0, -1.0]);
        assert_eq!(stage.process([1.0, -1.0], 1.0, false), [0.5, -0.5]);
        assert_eq!(stage.kind(), StageKind::Gain);
    }
}
