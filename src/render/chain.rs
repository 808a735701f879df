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
use super::{Controls, Voice};
use crate::dsp::{Biquad, Chain, FilterKind, Gain, Panner, Stage};

/// The stages shared by every voice.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainParams {
    /// Master gain, already multiplied by the velocity.
    pub gain: f64,
    /// (frequency, Q)
    pub lowpass: Option<(f64, f64)>,
    pub highpass: Option<(f64, f64)>,
    pub bandpass: Option<(f64, f64)>,
    /// Pan in [0, 1].
    pub pan: Option<f64>,
}

impl ChainParams {
    pub fn from_controls(controls: &Controls, velocity: f64) -> ChainParams {
        ChainParams {
            gain: controls.gain * velocity,
            lowpass: controls.cutoff.map(|f| (f, controls.resonance)),
            highpass: controls.hcutoff.map(|f| (f, controls.hresonance)),
            bandpass: controls.bandf.map(|f| (f, controls.bandq)),
            pan: controls.pan,
        }
    }
}

/// Wires a voice into a chain: the voice's own stages, then lowpass,
/// highpass, bandpass, panner and master gain. Absent stages are skipped.
pub fn assemble(voice: Voice, params: &ChainParams, sample_rate: u32) -> Chain {
    let Voice { source, mut stages } = voice;

    let filters = [
        (FilterKind::Lowpass, params.lowpass),
        (FilterKind::Highpass, params.highpass),
        (FilterKind::Bandpass, params.bandpass),
    ];
    for (kind, settings) in filters {
        if let Some((frequency, q)) = settings {
            stages.push(Stage::Filter(Biquad::new(kind, frequency, q, sample_rate)));
        }
    }

    if let Some(pan) = params.pan {
        stages.push(Stage::Panner(Panner::new((2.0 * pan - 1.0) as f32)));
    }

    stages.push(Stage::Gain(Gain::fixed(params.gain as f32)));
    Chain::new(source, stages)
}
