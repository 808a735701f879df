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

//! Per-sample rendering primitives.
//!
//! This module provides:
//! - Automated parameters with sample-accurate linear ramps
//! - Oscillator and buffer playback sources
//! - Gain, biquad filter and stereo panner stages
//! - Chains that wire one source through its stages

mod chain;
mod param;
mod source;
mod stage;

pub use chain::Chain;
pub use param::Param;
pub use source::{AudioBuffer, BufferSource, Oscillator, Source, Waveform};
pub use stage::{Biquad, FilterKind, Gain, Panner, Stage, StageKind};

/// One stereo frame: left, right.
pub type Frame = [f32; 2];
