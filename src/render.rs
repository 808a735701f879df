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

//! Turns haps into scheduled chains.
//!
//! The flow for one hap is: read its controls, pick synthesis or sample
//! playback, build the voice, wrap it in the shared filter, pan and gain
//! stages, and connect the chain to the clock's destination.

mod chain;
mod controls;
mod envelope;
mod error;
mod trigger;
mod voice;

pub use chain::{assemble, ChainParams};
pub use controls::Controls;
pub use envelope::Envelope;
pub use error::RenderError;
pub use trigger::{Output, Renderer, Scheduled, Silent, Trigger};
pub use voice::{
    build_oscillator, build_sample, select_mode, Mode, ResolvedSource, Voice, HELD_LEVEL,
    HELD_RELEASE, OSCILLATOR_LEVEL,
};
