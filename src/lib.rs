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

//! Renders pattern events ("haps") as sound.
//!
//! Each hap becomes either a synthesized tone or a sample voice, shaped by an
//! envelope, optional filters and panning, and scheduled against a shared
//! audio clock. Failures are isolated per event: a bad hap is logged and
//! dropped without disturbing the haps around it.

pub mod audio;
pub mod config;
pub mod dsp;
pub mod hap;
pub mod instruments;
pub mod pitch;
pub mod render;
pub mod samples;
pub mod scheduler;

#[cfg(test)]
mod testutil;
