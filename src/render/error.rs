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
use std::error::Error;

use crate::pitch::{NoteError, NoteValue};
use crate::samples::loader::LoadError;

/// Everything that can end a single event without sounding.
///
/// None of these are fatal. The renderer logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("bank {0} is selected by note, but the event has no note")]
    MissingNote(String),

    #[error("sound {name} not found, available: {}", available.join(", "))]
    SampleNotFound { name: String, available: Vec<String> },

    #[error("bank {name} is neither a list nor a note map: {reason}")]
    InvalidBankFormat { name: String, reason: String },

    #[error("failed to resolve instrument {key}: {source}")]
    InstrumentResolution {
        key: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("failed to load {url}: {source}")]
    BufferLoad {
        url: String,
        #[source]
        source: LoadError,
    },

    #[error("sound {sound}:{index} is still loading")]
    DeadlineMissed { sound: String, index: NoteValue },

    #[error("no sound specified")]
    NoSoundSpecified,

    #[error("speed is zero")]
    ZeroSpeed,

    #[error("malformed event value: {0}")]
    MalformedValue(String),

    #[error(transparent)]
    InvalidNote(#[from] NoteError),

    #[error("invalid tempo: {0} cycles per second")]
    InvalidTempo(f64),

    #[error("audio destination disconnected")]
    Disconnected,
}

impl RenderError {
    /// Whether this is an expected, silent skip rather than a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, RenderError::ZeroSpeed)
    }
}
