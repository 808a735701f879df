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
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::audio::Audio;
use super::instruments::Instruments;
use crate::pitch::Transposition;

/// The configuration for the player.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Player {
    /// The audio output.
    #[serde(default)]
    audio: Audio,
    /// The sample bank file, relative to the player configuration.
    samples: Option<String>,
    /// How index-selected banks are repitched by notes.
    #[serde(default)]
    transpose: Transposition,
    /// Instruments built from recordings.
    instruments: Option<Instruments>,
}

impl Player {
    pub fn new(audio: Audio) -> Player {
        Player {
            audio,
            samples: None,
            transpose: Transposition::default(),
            instruments: None,
        }
    }

    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    pub fn transpose(&self) -> Transposition {
        self.transpose
    }

    pub fn instruments(&self) -> Option<&Instruments> {
        self.instruments.as_ref()
    }

    /// Returns the sample bank file, resolved against the directory holding
    /// the player configuration.
    pub fn samples(&self, config_path: &Path) -> Option<PathBuf> {
        self.samples.as_ref().map(|samples| {
            config_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(samples)
        })
    }
}
