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

use config::{Config, File};
use tracing::info;

use crate::samples::SampleRegistry;
use crate::scheduler::Sequence;

mod audio;
mod error;
mod instruments;
mod player;
mod samples;

pub use self::audio::Audio;
pub use self::error::ConfigError;
pub use self::instruments::Instruments;
pub use self::player::Player;
pub use self::samples::Samples;

/// Sample banks loaded from a bank file.
pub struct LoadedSamples {
    pub registry: SampleRegistry,
    /// Directory that relative sample URLs are resolved against.
    pub base_path: PathBuf,
}

/// Parses the player configuration from a YAML file.
pub fn load_player(path: &Path) -> Result<Player, ConfigError> {
    Ok(Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize::<Player>()?)
}

/// Parses a sample bank file.
pub fn load_samples(path: &Path) -> Result<LoadedSamples, ConfigError> {
    let samples = Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize::<Samples>()?;

    let directory = path.parent().unwrap_or_else(|| Path::new(""));
    let base_path = match samples.base_path() {
        Some(base_path) => directory.join(base_path),
        None => directory.to_path_buf(),
    };

    let registry = samples.registry();
    info!(
        path = ?path,
        banks = registry.len(),
        base_path = ?base_path,
        "Loaded sample banks"
    );

    Ok(LoadedSamples {
        registry,
        base_path,
    })
}

/// Parses a hap sequence from a YAML file.
pub fn load_sequence(path: &Path) -> Result<Sequence, ConfigError> {
    let sequence = Config::builder()
        .add_source(File::from(path))
        .build()?
        .try_deserialize::<Sequence>()?;

    if sequence.cps.is_nan() || sequence.cps <= 0.0 {
        return Err(ConfigError::InvalidTempo(sequence.cps));
    }
    Ok(sequence)
}
