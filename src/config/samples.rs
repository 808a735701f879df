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
use std::collections::HashMap;

use serde::Deserialize;

use crate::samples::{SampleBank, SampleRegistry};

/// A sample bank file.
#[derive(Deserialize, Clone, Debug)]
pub struct Samples {
    /// Prefix for relative sample URLs, relative to the bank file.
    base_path: Option<String>,
    /// The banks, by name.
    #[serde(default)]
    banks: HashMap<String, SampleBank>,
}

impl Samples {
    pub fn base_path(&self) -> Option<&str> {
        self.base_path.as_deref()
    }

    /// Builds the registry holding every bank in the file.
    pub fn registry(&self) -> SampleRegistry {
        self.banks
            .iter()
            .map(|(name, bank)| (name.clone(), bank.clone()))
            .collect()
    }
}
