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
use std::sync::Arc;

use serde::Deserialize;

use crate::instruments::{Font, FontResolver};
use crate::samples::loader::BufferLoader;

/// Instruments that sound names resolve to before sample banks.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Instruments {
    /// General MIDI program names in program order.
    #[serde(default)]
    names: Vec<String>,
    /// Recordings by instrument key. URLs are relative to the player
    /// configuration.
    #[serde(default)]
    fonts: HashMap<String, Font>,
}

impl Instruments {
    /// Builds a resolver that loads recordings through the given loader.
    pub fn resolver(&self, loader: Arc<dyn BufferLoader>) -> FontResolver {
        FontResolver::new(self.fonts.clone(), self.names.clone(), loader)
    }
}
