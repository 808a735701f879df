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

//! Sample banks and sample selection.
//!
//! A bank is either an ordered list of URLs, chosen by index, or a map from
//! note names to URL lists, chosen by the note nearest to the one requested.

pub mod loader;

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::pitch;
use crate::render::RenderError;

/// The samples recorded for one key of a note-selected bank.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum NoteSamples {
    Urls(Vec<String>),
    Url(String),
    /// Anything else. Only tolerated on underscore keys.
    Other(serde_json::Value),
}

/// A named collection of sample URLs.
#[derive(Clone, Debug, PartialEq)]
pub enum SampleBank {
    /// Selected by index.
    Indexed(Vec<String>),
    /// Selected by nearest note, in the order the keys were written.
    Pitched(Vec<(String, NoteSamples)>),
    /// Neither of the above. Kept so selection can report it.
    Malformed(String),
}

impl SampleBank {
    /// Creates a note-selected bank from (note, urls) pairs.
    pub fn pitched<K, U>(entries: impl IntoIterator<Item = (K, U)>) -> SampleBank
    where
        K: Into<String>,
        U: IntoIterator,
        U::Item: Into<String>,
    {
        SampleBank::Pitched(
            entries
                .into_iter()
                .map(|(key, urls)| {
                    let urls = urls.into_iter().map(Into::into).collect();
                    (key.into(), NoteSamples::Urls(urls))
                })
                .collect(),
        )
    }

    /// Creates an index-selected bank.
    pub fn indexed<U: Into<String>>(urls: impl IntoIterator<Item = U>) -> SampleBank {
        SampleBank::Indexed(urls.into_iter().map(Into::into).collect())
    }
}

struct SampleBankVisitor;

impl<'de> Visitor<'de> for SampleBankVisitor {
    type Value = SampleBank;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a list of sample URLs or a map of note names to sample URLs")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<SampleBank, A::Error> {
        let mut urls = Vec::new();
        while let Some(url) = seq.next_element::<String>()? {
            urls.push(url);
        }
        Ok(SampleBank::Indexed(urls))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SampleBank, A::Error> {
        let mut entries = Vec::new();
        while let Some((key, samples)) = map.next_entry::<String, NoteSamples>()? {
            entries.push((key, samples));
        }
        Ok(SampleBank::Pitched(entries))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<SampleBank, E> {
        Ok(SampleBank::Malformed(format!("string \"{}\"", v)))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<SampleBank, E> {
        self.visit_str(&v)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<SampleBank, E> {
        Ok(SampleBank::Malformed(format!("boolean {}", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<SampleBank, E> {
        Ok(SampleBank::Malformed(format!("number {}", v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<SampleBank, E> {
        Ok(SampleBank::Malformed(format!("number {}", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<SampleBank, E> {
        Ok(SampleBank::Malformed(format!("number {}", v)))
    }

    fn visit_unit<E: de::Error>(self) -> Result<SampleBank, E> {
        Ok(SampleBank::Malformed("empty value".to_string()))
    }

    fn visit_none<E: de::Error>(self) -> Result<SampleBank, E> {
        self.visit_unit()
    }
}

impl<'de> Deserialize<'de> for SampleBank {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(SampleBankVisitor)
    }
}

/// The loaded sample banks, by name.
#[derive(Clone, Debug, Default)]
pub struct SampleRegistry {
    banks: HashMap<String, SampleBank>,
}

impl SampleRegistry {
    pub fn new() -> SampleRegistry {
        SampleRegistry::default()
    }

    /// Adds or replaces a bank.
    pub fn insert(&mut self, name: impl Into<String>, bank: SampleBank) {
        self.banks.insert(name.into(), bank);
    }

    pub fn get(&self, name: &str) -> Option<&SampleBank> {
        self.banks.get(name)
    }

    /// Bank names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.banks.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn banks(&self) -> &HashMap<String, SampleBank> {
        &self.banks
    }

    pub fn len(&self) -> usize {
        self.banks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.banks.is_empty()
    }
}

impl FromIterator<(String, SampleBank)> for SampleRegistry {
    fn from_iter<T: IntoIterator<Item = (String, SampleBank)>>(iter: T) -> Self {
        SampleRegistry {
            banks: iter.into_iter().collect(),
        }
    }
}

/// Splits a compound "name:index" into its parts.
///
/// Returns `None` if there's no colon, or the part after it isn't a number.
pub fn split_compound(name: &str) -> Option<(&str, f64)> {
    let mut parts = name.split(':');
    let (base, suffix) = (parts.next()?, parts.next()?.trim());
    match suffix.parse::<f64>() {
        Ok(parsed) if !suffix.is_empty() && parsed.is_finite() => Some((base, parsed)),
        _ => None,
    }
}

/// The result of sample selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub url: String,
    /// Semitones to repitch by.
    pub transpose: f64,
    /// Whether the bank was index-selected.
    pub indexed: bool,
}

impl Selection {
    /// Playback rate for the transposition.
    pub fn rate(&self) -> f64 {
        pitch::playback_rate(self.transpose)
    }
}

/// Wraps a (possibly fractional or negative) index into a list.
fn wrap_index(index: f64, len: usize) -> usize {
    (index.floor() as i64).rem_euclid(len as i64) as usize
}

/// Picks a sample URL from a bank.
///
/// Index-selected banks pick `bank[index mod len]` and never transpose.
/// Note-selected banks pick the key nearest to the note, the first such key
/// winning ties, and transpose by the distance from it.
pub fn select_sample(
    registry: &SampleRegistry,
    name: &str,
    index: f64,
    note: Option<&pitch::NoteValue>,
) -> Result<Selection, RenderError> {
    let bank = registry
        .get(name)
        .ok_or_else(|| RenderError::SampleNotFound {
            name: name.to_string(),
            available: registry.names(),
        })?;

    let invalid = |reason: &str| RenderError::InvalidBankFormat {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    match bank {
        SampleBank::Indexed(urls) => {
            if urls.is_empty() {
                return Err(invalid("no samples"));
            }
            Ok(Selection {
                url: urls[wrap_index(index, urls.len())].clone(),
                transpose: 0.0,
                indexed: true,
            })
        }
        SampleBank::Pitched(entries) => {
            let note = note.ok_or_else(|| RenderError::MissingNote(name.to_string()))?;
            let note_midi = note.to_midi()?;

            let mut closest: Option<(&NoteSamples, f64)> = None;
            for (key, samples) in entries.iter().filter(|(key, _)| !key.starts_with('_')) {
                let key_midi = pitch::to_midi(key)
                    .map_err(|_| invalid(&format!("key {} is not a note", key)))?;
                let diff = f64::from(key_midi) - note_midi;
                if closest.map_or(true, |(_, best)| diff.abs() < best.abs()) {
                    closest = Some((samples, diff));
                }
            }

            let (samples, diff) = closest.ok_or_else(|| invalid("no note keys"))?;
            let urls: Vec<&String> = match samples {
                NoteSamples::Urls(urls) => urls.iter().collect(),
                NoteSamples::Url(url) => vec![url],
                NoteSamples::Other(_) => return Err(invalid("note samples are not URLs")),
            };
            if urls.is_empty() {
                return Err(invalid("no samples"));
            }

            Ok(Selection {
                url: urls[wrap_index(index, urls.len())].clone(),
                transpose: -diff,
                indexed: false,
            })
        }
        SampleBank::Malformed(reason) => Err(invalid(reason)),
    }
}
