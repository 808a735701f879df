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

//! Note names, MIDI numbers, frequencies and transposition.

use std::fmt;

use serde::Deserialize;

/// The octave assumed when a note name doesn't give one.
pub const DEFAULT_OCTAVE: i32 = 3;

/// The MIDI note that index-selected banks play back unchanged (C2).
pub const ROOT_MIDI: f64 = 36.0;

/// Pitch class names used when formatting MIDI numbers.
const NOTE_NAMES: [&str; 12] = [
    "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b",
];

/// Errors from parsing note names.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NoteError {
    #[error("not a note: \"{0}\"")]
    NotANote(String),
}

/// A note given either as a MIDI number or as a name such as "c3" or "eb4".
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum NoteValue {
    Midi(f64),
    Name(String),
}

impl NoteValue {
    /// Converts the note to a (possibly fractional) MIDI number.
    pub fn to_midi(&self) -> Result<f64, NoteError> {
        match self {
            NoteValue::Midi(midi) => Ok(*midi),
            NoteValue::Name(name) => to_midi(name).map(f64::from),
        }
    }

    /// Converts the note to a frequency in Hz.
    pub fn to_frequency(&self) -> Result<f64, NoteError> {
        self.to_midi().map(from_midi)
    }
}

impl From<f64> for NoteValue {
    fn from(midi: f64) -> Self {
        NoteValue::Midi(midi)
    }
}

impl From<&str> for NoteValue {
    fn from(name: &str) -> Self {
        NoteValue::Name(name.to_string())
    }
}

impl fmt::Display for NoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteValue::Midi(midi) => write!(f, "{}", midi),
            NoteValue::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Parses a note name into a MIDI number.
///
/// A name is a pitch letter (a-g, any case), any number of accidentals (`#`
/// or `s` sharpen, `b` or `f` flatten) and an optional octave, which defaults
/// to 3. C3 is MIDI 48.
pub fn to_midi(note: &str) -> Result<i32, NoteError> {
    let not_a_note = || NoteError::NotANote(note.to_string());

    let mut chars = note.chars();
    let chroma = match chars.next().map(|c| c.to_ascii_lowercase()) {
        Some('c') => 0,
        Some('d') => 2,
        Some('e') => 4,
        Some('f') => 5,
        Some('g') => 7,
        Some('a') => 9,
        Some('b') => 11,
        _ => return Err(not_a_note()),
    };

    let rest = chars.as_str();
    let octave_start = rest
        .find(|c: char| !matches!(c, '#' | 'b' | 's' | 'f'))
        .unwrap_or(rest.len());
    let (accidentals, octave) = rest.split_at(octave_start);

    let offset: i32 = accidentals
        .chars()
        .map(|c| if matches!(c, '#' | 's') { 1 } else { -1 })
        .sum();

    let octave = if octave.is_empty() {
        DEFAULT_OCTAVE
    } else {
        let digits = octave.strip_prefix('-').unwrap_or(octave);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(not_a_note());
        }
        octave.parse::<i32>().map_err(|_| not_a_note())?
    };

    Ok((octave + 1) * 12 + chroma + offset)
}

/// Converts a MIDI number to a frequency using equal temperament, A4 (69) = 440Hz.
pub fn from_midi(midi: f64) -> f64 {
    440.0 * 2f64.powf((midi - 69.0) / 12.0)
}

/// Formats a MIDI number as a note name using sharps, e.g. 61 -> "c#4".
pub fn to_note_name(midi: i32) -> String {
    let octave = midi.div_euclid(12) - 1;
    format!("{}{}", NOTE_NAMES[midi.rem_euclid(12) as usize], octave)
}

/// Direct-note-offset transposition: semitones between the note and C2.
pub fn direct_note_offset(note_midi: f64) -> f64 {
    note_midi - ROOT_MIDI
}

/// Nearest-key-distance transposition: semitones from a bank key up to the note.
pub fn nearest_key_distance(key_midi: f64, note_midi: f64) -> f64 {
    note_midi - key_midi
}

/// Playback rate multiplier for a transposition in semitones.
pub fn playback_rate(semitones: f64) -> f64 {
    2f64.powf(semitones / 12.0)
}

/// How index-selected banks are repitched when a hap carries a note.
/// Note-selected banks always use the nearest-key distance.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Transposition {
    /// Repitch by the note's distance from C2.
    #[default]
    NoteOffset,
    /// Play index-selected samples at their recorded pitch.
    None,
}
