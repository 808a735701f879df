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
use serde::Deserialize;
use serde_json::Value;

use super::RenderError;
use crate::pitch::NoteValue;
use crate::samples::split_compound;

/// The control parameters of a hap, with every default filled in.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Controls {
    /// Sound name: a waveform, a sample bank or an instrument.
    pub s: Option<String>,
    /// Sample index, or pitch for synths without a note. Synths also take a
    /// note name here.
    pub n: NoteValue,
    pub note: Option<NoteValue>,
    /// Oscillator frequency in Hz. Overrides note and n.
    pub freq: Option<f64>,
    pub gain: f64,
    pub cutoff: Option<f64>,
    pub resonance: f64,
    pub hcutoff: Option<f64>,
    pub hresonance: f64,
    pub bandf: Option<f64>,
    pub bandq: f64,
    /// 0 is hard left, 1 is hard right.
    pub pan: Option<f64>,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
    /// Sample playback speed. Only the magnitude is used.
    pub speed: f64,
    /// Start of the played region, as a fraction of the sample.
    pub begin: f64,
    /// End of the played region, as a fraction of the sample.
    pub end: f64,
    /// Non-zero holds the sample for the event's duration.
    pub clip: f64,
}

impl Default for Controls {
    fn default() -> Self {
        Controls {
            s: None,
            n: NoteValue::Midi(0.0),
            note: None,
            freq: None,
            gain: 1.0,
            cutoff: None,
            resonance: 1.0,
            hcutoff: None,
            hresonance: 1.0,
            bandf: None,
            bandq: 1.0,
            pan: None,
            attack: 0.001,
            decay: 0.05,
            sustain: 0.5,
            release: 0.001,
            speed: 1.0,
            begin: 0.0,
            end: 1.0,
            clip: 0.0,
        }
    }
}

impl Controls {
    /// Reads controls from a hap value. A missing value means all defaults.
    pub fn from_value(value: &Value) -> Result<Controls, RenderError> {
        if value.is_null() {
            return Ok(Controls::default());
        }
        Controls::deserialize(value).map_err(|e| RenderError::MalformedValue(e.to_string()))
    }

    /// Splits "name:index" forms of `s` and `note` into name and `n`.
    pub fn split_compound_names(&mut self) {
        let owned = |(name, n): (&str, f64)| (name.to_string(), n);
        if let Some((s, n)) = self.s.as_deref().and_then(split_compound).map(owned) {
            self.s = Some(s);
            self.n = NoteValue::Midi(n);
        }
        let note = match &self.note {
            Some(NoteValue::Name(note)) => split_compound(note).map(owned),
            _ => None,
        };
        if let Some((note, n)) = note {
            self.note = Some(NoteValue::Name(note));
            self.n = NoteValue::Midi(n);
        }
    }

    /// `n` as a sample index. Only numbers select samples.
    pub fn index(&self) -> Result<f64, RenderError> {
        match &self.n {
            NoteValue::Midi(index) => Ok(*index),
            NoteValue::Name(name) => Err(RenderError::MalformedValue(format!(
                "sample index must be a number, got \"{}\"",
                name
            ))),
        }
    }

    /// Whether the sample is held for the event's duration.
    pub fn clipped(&self) -> bool {
        self.clip != 0.0
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_defaults() {
        let controls = Controls::from_value(&json!({})).unwrap();
        assert_eq!(controls, Controls::default());
        assert_eq!(controls.gain, 1.0);
        assert_eq!(controls.attack, 0.001);
        assert_eq!(controls.decay, 0.05);
        assert_eq!(controls.sustain, 0.5);
        assert_eq!(controls.release, 0.001);
        assert_eq!(controls.speed, 1.0);
        assert_eq!(controls.end, 1.0);
        assert!(!controls.clipped());

        assert_eq!(Controls::from_value(&Value::Null).unwrap(), Controls::default());
    }

    #[test]
    fn test_values() {
        let controls = Controls::from_value(&json!({
            "s": "piano",
            "note": "e3",
            "gain": 0.5,
            "cutoff": 800,
            "pan": 0.25,
            "clip": 1,
            "vowel": "a",
        }))
        .unwrap();

        assert_eq!(controls.s.as_deref(), Some("piano"));
        assert_eq!(controls.note, Some(NoteValue::from("e3")));
        assert_eq!(controls.gain, 0.5);
        assert_eq!(controls.cutoff, Some(800.0));
        assert_eq!(controls.pan, Some(0.25));
        assert!(controls.clipped());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            Controls::from_value(&json!({"gain": "loud"})),
            Err(RenderError::MalformedValue(_))
        ));
        assert!(matches!(
            Controls::from_value(&json!([1, 2])),
            Err(RenderError::MalformedValue(_))
        ));
    }

    #[test]
    fn test_split_compound_names() {
        let mut controls = Controls::from_value(&json!({"s": "bd:3", "n": 1})).unwrap();
        controls.split_compound_names();
        assert_eq!(controls.s.as_deref(), Some("bd"));
        assert_eq!(controls.n, NoteValue::Midi(3.0));

        let mut controls = Controls::from_value(&json!({"s": "bd:x", "n": 1})).unwrap();
        controls.split_compound_names();
        assert_eq!(controls.s.as_deref(), Some("bd:x"));
        assert_eq!(controls.n, NoteValue::Midi(1.0));

        let mut controls = Controls::from_value(&json!({"note": "c3:2"})).unwrap();
        controls.split_compound_names();
        assert_eq!(controls.note, Some(NoteValue::from("c3")));
        assert_eq!(controls.n, NoteValue::Midi(2.0));

        let mut controls = Controls::from_value(&json!({"note": 60})).unwrap();
        controls.split_compound_names();
        assert_eq!(controls.note, Some(NoteValue::Midi(60.0)));
        assert_eq!(controls.n, NoteValue::Midi(0.0));

        let mut controls = Controls::from_value(&json!({"s": "sine", "n": "e4"})).unwrap();
        controls.split_compound_names();
        assert_eq!(controls.n, NoteValue::from("e4"));
    }

    #[test]
    fn test_index() {
        let controls = Controls::from_value(&json!({"n": 2})).unwrap();
        assert_eq!(controls.index().unwrap(), 2.0);
        assert_eq!(Controls::default().index().unwrap(), 0.0);

        let controls = Controls::from_value(&json!({"n": "c3"})).unwrap();
        assert_eq!(controls.n, NoteValue::from("c3"));
        assert!(matches!(
            controls.index(),
            Err(RenderError::MalformedValue(_))
        ));
    }
}
