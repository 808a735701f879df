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
use super::{Controls, Envelope, RenderError};
use crate::dsp::{AudioBuffer, BufferSource, Gain, Oscillator, Param, Source, Stage, Waveform};

/// Fixed level applied to oscillators, which are much louder than typical samples.
pub const OSCILLATOR_LEVEL: f32 = 0.3;

/// Level held by clipped and instrument voices before their release.
pub const HELD_LEVEL: f32 = 0.6;

/// Release of clipped and instrument voices, in seconds.
pub const HELD_RELEASE: f64 = 0.1;

/// How an event will be voiced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Synth(Waveform),
    Sample(String),
}

/// Chooses between synthesis and sample playback from the sound name. No
/// name means a triangle wave.
pub fn select_mode(sound: Option<&str>) -> Mode {
    match sound {
        None | Some("") => Mode::Synth(Waveform::Triangle),
        Some(name) => match Waveform::from_name(name) {
            Some(waveform) => Mode::Synth(waveform),
            None => Mode::Sample(name.to_string()),
        },
    }
}

/// A source and the stages that belong to it, before the shared stages are added.
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    pub source: Source,
    pub stages: Vec<Stage>,
}

/// A resolved sample buffer, ready for voicing.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    pub buffer: AudioBuffer,
    /// Repitch factor from transposition.
    pub playback_rate: f64,
    /// Whether the buffer came from an instrument rather than a sample bank.
    pub instrument: bool,
}

/// The oscillator frequency: `freq` wins, then the note, then `n` as a MIDI
/// number or note name.
fn oscillator_frequency(controls: &Controls) -> Result<f64, RenderError> {
    if let Some(freq) = controls.freq.filter(|f| *f != 0.0) {
        return Ok(freq);
    }
    match &controls.note {
        Some(note) => Ok(note.to_frequency()?),
        None => Ok(controls.n.to_frequency()?),
    }
}

/// Builds an oscillator voice sounding from `onset` for `duration` seconds
/// plus the release.
pub fn build_oscillator(
    waveform: Waveform,
    controls: &Controls,
    onset: f64,
    duration: f64,
) -> Result<Voice, RenderError> {
    let frequency = oscillator_frequency(controls)?;
    let oscillator = Oscillator::new(
        waveform,
        frequency,
        onset,
        onset + duration + controls.release,
    );

    let envelope = Envelope::adsr(
        controls.attack,
        controls.decay,
        controls.sustain,
        controls.release,
        1.0,
        onset,
        onset + duration,
    );

    Ok(Voice {
        source: Source::Oscillator(oscillator),
        stages: vec![
            Stage::Gain(Gain::fixed(OSCILLATOR_LEVEL)),
            Stage::Gain(Gain::new(envelope.to_param())),
        ],
    })
}

/// Builds a sample voice. Plain samples play the selected region of the
/// recording. Clipped and instrument voices are held for the event's
/// duration and then faded out.
pub fn build_sample(
    resolved: ResolvedSource,
    controls: &Controls,
    onset: f64,
    duration: f64,
) -> Voice {
    let speed = controls.speed.abs();
    let playback_rate = speed * resolved.playback_rate;
    let held = resolved.instrument || controls.clipped();

    let natural = if held {
        duration
    } else {
        resolved.buffer.duration()
    };
    let offset = controls.begin * natural;
    let play = (controls.end - controls.begin) * natural / speed;

    if held {
        let stop = onset + play;
        let mut tail = Param::new(HELD_LEVEL);
        tail.set_value_at_time(HELD_LEVEL, stop)
            .linear_ramp_to_value_at_time(0.0, stop + HELD_RELEASE);

        Voice {
            source: Source::Buffer(BufferSource::new(
                resolved.buffer,
                playback_rate,
                offset,
                onset,
                stop + HELD_RELEASE,
            )),
            stages: vec![Stage::Gain(Gain::new(tail))],
        }
    } else {
        Voice {
            source: Source::Buffer(BufferSource::new(
                resolved.buffer,
                playback_rate,
                offset,
                onset,
                onset + play,
            )),
            stages: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::pitch::{self, NoteValue};

    fn controls(value: serde_json::Value) -> Controls {
        Controls::from_value(&value).unwrap()
    }

    fn one_second() -> AudioBuffer {
        AudioBuffer::new(vec![0.0; 100], 1, 100)
    }

    #[test]
    fn test_select_mode() {
        assert_eq!(select_mode(None), Mode::Synth(Waveform::Triangle));
        assert_eq!(select_mode(Some("")), Mode::Synth(Waveform::Triangle));
        assert_eq!(select_mode(Some("sine")), Mode::Synth(Waveform::Sine));
        assert_eq!(select_mode(Some("sawtooth")), Mode::Synth(Waveform::Sawtooth));
        assert_eq!(select_mode(Some("bd")), Mode::Sample("bd".to_string()));
    }

    #[test]
    fn test_oscillator_span_and_envelope() {
        let voice = build_oscillator(
            Waveform::Triangle,
            &controls(json!({"note": "c3", "release": 0.2})),
            1.0,
            0.5,
        )
        .unwrap();

        match &voice.source {
            Source::Oscillator(oscillator) => {
                let expected = NoteValue::from("c3").to_frequency().unwrap();
                assert_eq!(oscillator.frequency, expected);
                assert_eq!(oscillator.start, 1.0);
                assert!((oscillator.stop - 1.7).abs() < 1e-12);
            }
            other => panic!("unexpected source: {:?}", other),
        }

        assert_eq!(voice.stages.len(), 2);
        match &voice.stages[0] {
            Stage::Gain(gain) => assert_eq!(gain.level.value_at(1.2), OSCILLATOR_LEVEL),
            other => panic!("unexpected stage: {:?}", other),
        }
        match &voice.stages[1] {
            Stage::Gain(gain) => {
                assert_eq!(gain.level.value_at(1.0), 0.0);
                assert!((gain.level.value_at(1.001) - 1.0).abs() < 1e-3);
            }
            other => panic!("unexpected stage: {:?}", other),
        }
    }

    #[test]
    fn test_oscillator_frequency_priority() {
        assert_eq!(
            oscillator_frequency(&controls(json!({"freq": 220, "note": "c3", "n": 60}))).unwrap(),
            220.0
        );
        assert_eq!(
            oscillator_frequency(&controls(json!({"note": 69, "n": 60}))).unwrap(),
            440.0
        );
        assert_eq!(
            oscillator_frequency(&controls(json!({"n": 69}))).unwrap(),
            440.0
        );
        assert!(matches!(
            oscillator_frequency(&controls(json!({"note": "bd"}))),
            Err(RenderError::InvalidNote(_))
        ));
    }

    #[test]
    fn test_oscillator_named_n() {
        assert_eq!(
            oscillator_frequency(&controls(json!({"s": "sine", "n": "c3"}))).unwrap(),
            pitch::from_midi(48.0)
        );
        assert_eq!(
            oscillator_frequency(&controls(json!({"s": "sine", "note": 69, "n": "c3"}))).unwrap(),
            440.0
        );
        assert!(matches!(
            oscillator_frequency(&controls(json!({"s": "sine", "n": "x9"}))),
            Err(RenderError::InvalidNote(_))
        ));
    }

    #[test]
    fn test_plain_sample() {
        let resolved = ResolvedSource {
            buffer: one_second(),
            playback_rate: 1.0,
            instrument: false,
        };
        let voice = build_sample(resolved, &controls(json!({})), 2.0, 0.25);

        assert!(voice.stages.is_empty());
        match voice.source {
            Source::Buffer(source) => {
                assert_eq!(source.offset, 0.0);
                assert_eq!(source.playback_rate, 1.0);
                assert_eq!(source.start, 2.0);
                assert_eq!(source.stop, 3.0);
            }
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn test_sample_region_and_speed() {
        let resolved = ResolvedSource {
            buffer: one_second(),
            playback_rate: 2.0,
            instrument: false,
        };
        let voice = build_sample(
            resolved,
            &controls(json!({"begin": 0.25, "end": 0.75, "speed": -2})),
            0.0,
            0.25,
        );

        match voice.source {
            Source::Buffer(source) => {
                assert_eq!(source.offset, 0.25);
                assert_eq!(source.playback_rate, 4.0);
                assert_eq!(source.stop, 0.25);
            }
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn test_clipped_sample_tail() {
        let resolved = ResolvedSource {
            buffer: one_second(),
            playback_rate: 1.0,
            instrument: false,
        };
        let voice = build_sample(resolved, &controls(json!({"clip": 1})), 1.0, 0.5);

        match &voice.source {
            Source::Buffer(source) => {
                assert_eq!(source.offset, 0.0);
                assert!((source.stop - 1.6).abs() < 1e-12);
            }
            other => panic!("unexpected source: {:?}", other),
        }
        match &voice.stages[..] {
            [Stage::Gain(gain)] => {
                assert_eq!(gain.level.value_at(1.0), HELD_LEVEL);
                assert_eq!(gain.level.value_at(1.5), HELD_LEVEL);
                assert!((gain.level.value_at(1.55) - HELD_LEVEL / 2.0).abs() < 1e-3);
                assert!(gain.level.value_at(1.6).abs() < 1e-3);
                assert_eq!(gain.level.value_at(2.0), 0.0);
            }
            other => panic!("unexpected stages: {:?}", other),
        }
    }

    #[test]
    fn test_instrument_is_held() {
        let resolved = ResolvedSource {
            buffer: one_second(),
            playback_rate: 1.0,
            instrument: true,
        };
        let voice = build_sample(resolved, &controls(json!({})), 0.0, 2.0);

        assert_eq!(voice.source.stop(), 2.0 + HELD_RELEASE);
        assert_eq!(voice.stages.len(), 1);
    }
}
