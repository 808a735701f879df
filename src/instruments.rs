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

//! Soundfont-style instruments.
//!
//! An instrument plays a buffer prepared for a specific pitch, so unlike a
//! sample bank it is held for the length of the event rather than the length
//! of the recording.
//!
//! [FontResolver] builds instruments from single recordings listed in the
//! player configuration. Other libraries plug in through [InstrumentResolver].

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Deserialize;
use tracing::debug;

use crate::audio::Clock;
use crate::dsp::AudioBuffer;
use crate::pitch::{self, NoteValue};
use crate::samples::loader::BufferLoader;

/// A buffer ready to play at a given rate.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSource {
    pub buffer: AudioBuffer,
    pub playback_rate: f64,
}

/// Resolves sound names to instruments and produces their buffers.
pub trait InstrumentResolver: Send + Sync {
    /// Returns the instrument key for a sound name, if it names an instrument.
    fn resolve_key(&self, name: &str) -> Option<String>;

    /// Produces the buffer for an instrument playing a pitch.
    fn buffer_source<'a>(
        &'a self,
        key: &'a str,
        pitch: &'a NoteValue,
        clock: &'a dyn Clock,
    ) -> BoxFuture<'a, Result<InstrumentSource, Box<dyn Error + Send + Sync>>>;
}

/// The names an instrument library knows.
///
/// `instruments` are the library's own keys, e.g. "0000_JCLive_sf2_file".
/// `instrument_names` are General MIDI program names in program order, e.g.
/// "acoustic_grand_piano". A program name resolves to the first key that
/// starts with its zero padded program number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentCatalog {
    pub instruments: Vec<String>,
    pub instrument_names: Vec<String>,
}

impl InstrumentCatalog {
    pub fn new(instruments: Vec<String>, instrument_names: Vec<String>) -> InstrumentCatalog {
        InstrumentCatalog {
            instruments,
            instrument_names,
        }
    }

    /// Resolves a sound name to an instrument key.
    pub fn resolve_key(&self, name: &str) -> Option<String> {
        if self.instruments.iter().any(|instrument| instrument == name) {
            return Some(name.to_string());
        }

        let program = self.instrument_names.iter().position(|n| n == name)?;
        let prefix = format!("{:03}", program);
        self.instruments
            .iter()
            .find(|instrument| instrument.starts_with(&prefix))
            .cloned()
    }
}

fn default_root() -> NoteValue {
    NoteValue::Midi(60.0)
}

/// A recording that an instrument repitches to every note.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Font {
    pub url: String,
    /// The note the recording sounds at its own rate.
    #[serde(default = "default_root")]
    pub root: NoteValue,
}

/// Instruments made of one recording each, keyed like a soundfont library.
pub struct FontResolver {
    catalog: InstrumentCatalog,
    fonts: HashMap<String, Font>,
    loader: Arc<dyn BufferLoader>,
}

impl FontResolver {
    /// `names` are General MIDI program names in program order.
    pub fn new(
        fonts: HashMap<String, Font>,
        names: Vec<String>,
        loader: Arc<dyn BufferLoader>,
    ) -> FontResolver {
        let mut keys: Vec<String> = fonts.keys().cloned().collect();
        keys.sort();
        FontResolver {
            catalog: InstrumentCatalog::new(keys, names),
            fonts,
            loader,
        }
    }
}

impl InstrumentResolver for FontResolver {
    fn resolve_key(&self, name: &str) -> Option<String> {
        self.catalog.resolve_key(name)
    }

    fn buffer_source<'a>(
        &'a self,
        key: &'a str,
        pitch: &'a NoteValue,
        _clock: &'a dyn Clock,
    ) -> BoxFuture<'a, Result<InstrumentSource, Box<dyn Error + Send + Sync>>> {
        Box::pin(async move {
            let font = self
                .fonts
                .get(key)
                .ok_or_else(|| format!("no recording for instrument {}", key))?;
            let transpose = pitch.to_midi()? - font.root.to_midi()?;
            let buffer = self.loader.load(&font.url).await?;

            debug!(key, url = %font.url, transpose, "Resolved instrument");
            Ok(InstrumentSource {
                buffer,
                playback_rate: pitch::playback_rate(transpose),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;
    use crate::audio::mock;
    use crate::samples::loader::LoadError;

    struct OneFile;

    impl BufferLoader for OneFile {
        fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<AudioBuffer, LoadError>> {
            Box::pin(async move {
                match url {
                    "piano.wav" => Ok(AudioBuffer::new(vec![0.5; 100], 1, 100)),
                    _ => Err(LoadError::Io(io::Error::from(io::ErrorKind::NotFound))),
                }
            })
        }
    }

    fn fonts() -> FontResolver {
        FontResolver::new(
            HashMap::from([
                (
                    "0000_piano".to_string(),
                    Font {
                        url: "piano.wav".to_string(),
                        root: NoteValue::from("c4"),
                    },
                ),
                (
                    "0010_music_box".to_string(),
                    Font {
                        url: "missing.wav".to_string(),
                        root: default_root(),
                    },
                ),
            ]),
            vec!["acoustic_grand_piano".to_string(), "bright_piano".to_string()],
            Arc::new(OneFile),
        )
    }

    fn catalog() -> InstrumentCatalog {
        InstrumentCatalog::new(
            vec![
                "0000_JCLive_sf2_file".to_string(),
                "0010_Aspirin_sf2_file".to_string(),
                "0250_SoundBlasterOld_sf2".to_string(),
            ],
            (0..30).map(|i| format!("program_{}", i)).collect(),
        )
    }

    #[test]
    fn test_resolve_instrument_key() {
        assert_eq!(
            catalog().resolve_key("0010_Aspirin_sf2_file"),
            Some("0010_Aspirin_sf2_file".to_string())
        );
    }

    #[test]
    fn test_resolve_program_name() {
        assert_eq!(
            catalog().resolve_key("program_1"),
            Some("0010_Aspirin_sf2_file".to_string())
        );
        assert_eq!(
            catalog().resolve_key("program_25"),
            Some("0250_SoundBlasterOld_sf2".to_string())
        );
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(catalog().resolve_key("bd"), None);
        // Known program name, but no instrument for it.
        assert_eq!(catalog().resolve_key("program_7"), None);
    }

    #[tokio::test]
    async fn test_font_resolver() {
        let fonts = fonts();
        let clock = mock::Clock::get("mock", 44100);

        let key = fonts.resolve_key("acoustic_grand_piano").unwrap();
        assert_eq!(key, "0000_piano");
        assert_eq!(
            fonts.resolve_key("bright_piano"),
            Some("0010_music_box".to_string())
        );
        assert_eq!(fonts.resolve_key("bd"), None);

        let source = fonts
            .buffer_source(&key, &NoteValue::from("c5"), &clock)
            .await
            .unwrap();
        assert!((source.playback_rate - 2.0).abs() < 1e-12);
        assert_eq!(source.buffer.duration(), 1.0);

        let source = fonts
            .buffer_source(&key, &NoteValue::Midi(60.0), &clock)
            .await
            .unwrap();
        assert_eq!(source.playback_rate, 1.0);
    }

    #[tokio::test]
    async fn test_font_resolver_errors() {
        let fonts = fonts();
        let clock = mock::Clock::get("mock", 44100);

        assert!(fonts
            .buffer_source("0010_music_box", &NoteValue::Midi(60.0), &clock)
            .await
            .is_err());
        assert!(fonts
            .buffer_source("0020_organ", &NoteValue::Midi(60.0), &clock)
            .await
            .is_err());
        assert!(fonts
            .buffer_source("0000_piano", &NoteValue::from("h2"), &clock)
            .await
            .is_err());
    }
}
