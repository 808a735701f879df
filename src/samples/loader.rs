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

//! Sample buffer loading and caching.
//!
//! Samples are decoded on first use and cached by URL, so every later event
//! using the same file plays from memory.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

use crate::dsp::AudioBuffer;

/// Errors from loading a sample buffer.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] SymphoniaError),

    #[error("no audio track found")]
    NoTrack,

    #[error("sample rate not specified")]
    UnknownSampleRate,

    #[error("unsupported URL {0}, only local files can be loaded")]
    UnsupportedUrl(String),

    #[error("loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Loads decoded audio for a sample URL.
pub trait BufferLoader: Send + Sync {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<AudioBuffer, LoadError>>;
}

/// Loads samples from the local file system.
pub struct FileBufferLoader {
    /// Prefix for relative URLs.
    base_path: PathBuf,
    /// Rate that loaded samples are converted to, matching the output device.
    target_sample_rate: u32,
    cache: Arc<Mutex<HashMap<String, AudioBuffer>>>,
}

impl FileBufferLoader {
    pub fn new(base_path: impl Into<PathBuf>, target_sample_rate: u32) -> FileBufferLoader {
        FileBufferLoader {
            base_path: base_path.into(),
            target_sample_rate,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of cached buffers.
    pub fn cached(&self) -> usize {
        self.cache.lock().len()
    }

    /// Maps a URL onto a file path.
    fn resolve(&self, url: &str) -> Result<PathBuf, LoadError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Err(LoadError::UnsupportedUrl(url.to_string()));
        }

        let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.base_path.join(path))
        }
    }
}

impl BufferLoader for FileBufferLoader {
    fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<AudioBuffer, LoadError>> {
        Box::pin(async move {
            let cached = self.cache.lock().get(url).cloned();
            if let Some(buffer) = cached {
                debug!(url, "Using cached sample");
                return Ok(buffer);
            }

            let path = self.resolve(url)?;
            info!(path = ?path, "Loading sample into memory");

            // Decoding finishes and is cached even if the caller stops waiting.
            let target_sample_rate = self.target_sample_rate;
            let cache = self.cache.clone();
            let key = url.to_string();
            let buffer = tokio::task::spawn_blocking(move || {
                let mut buffer = decode_file(&path)?;
                if buffer.sample_rate() != target_sample_rate && target_sample_rate != 0 {
                    info!(
                        source_rate = buffer.sample_rate(),
                        target_rate = target_sample_rate,
                        "Transcoding sample"
                    );
                    buffer = transcode(&buffer, target_sample_rate);
                }

                info!(
                    url = %key,
                    channels = buffer.channels(),
                    sample_rate = buffer.sample_rate(),
                    duration_ms = (buffer.duration() * 1000.0) as u64,
                    "Sample loaded"
                );
                cache.lock().insert(key, buffer.clone());
                Ok::<_, LoadError>(buffer)
            })
            .await??;

            Ok(buffer)
        })
    }
}

/// Decodes an entire audio file into memory.
fn decode_file(path: &Path) -> Result<AudioBuffer, LoadError> {
    let file = File::open(path).map_err(|e| {
        LoadError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(LoadError::NoTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(LoadError::UnknownSampleRate)?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            // Skip corrupt packets.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count() as u16;
        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    Ok(AudioBuffer::new(samples, channels.max(1), sample_rate))
}

/// Converts a buffer to another sample rate using linear interpolation.
/// Good enough for one-shots and drum hits.
fn transcode(buffer: &AudioBuffer, target_rate: u32) -> AudioBuffer {
    let ratio = f64::from(target_rate) / f64::from(buffer.sample_rate());
    let channels = buffer.channels() as usize;
    let target_frames = (buffer.frames() as f64 * ratio).ceil() as usize;
    let samples = buffer.samples();

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    AudioBuffer::new(output, buffer.channels(), target_rate)
}
