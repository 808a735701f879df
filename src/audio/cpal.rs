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
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::mixer::AudioMixer;
use super::thread_priority::{configure_mix_thread_priority, mix_thread_priority, rt_audio_enabled};
use super::Destination;
use crate::config;

/// Frames mixed per block by the producer thread.
const BLOCK_FRAMES: usize = 512;

/// Lock-free single producer, single consumer ring of f32 samples.
/// Samples are stored as their bit patterns.
struct CircularBuffer {
    buffer: Vec<AtomicU32>,
    /// Capacity (must be power of 2)
    capacity: usize,
    /// Read position (consumer)
    read_pos: AtomicUsize,
    /// Write position (producer)
    write_pos: AtomicUsize,
}

impl CircularBuffer {
    fn new(capacity: usize) -> Self {
        let cap = capacity.next_power_of_two();
        Self {
            buffer: (0..cap).map(|_| AtomicU32::new(0)).collect(),
            capacity: cap,
            read_pos: AtomicUsize::new(0),
            write_pos: AtomicUsize::new(0),
        }
    }

    /// Number of samples available to read.
    #[inline]
    fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);
        if write >= read {
            write - read
        } else {
            self.capacity - read + write
        }
    }

    /// Space available to write.
    #[inline]
    fn space(&self) -> usize {
        self.capacity - self.available() - 1
    }

    /// Returns the number of samples actually written.
    fn write(&self, samples: &[f32]) -> usize {
        let to_write = self.space().min(samples.len());
        let write = self.write_pos.load(Ordering::Acquire);
        let mask = self.capacity - 1;

        for (i, sample) in samples.iter().take(to_write).enumerate() {
            self.buffer[(write + i) & mask].store(sample.to_bits(), Ordering::Relaxed);
        }

        self.write_pos
            .store((write + to_write) & mask, Ordering::Release);
        to_write
    }

    /// Returns the number of samples actually read.
    fn read(&self, output: &mut [f32]) -> usize {
        let to_read = self.available().min(output.len());
        let read = self.read_pos.load(Ordering::Acquire);
        let mask = self.capacity - 1;

        for (i, sample) in output.iter_mut().take(to_read).enumerate() {
            *sample = f32::from_bits(self.buffer[(read + i) & mask].load(Ordering::Relaxed));
        }

        self.read_pos
            .store((read + to_read) & mask, Ordering::Release);
        to_read
    }
}

/// f32 callback: read directly into the cpal buffer.
fn create_f32_callback(
    ring: Arc<CircularBuffer>,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        let read = ring.read(data);
        // Zero-fill any shortfall
        data[read..].fill(0.0);
    }
}

/// Integer callback: read from the ring and convert.
fn create_converting_callback<T: cpal::Sample + cpal::FromSample<f32>>(
    ring: Arc<CircularBuffer>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static {
    let mut temp = Vec::new();
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        temp.resize(data.len(), 0.0f32);
        let read = ring.read(&mut temp);
        temp[read..].fill(0.0);

        for (dst, &src) in data.iter_mut().zip(temp.iter()) {
            *dst = T::from_sample(src);
        }
    }
}

/// A clock driven by a cpal output stream. Time is the number of frames the
/// mixer has rendered.
pub struct Clock {
    /// The name of the device.
    name: String,
    /// The host ID of the device.
    host_id: cpal::HostId,
    sample_rate: u32,
    channels: u16,
    destination: Destination,
    rendered_frames: Arc<AtomicU64>,
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}, Rate={}) ({})",
            self.name,
            self.channels,
            self.sample_rate,
            self.host_id.name()
        )
    }
}

impl super::Clock for Clock {
    fn now(&self) -> f64 {
        self.rendered_frames.load(Ordering::Acquire) as f64 / f64::from(self.sample_rate)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn destination(&self) -> &Destination {
        &self.destination
    }
}

/// Finds the device with the given name. "default" is the default host's
/// default output device.
fn find_device(name: &str) -> Result<(cpal::HostId, cpal::Device), Box<dyn Error>> {
    if name == "default" {
        let host = cpal::default_host();
        return match host.default_output_device() {
            Some(device) => Ok((host.id(), device)),
            None => Err("no default output device".into()),
        };
    }

    for host_id in cpal::available_hosts() {
        let Ok(devices) = cpal::host_from_id(host_id)?.output_devices() else {
            continue;
        };
        for device in devices {
            if device.name().is_ok_and(|n| n.trim() == name) {
                return Ok((host_id, device));
            }
        }
    }

    Err(format!("no device found with name {}", name).into())
}

/// Picks the configured rate and channel count if the device supports them,
/// the device default otherwise.
fn stream_config(
    device: &cpal::Device,
    config: &config::Audio,
) -> Result<cpal::SupportedStreamConfig, Box<dyn Error>> {
    let rate = config.sample_rate();
    let channels = config.channels();

    let supported = device.supported_output_configs()?.find(|c| {
        c.channels() == channels
            && c.min_sample_rate().0 <= rate
            && rate <= c.max_sample_rate().0
            && matches!(
                c.sample_format(),
                cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::I32
            )
    });

    match supported {
        Some(supported) => Ok(supported.with_sample_rate(cpal::SampleRate(rate))),
        None => {
            let default = device.default_output_config()?;
            info!(
                requested_rate = rate,
                requested_channels = channels,
                rate = default.sample_rate().0,
                channels = default.channels(),
                "Requested format unsupported, using device default"
            );
            Ok(default)
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    supported: &cpal::SupportedStreamConfig,
    ring: Arc<CircularBuffer>,
) -> Result<cpal::Stream, Box<dyn Error>> {
    let config = supported.config();
    let on_error = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => {
            device.build_output_stream(&config, create_f32_callback(ring), on_error, None)?
        }
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config,
            create_converting_callback::<i16>(ring),
            on_error,
            None,
        )?,
        cpal::SampleFormat::I32 => device.build_output_stream(
            &config,
            create_converting_callback::<i32>(ring),
            on_error,
            None,
        )?,
        format => return Err(format!("unsupported sample format {:?}", format).into()),
    };
    stream.play()?;
    Ok(stream)
}

impl Clock {
    /// Opens the configured device and starts rendering.
    pub fn open(config: &config::Audio) -> Result<Clock, Box<dyn Error>> {
        let span = span!(Level::INFO, "open audio device");
        let _enter = span.enter();

        let (host_id, device) = find_device(config.device())?;
        let name = device.name()?;
        let supported = stream_config(&device, config)?;
        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        let (destination, incoming) = Destination::new();
        let mut mixer = AudioMixer::new(incoming, channels, sample_rate);
        let rendered_frames = mixer.frame_counter();

        // Roughly 100ms of audio.
        let capacity_samples = (sample_rate as usize * channels as usize) / 10;
        let ring = Arc::new(CircularBuffer::new(capacity_samples.max(1024)));

        // Producer thread: mix blocks into the ring buffer.
        let producer_ring = ring.clone();
        let priority = mix_thread_priority();
        let rt_audio = rt_audio_enabled();
        thread::Builder::new()
            .name("hapsynth-mixer".to_string())
            .spawn(move || {
                configure_mix_thread_priority(priority, rt_audio);

                let block_samples = BLOCK_FRAMES * channels as usize;
                let mut scratch = vec![0.0f32; block_samples];
                loop {
                    if producer_ring.space() >= block_samples {
                        mixer.process_into_output(&mut scratch, BLOCK_FRAMES);
                        producer_ring.write(&scratch);
                    } else {
                        // Ring full, yield briefly
                        thread::sleep(Duration::from_micros(500));
                    }
                }
            })?;

        // The stream lives on its own thread for the life of the process.
        let (started_tx, started_rx) = crossbeam_channel::bounded::<Result<(), String>>(1);
        thread::Builder::new()
            .name("hapsynth-output".to_string())
            .spawn(move || match build_stream(&device, &supported, ring) {
                Ok(_stream) => {
                    let _ = started_tx.send(Ok(()));
                    loop {
                        thread::park();
                    }
                }
                Err(e) => {
                    let _ = started_tx.send(Err(e.to_string()));
                }
            })?;

        match started_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(format!("failed to start output stream: {}", e).into()),
            Err(_) => return Err("output thread exited before starting".into()),
        }

        info!(
            device = name,
            host = host_id.name(),
            sample_rate,
            channels,
            "CPAL output stream started"
        );

        Ok(Clock {
            name,
            host_id,
            sample_rate,
            channels,
            destination,
            rendered_frames,
        })
    }
}

/// Lists the names of cpal output devices.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    // Suppress noisy output here.
    let _shh_stdout = shh::stdout()?;
    let _shh_stderr = shh::stderr()?;

    let mut names = Vec::new();
    for host_id in cpal::available_hosts() {
        let devices = match cpal::host_from_id(host_id)?.output_devices() {
            Ok(devices) => devices,
            Err(e) => {
                error!(
                    err = e.to_string(),
                    host = host_id.name(),
                    "Unable to list devices for host"
                );
                continue;
            }
        };

        for device in devices {
            let max_channels = match device.supported_output_configs() {
                Ok(configs) => configs.map(|c| c.channels()).max().unwrap_or(0),
                Err(_) => continue,
            };
            if max_channels > 0 {
                names.push(format!(
                    "{} (Channels={}) ({})",
                    device.name()?,
                    max_channels,
                    host_id.name()
                ));
            }
        }
    }

    names.sort();
    Ok(names)
}
