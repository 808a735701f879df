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
use std::{sync::Arc, time::Duration};

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::{
    assemble, build_oscillator, build_sample, select_mode, ChainParams, Controls, Mode,
    RenderError, ResolvedSource,
};
use crate::audio::Clock;
use crate::hap::Hap;
use crate::instruments::InstrumentResolver;
use crate::pitch::{self, Transposition};
use crate::samples::{loader::BufferLoader, select_sample, SampleRegistry};

/// A request to sound a hap.
#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    pub hap: Hap,
    /// Onset in seconds on the driver's timeline.
    pub onset: f64,
    /// The driver's time when the trigger was issued, on the same timeline.
    pub reference: f64,
    /// Cycles per second.
    pub cps: f64,
}

/// Anything haps can be sent to.
pub trait Output: Send + Sync {
    /// Sounds a hap. Never fails: problems are logged and the hap is dropped.
    fn trigger(&self, trigger: Trigger);
}

/// An output that ignores every hap.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Output for Silent {
    fn trigger(&self, _trigger: Trigger) {}
}

/// Where a rendered hap landed on the clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scheduled {
    pub start: f64,
    pub stop: f64,
}

/// Renders haps into chains on a clock.
#[derive(Clone)]
pub struct Renderer {
    clock: Arc<dyn Clock>,
    registry: Arc<SampleRegistry>,
    loader: Arc<dyn BufferLoader>,
    instruments: Option<Arc<dyn InstrumentResolver>>,
    transposition: Transposition,
}

impl Renderer {
    pub fn new(
        clock: Arc<dyn Clock>,
        registry: Arc<SampleRegistry>,
        loader: Arc<dyn BufferLoader>,
    ) -> Renderer {
        Renderer {
            clock,
            registry,
            loader,
            instruments: None,
            transposition: Transposition::default(),
        }
    }

    /// Resolves sound names against the given instruments before sample banks.
    pub fn with_instruments(mut self, instruments: Arc<dyn InstrumentResolver>) -> Renderer {
        self.instruments = Some(instruments);
        self
    }

    /// Sets how index-selected samples are repitched by a note.
    pub fn with_transposition(mut self, transposition: Transposition) -> Renderer {
        self.transposition = transposition;
        self
    }

    /// Renders a hap, logging and dropping it on any failure.
    pub async fn render(&self, trigger: &Trigger) -> Option<Scheduled> {
        match self.try_render(trigger).await {
            Ok(scheduled) => Some(scheduled),
            Err(e) if e.is_skip() => {
                debug!(err = %e, begin = trigger.hap.begin, "Skipping event");
                None
            }
            Err(e) => {
                warn!(err = %e, begin = trigger.hap.begin, "Dropping event");
                None
            }
        }
    }

    /// Renders a hap and connects it to the clock's destination.
    pub async fn try_render(&self, trigger: &Trigger) -> Result<Scheduled, RenderError> {
        if !trigger.cps.is_finite() || trigger.cps <= 0.0 {
            return Err(RenderError::InvalidTempo(trigger.cps));
        }
        let hap = &trigger.hap;
        if ![trigger.onset, trigger.reference, hap.duration]
            .iter()
            .all(|t| t.is_finite())
        {
            return Err(RenderError::MalformedValue(
                "event times must be finite".to_string(),
            ));
        }

        let duration = hap.duration / trigger.cps;
        let onset = self.clock.now() + trigger.onset - trigger.reference;

        let mut controls = Controls::from_value(&hap.value)?;
        controls.split_compound_names();

        let voice = match select_mode(controls.s.as_deref()) {
            Mode::Synth(waveform) => build_oscillator(waveform, &controls, onset, duration)?,
            Mode::Sample(sound) => {
                if controls.speed == 0.0 {
                    return Err(RenderError::ZeroSpeed);
                }
                if sound.trim().is_empty() {
                    return Err(RenderError::NoSoundSpecified);
                }
                let resolved = self.resolve(&sound, &controls, onset).await?;
                build_sample(resolved, &controls, onset, duration)
            }
        };

        let params = ChainParams::from_controls(&controls, hap.velocity());
        let chain = assemble(voice, &params, self.clock.sample_rate());
        let scheduled = Scheduled {
            start: chain.start(),
            stop: chain.stop(),
        };
        self.clock.destination().connect(chain)?;

        debug!(
            sound = controls.s.as_deref().unwrap_or("triangle"),
            n = %controls.n,
            start = scheduled.start,
            stop = scheduled.stop,
            "Scheduled event"
        );
        Ok(scheduled)
    }

    /// Fetches the buffer for a sound. Gives up once the onset has passed.
    async fn resolve(
        &self,
        sound: &str,
        controls: &Controls,
        onset: f64,
    ) -> Result<ResolvedSource, RenderError> {
        let missed = || RenderError::DeadlineMissed {
            sound: sound.to_string(),
            index: controls.n.clone(),
        };

        let wait = Duration::try_from_secs_f64((onset - self.clock.now()).max(0.0))
            .unwrap_or(Duration::MAX);
        let resolved = tokio::time::timeout(wait, self.fetch(sound, controls))
            .await
            .map_err(|_| missed())??;

        if self.clock.now() > onset {
            return Err(missed());
        }
        Ok(resolved)
    }

    async fn fetch(&self, sound: &str, controls: &Controls) -> Result<ResolvedSource, RenderError> {
        if let Some(instruments) = &self.instruments {
            if let Some(key) = instruments.resolve_key(sound) {
                let note = controls.note.clone().unwrap_or_else(|| controls.n.clone());
                let source = instruments
                    .buffer_source(&key, &note, self.clock.as_ref())
                    .await
                    .map_err(|source| RenderError::InstrumentResolution {
                        key: key.clone(),
                        source,
                    })?;
                return Ok(ResolvedSource {
                    buffer: source.buffer,
                    playback_rate: source.playback_rate,
                    instrument: true,
                });
            }
        }

        let index = controls.index()?;
        let selection = select_sample(&self.registry, sound, index, controls.note.as_ref())?;
        let buffer = self
            .loader
            .load(&selection.url)
            .await
            .map_err(|source| RenderError::BufferLoad {
                url: selection.url.clone(),
                source,
            })?;

        let playback_rate = match (&controls.note, self.transposition) {
            (Some(note), Transposition::NoteOffset) if selection.indexed => {
                pitch::playback_rate(pitch::direct_note_offset(note.to_midi()?))
            }
            _ => selection.rate(),
        };

        Ok(ResolvedSource {
            buffer,
            playback_rate,
            instrument: false,
        })
    }
}

impl Output for Renderer {
    fn trigger(&self, trigger: Trigger) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(err = %e, "No runtime to render event on");
                return;
            }
        };

        let renderer = self.clone();
        handle.spawn(async move {
            renderer.render(&trigger).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, error::Error, io};

    use futures_util::future::BoxFuture;
    use serde_json::json;

    use super::*;
    use crate::audio::mock;
    use crate::dsp::{AudioBuffer, Source, StageKind};
    use crate::instruments::{InstrumentCatalog, InstrumentSource};
    use crate::pitch::NoteValue;
    use crate::render::{HELD_RELEASE, OSCILLATOR_LEVEL};
    use crate::samples::{loader::LoadError, SampleBank};
    use crate::testutil::eventually_async;

    /// Serves buffers from memory. Can move the clock forward while loading,
    /// and never finishes loading the `hang` URL.
    struct MemoryLoader {
        buffers: HashMap<String, AudioBuffer>,
        clock: Arc<mock::Clock>,
        delay: f64,
        hang: Option<&'static str>,
    }

    impl BufferLoader for MemoryLoader {
        fn load<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<AudioBuffer, LoadError>> {
            Box::pin(async move {
                if self.hang == Some(url) {
                    std::future::pending::<()>().await;
                }
                self.clock.advance(self.delay);
                self.buffers
                    .get(url)
                    .cloned()
                    .ok_or_else(|| LoadError::Io(io::Error::from(io::ErrorKind::NotFound)))
            })
        }
    }

    struct MockInstruments {
        catalog: InstrumentCatalog,
    }

    impl InstrumentResolver for MockInstruments {
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
                if key.contains("broken") {
                    return Err("no such font".into());
                }
                let midi = pitch.to_midi()?;
                Ok(InstrumentSource {
                    buffer: two_seconds(),
                    playback_rate: crate::pitch::playback_rate(midi - 60.0),
                })
            })
        }
    }

    fn one_second() -> AudioBuffer {
        AudioBuffer::new(vec![0.5; 100], 1, 100)
    }

    fn two_seconds() -> AudioBuffer {
        AudioBuffer::new(vec![0.5; 200], 1, 100)
    }

    fn registry() -> SampleRegistry {
        let mut registry = SampleRegistry::new();
        registry.insert("bd", SampleBank::indexed(["x.wav"]));
        registry.insert("slow", SampleBank::indexed(["slow.wav"]));
        registry.insert(
            "piano",
            SampleBank::pitched([("c3", vec!["c3.wav"]), ("e3", vec!["e3.wav"])]),
        );
        registry
    }

    struct Setup {
        clock: Arc<mock::Clock>,
        renderer: Renderer,
    }

    fn setup_with(delay: f64, hang: Option<&'static str>) -> Setup {
        let clock = Arc::new(mock::Clock::get("mock", 44100));
        let loader = MemoryLoader {
            buffers: HashMap::from([
                ("x.wav".to_string(), one_second()),
                ("c3.wav".to_string(), one_second()),
                ("e3.wav".to_string(), one_second()),
                ("slow.wav".to_string(), two_seconds()),
            ]),
            clock: clock.clone(),
            delay,
            hang,
        };
        let instruments = MockInstruments {
            catalog: InstrumentCatalog::new(
                vec!["0000_piano_sf2".to_string(), "0010_broken_sf2".to_string()],
                vec!["grand_piano".to_string(), "broken_piano".to_string()],
            ),
        };

        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let renderer = Renderer::new(dyn_clock, Arc::new(registry()), Arc::new(loader))
            .with_instruments(Arc::new(instruments));
        Setup { clock, renderer }
    }

    fn setup() -> Setup {
        setup_with(0.0, None)
    }

    fn trigger(value: serde_json::Value) -> Trigger {
        Trigger {
            hap: Hap::new(0.0, 0.5, value),
            onset: 0.5,
            reference: 0.0,
            cps: 1.0,
        }
    }

    #[tokio::test]
    async fn test_indexed_sample() {
        let Setup { clock, renderer } = setup();

        let scheduled = renderer
            .try_render(&trigger(json!({"s": "bd", "n": 0})))
            .await
            .unwrap();
        assert_eq!(scheduled, Scheduled { start: 0.5, stop: 1.5 });

        let chains = clock.take_scheduled();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].kinds(), vec![StageKind::Gain]);
        match chains[0].source() {
            Source::Buffer(source) => {
                assert_eq!(source.offset, 0.0);
                assert_eq!(source.playback_rate, 1.0);
                assert_eq!(source.stop - source.start, one_second().duration());
            }
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_triangle_note() {
        let Setup { clock, renderer } = setup();
        let mut trigger = trigger(json!({"s": "triangle", "note": "c3"}));
        trigger.hap = trigger.hap.with_velocity(0.8);

        renderer.try_render(&trigger).await.unwrap();

        let chains = clock.take_scheduled();
        assert_eq!(chains.len(), 1);
        match chains[0].source() {
            Source::Oscillator(oscillator) => {
                let expected = NoteValue::from("c3").to_frequency().unwrap();
                assert_eq!(oscillator.frequency, expected);
                assert_eq!(oscillator.start, 0.5);
            }
            other => panic!("unexpected source: {:?}", other),
        }

        let peak = chains[0].gain_at(0.5 + 0.001) / OSCILLATOR_LEVEL;
        assert!((peak - 0.8).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_onset_alignment() {
        let Setup { clock, renderer } = setup();
        clock.set_now(10.0);

        let trigger = Trigger {
            hap: Hap::new(4.0, 1.0, json!({"s": "sine"})),
            onset: 2.25,
            reference: 2.0,
            cps: 0.5,
        };
        let scheduled = renderer.try_render(&trigger).await.unwrap();

        assert_eq!(scheduled.start, 10.25);
        // Two seconds at half a cycle per second, plus the default release.
        assert!((scheduled.stop - (10.25 + 2.0 + 0.001)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_zero_speed_is_skipped() {
        let Setup { clock, renderer } = setup();
        let trigger = trigger(json!({"s": "bd", "speed": 0}));

        let err = renderer.try_render(&trigger).await.unwrap_err();
        assert!(err.is_skip());
        assert!(renderer.render(&trigger).await.is_none());
        assert!(clock.take_scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_missed() {
        let Setup { clock, renderer } = setup_with(1.0, None);

        let err = renderer
            .try_render(&trigger(json!({"s": "bd:0"})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::DeadlineMissed { ref sound, ref index }
                if sound == "bd" && *index == NoteValue::Midi(0.0)
        ));
        assert!(clock.take_scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_cancels_slow_load() {
        let Setup { clock, renderer } = setup_with(0.0, Some("x.wav"));
        let mut trigger = trigger(json!({"s": "bd"}));
        trigger.onset = 0.05;

        let err = renderer.try_render(&trigger).await.unwrap_err();
        assert!(matches!(err, RenderError::DeadlineMissed { .. }));
        assert!(clock.take_scheduled().is_empty());
    }

    #[tokio::test]
    async fn test_sound_errors() {
        let Setup { clock, renderer } = setup();

        assert!(matches!(
            renderer.try_render(&trigger(json!({"s": "hh"}))).await,
            Err(RenderError::SampleNotFound { .. })
        ));
        assert!(matches!(
            renderer.try_render(&trigger(json!({"s": "piano"}))).await,
            Err(RenderError::MissingNote(_))
        ));
        assert!(matches!(
            renderer.try_render(&trigger(json!({"s": "  "}))).await,
            Err(RenderError::NoSoundSpecified)
        ));
        assert!(matches!(
            renderer
                .try_render(&trigger(json!({"s": "broken_piano"})))
                .await,
            Err(RenderError::InstrumentResolution { .. })
        ));

        assert!(matches!(
            renderer.try_render(&trigger(json!({"s": "bd", "n": "c3"}))).await,
            Err(RenderError::MalformedValue(_))
        ));

        let mut bad_tempo = trigger(json!({"s": "bd"}));
        bad_tempo.cps = 0.0;
        assert!(matches!(
            renderer.try_render(&bad_tempo).await,
            Err(RenderError::InvalidTempo(_))
        ));
        assert!(clock.take_scheduled().is_empty());

        // Failed events leave the renderer usable.
        renderer
            .try_render(&trigger(json!({"s": "bd"})))
            .await
            .unwrap();
        assert_eq!(clock.take_scheduled().len(), 1);
    }

    #[tokio::test]
    async fn test_pitched_bank() {
        let Setup { clock, renderer } = setup();

        renderer
            .try_render(&trigger(json!({"s": "piano", "note": "d3"})))
            .await
            .unwrap();

        let chains = clock.take_scheduled();
        match chains[0].source() {
            Source::Buffer(source) => {
                assert!((source.playback_rate - crate::pitch::playback_rate(2.0)).abs() < 1e-12)
            }
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_indexed_transposition_policy() {
        let Setup { clock, renderer } = setup();
        let trigger = trigger(json!({"s": "bd", "note": 48}));

        renderer.try_render(&trigger).await.unwrap();
        match clock.take_scheduled()[0].source() {
            Source::Buffer(source) => assert_eq!(source.playback_rate, 2.0),
            other => panic!("unexpected source: {:?}", other),
        }

        let renderer = renderer.with_transposition(Transposition::None);
        renderer.try_render(&trigger).await.unwrap();
        match clock.take_scheduled()[0].source() {
            Source::Buffer(source) => assert_eq!(source.playback_rate, 1.0),
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_instrument_is_held() {
        let Setup { clock, renderer } = setup();

        let scheduled = renderer
            .try_render(&trigger(json!({"s": "grand_piano", "note": 72})))
            .await
            .unwrap();
        assert!((scheduled.stop - (0.5 + 0.5 + HELD_RELEASE)).abs() < 1e-9);

        match clock.take_scheduled()[0].source() {
            Source::Buffer(source) => assert_eq!(source.playback_rate, 2.0),
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_output_spawns_render() {
        let Setup { clock, renderer } = setup();

        renderer.trigger(trigger(json!({"s": "bd"})));

        eventually_async(
            || {
                let clock = clock.clone();
                async move { clock.take_scheduled().len() == 1 }
            },
            "Event was never scheduled",
        )
        .await;
    }

    #[tokio::test]
    async fn test_slow_load_does_not_block_later_events() {
        let Setup { clock, renderer } = setup_with(0.0, Some("slow.wav"));

        // Far enough out that the slow load is still waiting when bd lands.
        let mut slow = trigger(json!({"s": "slow"}));
        slow.onset = 10.0;
        renderer.trigger(slow);
        renderer.trigger(trigger(json!({"s": "bd"})));

        let scheduled = Arc::new(parking_lot::Mutex::new(Vec::new()));
        eventually_async(
            || {
                let clock = clock.clone();
                let scheduled = scheduled.clone();
                async move {
                    let mut scheduled = scheduled.lock();
                    scheduled.extend(clock.take_scheduled());
                    !scheduled.is_empty()
                }
            },
            "Event behind a slow load was never scheduled",
        )
        .await;

        let scheduled = scheduled.lock();
        assert_eq!(scheduled.len(), 1);
        match scheduled[0].source() {
            Source::Buffer(source) => {
                assert_eq!(source.start, 0.5);
                assert_eq!(source.stop - source.start, one_second().duration());
            }
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn test_silent() {
        Silent.trigger(trigger(json!({"s": "bd"})));
    }
}
