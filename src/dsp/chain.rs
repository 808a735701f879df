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
use super::{Frame, Source, Stage, StageKind};

/// A single source wired through a linear list of stages.
///
/// A chain is built for one event and discarded once its source stops.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    source: Source,
    stages: Vec<Stage>,
}

impl Chain {
    pub fn new(source: Source, stages: Vec<Stage>) -> Chain {
        Chain { source, stages }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The stage layout, in signal order.
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(Stage::kind).collect()
    }

    pub fn start(&self) -> f64 {
        self.source.start()
    }

    pub fn stop(&self) -> f64 {
        self.source.stop()
    }

    /// Whether the chain will produce no more sound at or after this time.
    pub fn is_finished(&self, time: f64) -> bool {
        time >= self.stop()
    }

    /// The combined level of every gain stage at a time.
    pub fn gain_at(&self, time: f64) -> f32 {
        self.stages
            .iter()
            .filter_map(|stage| match stage {
                Stage::Gain(gain) => Some(gain.level.value_at(time)),
                _ => None,
            })
            .product()
    }

    /// Renders one frame at an absolute time. Stages run even while the
    /// source is silent so filter state decays naturally.
    pub fn render(&mut self, time: f64) -> Frame {
        let mono = self.source.is_mono();
        let frame = self.source.frame_at(time);
        self.stages
            .iter_mut()
            .fold(frame, |frame, stage| stage.process(frame, time, mono))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Gain, Oscillator, Param, Waveform};

    #[test]
    fn test_chain_renders_through_stages() {
        let mut envelope = Param::new(0.0);
        envelope.set_value_at_time(1.0, 0.0);
        let mut chain = Chain::new(
            Source::Oscillator(Oscillator::new(Waveform::Square, 1.0, 0.0, 1.0)),
            vec![Stage::Gain(Gain::fixed(0.5)), Stage::Gain(Gain::new(envelope))],
        );

        assert_eq!(chain.kinds(), vec![StageKind::Gain, StageKind::Gain]);
        assert_eq!(chain.render(0.1), [0.5, 0.5]);
        assert_eq!(chain.gain_at(0.1), 0.5);
        assert!(!chain.is_finished(0.5));
        assert!(chain.is_finished(1.0));
        assert_eq!(chain.render(1.5), [0.0, 0.0]);
    }
}
