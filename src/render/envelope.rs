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
use crate::dsp::Param;

/// A linear ADSR gain curve at absolute clock times.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub onset: f64,
    pub attack_end: f64,
    pub decay_end: f64,
    pub sustain_end: f64,
    pub release_end: f64,
    /// Level reached at the end of the attack.
    pub peak: f32,
    /// Level held from the end of the decay until the release.
    pub sustain_level: f32,
}

impl Envelope {
    /// Builds an envelope starting at `onset` that begins its release at
    /// `sustain_end`.
    pub fn adsr(
        attack: f64,
        decay: f64,
        sustain: f64,
        release: f64,
        velocity: f64,
        onset: f64,
        sustain_end: f64,
    ) -> Envelope {
        Envelope {
            onset,
            attack_end: onset + attack,
            decay_end: onset + attack + decay,
            sustain_end,
            release_end: sustain_end + release,
            peak: velocity as f32,
            sustain_level: (sustain * velocity) as f32,
        }
    }

    /// The five (time, level) points the curve passes through.
    pub fn breakpoints(&self) -> [(f64, f32); 5] {
        [
            (self.onset, 0.0),
            (self.attack_end, self.peak),
            (self.decay_end, self.sustain_level),
            (self.sustain_end, self.sustain_level),
            (self.release_end, 0.0),
        ]
    }

    /// The curve as a gain automation.
    pub fn to_param(&self) -> Param {
        let mut param = Param::new(0.0);
        param
            .set_value_at_time(0.0, self.onset)
            .linear_ramp_to_value_at_time(self.peak, self.attack_end)
            .linear_ramp_to_value_at_time(self.sustain_level, self.decay_end)
            .set_value_at_time(self.sustain_level, self.sustain_end)
            .linear_ramp_to_value_at_time(0.0, self.release_end);
        param
    }
}
