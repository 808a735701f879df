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

/// A scheduled change to a parameter's value.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    /// Jump to the value at the given time.
    Set { time: f64, value: f32 },
    /// Ramp linearly from the previous event to the value, arriving at the given time.
    LinearRamp { time: f64, value: f32 },
}

impl Automation {
    fn time(&self) -> f64 {
        match self {
            Automation::Set { time, .. } | Automation::LinearRamp { time, .. } => *time,
        }
    }

    fn value(&self) -> f32 {
        match self {
            Automation::Set { value, .. } | Automation::LinearRamp { value, .. } => *value,
        }
    }
}

/// A value that changes over absolute time.
///
/// Events are kept sorted by time. Events sharing a time keep their
/// insertion order, so the most recently added one wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Value before the first event.
    initial: f32,
    events: Vec<Automation>,
}

impl Param {
    /// Creates a parameter holding a constant value.
    pub fn new(initial: f32) -> Param {
        Param {
            initial,
            events: Vec::new(),
        }
    }

    /// Jumps to the value at the given time.
    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> &mut Param {
        self.insert(Automation::Set { time, value });
        self
    }

    /// Ramps linearly from the previous event's value, arriving at this value at the given time.
    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> &mut Param {
        self.insert(Automation::LinearRamp { time, value });
        self
    }

    fn insert(&mut self, event: Automation) {
        let index = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(index, event);
    }

    /// The value at the given time.
    pub fn value_at(&self, time: f64) -> f32 {
        let passed = self.events.partition_point(|e| e.time() <= time);

        let Some(previous) = passed.checked_sub(1).map(|i| self.events[i]) else {
            return self.initial;
        };

        match self.events.get(passed) {
            Some(Automation::LinearRamp {
                time: end,
                value: target,
            }) => {
                let start = previous.time();
                let progress = ((time - start) / (end - start)) as f32;
                previous.value() + (target - previous.value()) * progress
            }
            _ => previous.value(),
        }
    }

    /// The time of the last scheduled event, if any.
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.last().map(Automation::time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let param = Param::new(0.3);
        assert_eq!(param.value_at(0.0), 0.3);
        assert_eq!(param.value_at(100.0), 0.3);
        assert_eq!(param.last_event_time(), None);
    }

    #[test]
    fn test_set_and_ramp() {
        let mut param = Param::new(1.0);
        param
            .set_value_at_time(0.0, 1.0)
            .linear_ramp_to_value_at_time(1.0, 2.0)
            .set_value_at_time(1.0, 3.0)
            .linear_ramp_to_value_at_time(0.0, 4.0);

        assert_eq!(param.value_at(0.5), 1.0);
        assert_eq!(param.value_at(1.0), 0.0);
        assert!((param.value_at(1.5) - 0.5).abs() < 1e-6);
        assert_eq!(param.value_at(2.0), 1.0);
        assert_eq!(param.value_at(2.5), 1.0);
        assert!((param.value_at(3.25) - 0.75).abs() < 1e-6);
        assert_eq!(param.value_at(4.0), 0.0);
        assert_eq!(param.value_at(10.0), 0.0);
        assert_eq!(param.last_event_time(), Some(4.0));
    }

    #[test]
    fn test_events_sorted_by_time() {
        let mut param = Param::new(0.0);
        param
            .linear_ramp_to_value_at_time(1.0, 2.0)
            .set_value_at_time(0.0, 1.0);

        assert!((param.value_at(1.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_instant_ramp() {
        let mut param = Param::new(0.0);
        param
            .set_value_at_time(0.0, 1.0)
            .linear_ramp_to_value_at_time(0.8, 1.0);

        assert_eq!(param.value_at(1.0), 0.8);
    }
}
