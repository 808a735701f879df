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
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Default priority for the mixing thread when HAPSYNTH_THREAD_PRIORITY is unset.
const DEFAULT_MIX_THREAD_PRIORITY: u8 = 70;

/// Reads HAPSYNTH_THREAD_PRIORITY (0-99), falling back to the default.
pub fn mix_thread_priority() -> ThreadPriority {
    std::env::var("HAPSYNTH_THREAD_PRIORITY")
        .ok()
        .and_then(|v| parse_priority(&v))
        .or_else(|| ThreadPriorityValue::try_from(DEFAULT_MIX_THREAD_PRIORITY).ok())
        .map(ThreadPriority::Crossplatform)
        .unwrap_or(ThreadPriority::Max)
}

fn parse_priority(value: &str) -> Option<ThreadPriorityValue> {
    let n = value.trim().parse::<u8>().ok()?;
    if n >= 100 {
        return None;
    }
    ThreadPriorityValue::try_from(n).ok()
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

fn is_truthy(value: &str) -> bool {
    value == "1"
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("on")
}

/// Whether to attempt RT (SCHED_FIFO) scheduling for the mixing thread.
/// Enabled unless HAPSYNTH_DISABLE_RT_AUDIO is set.
pub fn rt_audio_enabled() -> bool {
    !env_flag("HAPSYNTH_DISABLE_RT_AUDIO")
}

/// Raises the current thread's priority. Failures are logged, not fatal.
pub fn configure_mix_thread_priority(tp: ThreadPriority, rt_audio: bool) {
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = %e, "Failed to raise mixing thread priority");
    }

    #[cfg(unix)]
    if rt_audio {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled RT SCHED_FIFO for mixing thread"),
            Err(e) => warn!(error = %e, "Failed to set RT SCHED_FIFO for mixing thread"),
        }
    }

    #[cfg(not(unix))]
    let _ = rt_audio;
}
