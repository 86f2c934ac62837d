//! Fade scheduler: fixed-tick opacity interpolation (spec §3.5, §4.4).
//!
//! Grounded on the teacher's frame-budget clock in
//! `userland/src/apps/compositor/mod.rs` (a monotonic tick counter driving
//! animation state) generalized from a fixed per-frame increment to the
//! variable `steps` catch-up the spec requires when the loop falls behind.

use std::collections::HashMap;

use crate::window::WindowId;

/// Default tick period in milliseconds (spec §3.5).
pub const DEFAULT_FADE_DELTA_MS: u64 = 10;

/// One window's in-flight fade (spec §3.5: `{start, target, step, callback}`).
/// The callback itself is not stored here — it is looked up by id from the
/// owner at completion time, since the callback may free the window and the
/// scheduler is generic over what "completion" means for a given caller.
#[derive(Copy, Clone, Debug)]
struct FadeEntry {
    current: i64,
    target: i64,
    step: i64,
}

/// What happened to a window this tick, returned so the caller (the event
/// demultiplexer / main loop) can react — e.g. finalize an unmap or destroy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FadeOutcome {
    /// Still fading; `current` opacity updated in place by the caller.
    Advancing(i64),
    /// Reached target this tick; fade removed, snapped to `target`.
    Completed(i64),
}

/// Process-wide fade clock and table of in-flight fades (spec §3.5).
pub struct FadeScheduler {
    fade_time: u64,
    fade_delta: u64,
    fades: HashMap<WindowId, FadeEntry>,
}

impl FadeScheduler {
    pub fn new(fade_delta: u64) -> Self {
        Self {
            fade_time: 0,
            fade_delta,
            fades: HashMap::new(),
        }
    }

    /// Begin (or replace) a fade for `id` from `start` to `target`, advancing
    /// `step` units of opacity per scheduler tick. `step` must be non-zero in
    /// the direction of `target`; a `start == target` fade is rejected by the
    /// caller before it reaches here (spec §4.2: immediate transition when
    /// fades are disabled for the type).
    pub fn start(&mut self, id: WindowId, start: i64, target: i64, step: i64) {
        let signed_step = if target >= start {
            step.abs()
        } else {
            -step.abs()
        };
        self.fades.insert(
            id,
            FadeEntry {
                current: start,
                target,
                step: signed_step,
            },
        );
    }

    pub fn cancel(&mut self, id: WindowId) {
        self.fades.remove(&id);
    }

    pub fn is_fading(&self, id: WindowId) -> bool {
        self.fades.contains_key(&id)
    }

    pub fn current(&self, id: WindowId) -> Option<i64> {
        self.fades.get(&id).map(|f| f.current)
    }

    /// Advance all fades given the current monotonic time, seeding
    /// `fade_time` on first use. Returns `(id, outcome)` pairs in
    /// unspecified order; the caller applies each outcome to its own window
    /// record and, for `Completed`, re-reads the table before invoking any
    /// side effect that might itself mutate fades (spec §4.4: "re-read the
    /// next pointer before invoking" — here that means collecting the full
    /// list up front rather than iterating the live map while callbacks run).
    pub fn tick(&mut self, now_ms: u64, clamp_min: i64, clamp_max: i64) -> Vec<(WindowId, FadeOutcome)> {
        if self.fade_time == 0 {
            self.fade_time = now_ms + self.fade_delta;
            return Vec::new();
        }
        if now_ms < self.fade_time {
            return Vec::new();
        }
        let steps = 1 + (now_ms - self.fade_time) / self.fade_delta;
        let mut results = Vec::new();
        let mut completed = Vec::new();
        for (&id, entry) in self.fades.iter_mut() {
            let before_sign = (entry.current - entry.target).signum();
            entry.current += entry.step * steps as i64;
            entry.current = entry.current.clamp(clamp_min, clamp_max);
            let after_sign = (entry.current - entry.target).signum();
            if after_sign == 0 || (before_sign != 0 && after_sign != before_sign) {
                entry.current = entry.target;
                completed.push(id);
                results.push((id, FadeOutcome::Completed(entry.current)));
            } else {
                results.push((id, FadeOutcome::Advancing(entry.current)));
            }
        }
        for id in completed {
            self.fades.remove(&id);
        }
        self.fade_time = now_ms + self.fade_delta;
        results
    }

    /// Milliseconds until the next tick is due, or `None` if no fade is
    /// pending ("infinite" for the main-loop poll, spec §4.4).
    pub fn fade_timeout(&self, now_ms: u64) -> Option<u64> {
        if self.fades.is_empty() {
            None
        } else if self.fade_time <= now_ms {
            Some(0)
        } else {
            Some(self.fade_time - now_ms)
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.fades.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_timeout_is_none_with_no_fades() {
        let sched = FadeScheduler::new(DEFAULT_FADE_DELTA_MS);
        assert_eq!(sched.fade_timeout(0), None);
    }

    #[test]
    fn first_tick_seeds_clock_without_advancing() {
        let mut sched = FadeScheduler::new(10);
        sched.start(1, 0, 100, 10);
        let out = sched.tick(1000, 0, 0xffff_ffffu32 as i64);
        assert!(out.is_empty());
        assert_eq!(sched.current(1), Some(0));
    }

    #[test]
    fn advances_then_completes_on_target_cross() {
        let mut sched = FadeScheduler::new(10);
        sched.start(1, 0, 25, 10);
        sched.tick(1000, 0, 0xffff_ffffu32 as i64); // seed
        let out = sched.tick(1010, 0, 0xffff_ffffu32 as i64);
        assert_eq!(out, vec![(1, FadeOutcome::Advancing(10))]);
        let out = sched.tick(1020, 0, 0xffff_ffffu32 as i64);
        assert_eq!(out, vec![(1, FadeOutcome::Advancing(20))]);
        let out = sched.tick(1030, 0, 0xffff_ffffu32 as i64);
        assert_eq!(out, vec![(1, FadeOutcome::Completed(25))]);
        assert!(!sched.is_fading(1));
    }

    #[test]
    fn catch_up_applies_multiple_steps_at_once() {
        let mut sched = FadeScheduler::new(10);
        sched.start(1, 0, 100, 5);
        sched.tick(1000, 0, 0xffff_ffffu32 as i64); // seed at fade_time = 1010
        // Jump far ahead: (1055 - 1010) / 10 = 4, so steps = 5.
        let out = sched.tick(1055, 0, 0xffff_ffffu32 as i64);
        assert_eq!(out, vec![(1, FadeOutcome::Advancing(25))]);
    }

    #[test]
    fn fade_out_direction_is_negative() {
        let mut sched = FadeScheduler::new(10);
        sched.start(1, 100, 0, 10);
        sched.tick(1000, 0, 200);
        let out = sched.tick(1010, 0, 200);
        assert_eq!(out, vec![(1, FadeOutcome::Advancing(90))]);
    }
}
