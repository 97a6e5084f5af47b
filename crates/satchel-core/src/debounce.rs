//! Stability debouncing for flappy observation streams

use satchel_util::MonotonicInstant;
use std::time::Duration;

/// What an observation did to the pending window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceVerdict {
    /// No change: the observation matched the stable value or an
    /// already pending candidate.
    Unchanged,
    /// A candidate value is now pending; it qualifies at `deadline`
    /// unless contradicted first.
    Armed { deadline: MonotonicInstant },
    /// A contradicting observation cancelled the pending candidate.
    Disarmed,
}

/// Requires a candidate value to hold for a full window before it
/// becomes stable.
///
/// Repeats of the pending candidate do not extend the window; only a
/// different value resets or cancels it. The very first observation
/// counts as a candidate, so a stream that is stationary from the
/// start still qualifies one window later.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    stable: Option<T>,
    pending: Option<(T, MonotonicInstant)>,
}

impl<T: PartialEq + Clone> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stable: None,
            pending: None,
        }
    }

    /// Feed one raw observation at `now`.
    pub fn observe(&mut self, raw: T, now: MonotonicInstant) -> DebounceVerdict {
        if let Some((candidate, _)) = &self.pending {
            if raw == *candidate {
                return DebounceVerdict::Unchanged;
            }
            if Some(&raw) == self.stable.as_ref() {
                // Back to the stable value before the window elapsed
                self.pending = None;
                return DebounceVerdict::Disarmed;
            }
            let deadline = now + self.window;
            self.pending = Some((raw, deadline));
            return DebounceVerdict::Armed { deadline };
        }

        if Some(&raw) == self.stable.as_ref() {
            return DebounceVerdict::Unchanged;
        }

        let deadline = now + self.window;
        self.pending = Some((raw, deadline));
        DebounceVerdict::Armed { deadline }
    }

    /// Promote the pending candidate if its window has elapsed.
    /// Returns the newly stable value, or None if nothing was due.
    pub fn due(&mut self, now: MonotonicInstant) -> Option<T> {
        let (_, deadline) = self.pending.as_ref()?;
        if now < *deadline {
            return None;
        }
        let (candidate, _) = self.pending.take()?;
        self.stable = Some(candidate.clone());
        Some(candidate)
    }

    /// Deadline of the pending candidate, if one is armed.
    pub fn next_deadline(&self) -> Option<MonotonicInstant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    pub fn stable(&self) -> Option<&T> {
        self.stable.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(30);

    #[test]
    fn test_first_observation_arms() {
        let t0 = MonotonicInstant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        let verdict = debouncer.observe(true, t0);
        assert_eq!(verdict, DebounceVerdict::Armed { deadline: t0 + WINDOW });
        assert_eq!(debouncer.next_deadline(), Some(t0 + WINDOW));
    }

    #[test]
    fn test_candidate_qualifies_after_window() {
        let t0 = MonotonicInstant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.observe(true, t0);

        assert_eq!(debouncer.due(t0 + Duration::from_secs(29)), None);
        assert_eq!(debouncer.due(t0 + WINDOW), Some(true));
        assert_eq!(debouncer.stable(), Some(&true));
        assert_eq!(debouncer.next_deadline(), None);
    }

    #[test]
    fn test_repeat_does_not_extend_window() {
        let t0 = MonotonicInstant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.observe(true, t0);

        let verdict = debouncer.observe(true, t0 + Duration::from_secs(20));
        assert_eq!(verdict, DebounceVerdict::Unchanged);
        // Deadline still counts from the first observation
        assert_eq!(debouncer.next_deadline(), Some(t0 + WINDOW));
    }

    #[test]
    fn test_return_to_stable_disarms() {
        let t0 = MonotonicInstant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.observe(false, t0);
        debouncer.due(t0 + WINDOW);
        assert_eq!(debouncer.stable(), Some(&false));

        debouncer.observe(true, t0 + Duration::from_secs(40));
        let verdict = debouncer.observe(false, t0 + Duration::from_secs(50));
        assert_eq!(verdict, DebounceVerdict::Disarmed);
        assert_eq!(debouncer.next_deadline(), None);
        // The cancelled candidate never qualifies
        assert_eq!(debouncer.due(t0 + Duration::from_secs(100)), None);
    }

    #[test]
    fn test_oscillation_restarts_window_each_flip() {
        let t0 = MonotonicInstant::now();
        let mut debouncer = Debouncer::new(WINDOW);

        // No stable value yet, so each flip re-arms rather than disarms
        debouncer.observe(false, t0);
        debouncer.observe(true, t0 + Duration::from_secs(25));
        debouncer.observe(false, t0 + Duration::from_secs(40));
        debouncer.observe(true, t0 + Duration::from_secs(50));

        assert_eq!(
            debouncer.next_deadline(),
            Some(t0 + Duration::from_secs(80))
        );
        assert_eq!(debouncer.due(t0 + Duration::from_secs(79)), None);
        assert_eq!(debouncer.due(t0 + Duration::from_secs(80)), Some(true));
    }

    #[test]
    fn test_due_is_empty_without_candidate() {
        let t0 = MonotonicInstant::now();
        let mut debouncer: Debouncer<bool> = Debouncer::new(WINDOW);
        assert_eq!(debouncer.due(t0 + Duration::from_secs(100)), None);
        assert_eq!(debouncer.next_deadline(), None);
    }
}
