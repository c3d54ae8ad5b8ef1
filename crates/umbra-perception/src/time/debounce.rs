use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Keyed delayed-task scheduler with cancel-and-reschedule semantics.
///
/// Each key holds at most one pending value. Scheduling again for the same
/// key replaces the value and restarts the delay, so a rapid burst of
/// toggles commits only the final state once the key has been quiet for the
/// full delay. This is a smoothing policy, not a lock: commits are delayed,
/// never dropped, unless explicitly cancelled.
///
/// Time is passed in by the caller so frame loops and tests share one code
/// path.
#[derive(Debug)]
pub struct DebounceQueue<K, T> {
    delay: Duration,
    pending: HashMap<K, Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    due: Instant,
}

impl<K: Eq + Hash + Clone, T> DebounceQueue<K, T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    #[inline]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedules `value` for `key`, replacing any pending value for the same
    /// key and restarting its delay from `now`.
    pub fn schedule(&mut self, key: K, value: T, now: Instant) {
        self.pending.insert(
            key,
            Pending {
                value,
                due: now + self.delay,
            },
        );
    }

    /// Pending value for `key`, if any. Callers that re-evaluate state every
    /// frame use this to avoid restarting the delay for an unchanged value.
    pub fn pending(&self, key: &K) -> Option<&T> {
        self.pending.get(key).map(|p| &p.value)
    }

    /// Drops any pending value for `key`. Missing keys are already absent.
    pub fn cancel(&mut self, key: &K) {
        self.pending.remove(key);
    }

    /// Applies every task whose delay has elapsed at `now` and removes it.
    pub fn run_due(&mut self, now: Instant, mut apply: impl FnMut(&K, T)) {
        let due: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in due {
            if let Some(p) = self.pending.remove(&key) {
                apply(&key, p.value);
            }
        }
    }
}
