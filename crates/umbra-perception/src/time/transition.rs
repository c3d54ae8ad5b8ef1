use std::collections::HashMap;

/// Result of starting a transition.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TransitionOutcome {
    /// A timed interpolation began (or restarted, cancelling the previous
    /// transition of the same name).
    Animated,
    /// The value jumped straight to the target (zero duration or no change).
    Instant,
}

#[derive(Debug)]
struct Active {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    /// Last value this transition applied. Cancellation leaves the consumer
    /// at this value, not at `from` or `to`.
    current: f32,
}

/// Named, cancellable, timed scalar interpolations.
///
/// Used for darkness-level animation: starting a transition under a name
/// cancels any in-flight transition of the same name first, and cancelling
/// leaves the value wherever the animation last put it unless the caller
/// snaps to the target explicitly.
#[derive(Debug, Default)]
pub struct Transitions {
    active: HashMap<String, Active>,
}

impl Transitions {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_running(&self, name: &str) -> bool {
        self.active.contains_key(name)
    }

    /// Starts a linear interpolation from `from` to `to` over `duration`
    /// seconds. Returns whether an animated transition occurred.
    pub fn start(&mut self, name: &str, from: f32, to: f32, duration: f32) -> TransitionOutcome {
        // A restart always cancels the previous transition of this name.
        self.active.remove(name);

        if duration <= 0.0 || from == to {
            return TransitionOutcome::Instant;
        }

        self.active.insert(
            name.to_string(),
            Active {
                from,
                to,
                duration,
                elapsed: 0.0,
                current: from,
            },
        );
        TransitionOutcome::Animated
    }

    /// Cancels the named transition, returning the value it last applied.
    pub fn cancel(&mut self, name: &str) -> Option<f32> {
        self.active.remove(name).map(|a| a.current)
    }

    /// Cancels the named transition and returns its target value, for
    /// callers that want to snap rather than freeze mid-flight.
    pub fn snap_to_target(&mut self, name: &str) -> Option<f32> {
        self.active.remove(name).map(|a| a.to)
    }

    /// Advances all transitions by `dt` seconds, invoking `apply` with each
    /// name and its new value. Completed transitions apply their exact
    /// target and are removed.
    pub fn tick(&mut self, dt: f32, mut apply: impl FnMut(&str, f32)) {
        let mut finished: Vec<String> = Vec::new();

        for (name, a) in self.active.iter_mut() {
            a.elapsed += dt;
            if a.elapsed >= a.duration {
                a.current = a.to;
                finished.push(name.clone());
            } else {
                let t = a.elapsed / a.duration;
                a.current = a.from + (a.to - a.from) * t;
            }
            apply(name, a.current);
        }

        for name in finished {
            self.active.remove(&name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_instant() {
        let mut tr = Transitions::new();
        assert_eq!(tr.start("darkness", 0.0, 1.0, 0.0), TransitionOutcome::Instant);
        assert!(!tr.is_running("darkness"));
    }

    #[test]
    fn no_change_is_instant() {
        let mut tr = Transitions::new();
        assert_eq!(tr.start("darkness", 0.4, 0.4, 2.0), TransitionOutcome::Instant);
    }

    #[test]
    fn tick_interpolates_and_completes() {
        let mut tr = Transitions::new();
        assert_eq!(tr.start("darkness", 0.0, 1.0, 1.0), TransitionOutcome::Animated);

        let mut last = f32::NAN;
        tr.tick(0.5, |_, v| last = v);
        assert!((last - 0.5).abs() < 1e-6);

        tr.tick(0.6, |_, v| last = v);
        assert_eq!(last, 1.0);
        assert!(!tr.is_running("darkness"));
    }

    #[test]
    fn restart_cancels_in_flight_transition() {
        let mut tr = Transitions::new();
        tr.start("darkness", 0.0, 1.0, 1.0);
        tr.tick(0.25, |_, _| {});

        // Restart from the midpoint toward a new target.
        assert_eq!(tr.start("darkness", 0.25, 0.0, 1.0), TransitionOutcome::Animated);
        let mut last = f32::NAN;
        tr.tick(0.5, |_, v| last = v);
        assert!((last - 0.125).abs() < 1e-6);
    }

    #[test]
    fn cancel_freezes_at_last_applied_value() {
        let mut tr = Transitions::new();
        tr.start("darkness", 0.0, 1.0, 1.0);
        tr.tick(0.3, |_, _| {});
        let frozen = tr.cancel("darkness").unwrap();
        assert!((frozen - 0.3).abs() < 1e-6);
    }

    #[test]
    fn snap_returns_target() {
        let mut tr = Transitions::new();
        tr.start("darkness", 0.0, 1.0, 1.0);
        tr.tick(0.3, |_, _| {});
        assert_eq!(tr.snap_to_target("darkness"), Some(1.0));
        assert!(!tr.is_running("darkness"));
    }
}
