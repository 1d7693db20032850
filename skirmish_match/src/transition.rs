// End-of-match delay and next-scenario choice.
//
// Once a node enters Ending it shows the end screen and starts an
// `EndCountdown`. The countdown is consumed by `MatchNode::tick`, never slept
// on, and fires exactly once. What happens when it fires (leave, or have the
// authority start the next match) is decided by the node from its config.
//
// `ScenarioRotation` is the authority's choice of what to load for the next
// match: the current scenario again, or the next entry of the configured
// rotation, wrapping at the end.

#[derive(Clone, Debug, Default)]
pub struct EndCountdown {
    remaining: Option<f32>,
    elapsed: bool,
}

impl EndCountdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, delay_secs: f32) {
        self.remaining = Some(delay_secs.max(0.0));
        self.elapsed = false;
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
        self.elapsed = false;
    }

    pub fn is_running(&self) -> bool {
        self.remaining.is_some()
    }

    /// True once the delay has fully run out (until the next start/cancel).
    pub fn has_elapsed(&self) -> bool {
        self.elapsed
    }

    /// Consume `dt`. Returns true on the one tick where the delay runs out.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.remaining.as_mut() else {
            return false;
        };
        if dt.is_finite() && dt > 0.0 {
            *remaining -= dt;
        }
        if *remaining > 0.0 {
            return false;
        }
        self.remaining = None;
        self.elapsed = true;
        true
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScenarioRotation {
    scenarios: Vec<String>,
    current: usize,
}

impl ScenarioRotation {
    pub fn new(scenarios: Vec<String>) -> Self {
        Self {
            scenarios,
            current: 0,
        }
    }

    /// The scenario currently loaded, if the rotation names any.
    pub fn current(&self) -> Option<&str> {
        self.scenarios.get(self.current).map(String::as_str)
    }

    /// Pick the scenario for the next match. With `rotate` unset, or with an
    /// empty rotation, this is the current one.
    pub fn choose_next(&mut self, rotate: bool) -> Option<&str> {
        if rotate && !self.scenarios.is_empty() {
            self.current = (self.current + 1) % self.scenarios.len();
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn countdown_fires_once() {
        let mut countdown = EndCountdown::new();
        assert!(!countdown.tick(1.0));

        countdown.start(5.0);
        let fired: Vec<bool> = (0..7).map(|_| countdown.tick(1.0)).collect();
        assert_eq!(fired, vec![false, false, false, false, true, false, false]);
        assert!(countdown.has_elapsed());
        assert!(!countdown.is_running());
    }

    #[test]
    fn zero_delay_fires_on_first_tick() {
        let mut countdown = EndCountdown::new();
        countdown.start(0.0);
        assert!(countdown.tick(0.0));
    }

    #[test]
    fn cancel_stops_countdown() {
        let mut countdown = EndCountdown::new();
        countdown.start(1.0);
        countdown.cancel();
        assert!(!countdown.tick(5.0));
        assert!(!countdown.has_elapsed());
    }

    #[test]
    fn rotation_advances_and_wraps() {
        let mut rotation = ScenarioRotation::new(vec!["Dunes".into(), "Foundry".into()]);
        assert_eq!(rotation.current(), Some("Dunes"));
        assert_eq!(rotation.choose_next(true), Some("Foundry"));
        assert_eq!(rotation.choose_next(true), Some("Dunes"));
    }

    #[test]
    fn reuse_keeps_current() {
        let mut rotation = ScenarioRotation::new(vec!["Dunes".into(), "Foundry".into()]);
        assert_eq!(rotation.choose_next(false), Some("Dunes"));
        assert_eq!(rotation.choose_next(false), Some("Dunes"));
    }

    #[test]
    fn empty_rotation_has_no_name() {
        let mut rotation = ScenarioRotation::new(Vec::new());
        assert_eq!(rotation.choose_next(true), None);
    }
}
