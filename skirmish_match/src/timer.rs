// Authoritative match clock.
//
// Only the authority counts down. `tick(dt)` subtracts the frame's elapsed
// seconds, clamps at zero, and reports two things: whether a TimerSync
// broadcast is due and whether the clock has run out. The broadcast cadence
// uses a rolling deficit accumulator, so a long frame carries its overshoot
// into the next interval instead of dropping it. A single tick never reports
// more than one due sync.
//
// Non-authority nodes hold the same struct as a passive shadow: `adopt`
// overwrites it with the whole seconds received in a TimerSync, and it is
// never ticked. When the authority hands over, the new authority resumes
// counting from its shadow value.

/// What one tick of the clock produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerTick {
    pub sync_due: bool,
    /// The clock is at zero. Stays true on every later tick; callers rely on
    /// the phase machine to act on it only once.
    pub expired: bool,
}

#[derive(Clone, Debug)]
pub struct AuthoritativeTimer {
    remaining: f32,
    sync_interval: f32,
    sync_accumulator: f32,
}

impl AuthoritativeTimer {
    pub fn new(length_secs: f32, sync_interval_secs: f32) -> Self {
        Self {
            remaining: length_secs.max(0.0),
            sync_interval: sync_interval_secs,
            sync_accumulator: 0.0,
        }
    }

    /// Seconds left, with the fractional part.
    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Seconds left, truncated. This is the value that goes on the wire.
    pub fn remaining_whole_seconds(&self) -> u32 {
        self.remaining as u32
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }

    /// Restart the countdown at `length_secs`.
    pub fn reset(&mut self, length_secs: f32) {
        self.remaining = length_secs.max(0.0);
        self.sync_accumulator = 0.0;
    }

    /// Overwrite the shadow with a value received from the authority.
    pub fn adopt(&mut self, remaining_seconds: u32) {
        self.remaining = remaining_seconds as f32;
    }

    /// Advance the authority's clock by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TimerTick {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.remaining = (self.remaining - dt).max(0.0);

        self.sync_accumulator += dt;
        let sync_due = self.sync_accumulator >= self.sync_interval;
        if sync_due {
            self.sync_accumulator -= self.sync_interval;
        }

        TimerTick {
            sync_due,
            expired: self.is_expired(),
        }
    }

    /// `mm:ss` text for the clock display.
    pub fn display_text(&self) -> String {
        format_clock(self.remaining_whole_seconds())
    }
}

/// Minutes and seconds, both zero-padded to two digits. Minutes keep
/// growing past 99 rather than wrapping.
pub fn format_clock(total_seconds: u32) -> String {
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
