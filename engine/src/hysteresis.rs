//! Hold/re-arm/lockout timer shared by trigger rules, dwell clicks and the
//! gesture toggle channel.
//!
//! A condition must stay true for `hold_ms` before the timer fires.  After
//! a fire the hold restarts from scratch; `rearm_ms` is checked once a hold
//! completes (the hold is kept while re-arming), and `lockout_ms` blocks
//! every sample outright until it expires.  Timestamps are caller-supplied
//! monotonic milliseconds.

/// Result of a single `sample` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldOutcome {
    /// Condition false; hold cleared.
    Released,
    /// Condition just became true; hold started this sample.
    Armed,
    /// Hold in progress but not long enough yet.
    Holding { elapsed_ms: u64 },
    /// Hold complete but the re-arm window since the last fire is still open.
    Rearming { remaining_ms: u64 },
    /// Hold complete and re-armed; the caller should act.
    Fired,
    /// Inside the post-fire lockout window.
    Locked { remaining_ms: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct HysteresisTimer {
    /// Minimum continuous hold before a fire.
    pub hold_ms: u64,
    /// Minimum time between fires, checked after the hold completes.
    pub rearm_ms: u64,
    /// Hard block after a fire.
    pub lockout_ms: u64,
    hold_start: Option<u64>,
    last_fired: Option<u64>,
    lockout_until: Option<u64>,
}

impl HysteresisTimer {
    pub fn new(hold_ms: u64, rearm_ms: u64, lockout_ms: u64) -> Self {
        Self {
            hold_ms,
            rearm_ms,
            lockout_ms,
            ..Self::default()
        }
    }

    /// Feed one sample of the condition at `now_ms`.
    pub fn sample(&mut self, condition: bool, now_ms: u64) -> HoldOutcome {
        if let Some(remaining_ms) = self.lockout_remaining(now_ms) {
            return HoldOutcome::Locked { remaining_ms };
        }
        if !condition {
            self.hold_start = None;
            return HoldOutcome::Released;
        }
        let Some(start) = self.hold_start else {
            self.hold_start = Some(now_ms);
            return HoldOutcome::Armed;
        };

        let elapsed_ms = now_ms.saturating_sub(start);
        if elapsed_ms < self.hold_ms {
            return HoldOutcome::Holding { elapsed_ms };
        }
        if let Some(last) = self.last_fired {
            let since = now_ms.saturating_sub(last);
            if since < self.rearm_ms {
                return HoldOutcome::Rearming {
                    remaining_ms: self.rearm_ms - since,
                };
            }
        }

        self.last_fired = Some(now_ms);
        self.hold_start = None;
        if self.lockout_ms > 0 {
            self.lockout_until = Some(now_ms.saturating_add(self.lockout_ms));
        }
        HoldOutcome::Fired
    }

    /// Remaining lockout at `now_ms`, clearing the lockout once it has expired.
    pub fn lockout_remaining(&mut self, now_ms: u64) -> Option<u64> {
        match self.lockout_until {
            Some(until) if now_ms < until => Some(until - now_ms),
            Some(_) => {
                self.lockout_until = None;
                None
            }
            None => None,
        }
    }

    /// Start a fresh hold at `now_ms` regardless of the current hold.
    pub fn restart(&mut self, now_ms: u64) {
        self.hold_start = Some(now_ms);
    }

    /// Drop the current hold.  Fire history and lockout are kept.
    pub fn release(&mut self) {
        self.hold_start = None;
    }

    pub fn clear_lockout(&mut self) {
        self.lockout_until = None;
    }

    pub fn is_holding(&self) -> bool {
        self.hold_start.is_some()
    }

    pub fn last_fired(&self) -> Option<u64> {
        self.last_fired
    }

    /// Forget hold, fire history and lockout.
    pub fn reset(&mut self) {
        self.hold_start = None;
        self.last_fired = None;
        self.lockout_until = None;
    }
}
