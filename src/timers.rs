use std::time::Duration;

/// Budget for an interstitial to be shown and closed.
pub const SHOW_FALLBACK: Duration = Duration::from_secs(5);

/// Budget from session end to the results screen.
pub const END_FALLBACK: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TimerKind {
    ShowFallback,
    EndFallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Deadline {
    kind: TimerKind,
    remaining: Duration,
}

/// One-shot deadlines advanced by the fixed tick rather than the wall clock.
#[derive(Debug, Default)]
pub struct FallbackTimers {
    pending: Vec<Deadline>,
}

impl FallbackTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `kind`, replacing any deadline of the same kind.
    pub fn arm(&mut self, kind: TimerKind, after: Duration) {
        self.cancel(kind);
        self.pending.push(Deadline {
            kind,
            remaining: after,
        });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        self.pending.retain(|d| d.kind != kind);
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|d| d.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Advances every deadline by `dt` and returns the ones that expired, in arming order.
    pub fn advance(&mut self, dt: Duration) -> Vec<TimerKind> {
        let mut fired = Vec::new();
        self.pending.retain_mut(|d| {
            d.remaining = d.remaining.saturating_sub(dt);
            if d.remaining.is_zero() {
                fired.push(d.kind);
                false
            } else {
                true
            }
        });
        fired
    }
}
