//! Minimum-gap edge filter.
//!
//! An edge is accepted only when at least `window` has passed since the last
//! accepted edge. The only state is one atomic timestamp, so the gate can be
//! consulted from the trigger path without locking or blocking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

const NEVER: u64 = u64::MAX;

#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    origin: Instant,
    /// Nanoseconds since `origin` of the last accepted edge, or `NEVER`.
    last_accepted: AtomicU64,
}

impl DebounceGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            origin: Instant::now(),
            last_accepted: AtomicU64::new(NEVER),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Offer an edge stamped with the monotonic clock.
    pub fn try_accept(&self) -> bool {
        self.try_accept_at(self.origin.elapsed())
    }

    /// Offer an edge that happened `at` after the gate was created.
    ///
    /// Returns `true` and records `at` if the edge is accepted. Rejected edges
    /// leave the recorded timestamp untouched.
    pub fn try_accept_at(&self, at: Duration) -> bool {
        let at = u64::try_from(at.as_nanos()).unwrap_or(NEVER - 1);
        let window = u64::try_from(self.window.as_nanos()).unwrap_or(u64::MAX);

        let mut last = self.last_accepted.load(Ordering::SeqCst);
        loop {
            if last != NEVER && at.saturating_sub(last) < window {
                return false;
            }
            match self.last_accepted.compare_exchange_weak(
                last,
                at,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(current) => last = current,
            }
        }
    }

    /// Time of the last accepted edge relative to the gate's origin.
    pub fn last_accepted(&self) -> Option<Duration> {
        match self.last_accepted.load(Ordering::SeqCst) {
            NEVER => None,
            nanos => Some(Duration::from_nanos(nanos)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(200);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_first_edge_always_accepted() {
        let gate = DebounceGate::new(WINDOW);
        assert_eq!(gate.last_accepted(), None);
        assert!(gate.try_accept_at(ms(0)));
        assert_eq!(gate.last_accepted(), Some(ms(0)));
    }

    #[test]
    fn test_burst_inside_window_keeps_only_first() {
        let gate = DebounceGate::new(WINDOW);
        let accepted: Vec<bool> = [1000, 1010, 1100, 1199]
            .into_iter()
            .map(|t| gate.try_accept_at(ms(t)))
            .collect();
        assert_eq!(accepted, vec![true, false, false, false]);
        assert_eq!(gate.last_accepted(), Some(ms(1000)));
    }

    #[test]
    fn test_edges_at_or_beyond_window_each_accepted() {
        let gate = DebounceGate::new(WINDOW);
        assert!(gate.try_accept_at(ms(0)));
        assert!(gate.try_accept_at(ms(200)));
        assert!(gate.try_accept_at(ms(450)));
        assert!(!gate.try_accept_at(ms(649)));
        assert!(gate.try_accept_at(ms(650)));
    }

    #[test]
    fn test_rejected_edges_do_not_extend_window() {
        let gate = DebounceGate::new(WINDOW);
        assert!(gate.try_accept_at(ms(0)));
        assert!(!gate.try_accept_at(ms(150)));
        // Measured from the accepted edge at 0, not the rejected one at 150
        assert!(gate.try_accept_at(ms(200)));
    }

    #[test]
    fn test_clock_based_accept() {
        let gate = DebounceGate::new(Duration::from_secs(60));
        assert!(gate.try_accept());
        assert!(!gate.try_accept());
    }
}
