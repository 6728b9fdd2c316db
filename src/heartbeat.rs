//! Heartbeat liveness monitor.
//!
//! A single counter carried on the active connection. Every idle tick (no
//! bytes available) increments it; any successful read resets it to zero.
//! On connect it starts at a negative grace value so normal startup jitter
//! does not immediately look like an idle timeout. Reaching the limit is
//! the sole liveness-timeout trigger and feeds the same teardown path as an
//! I/O error, while staying distinguishable in diagnostics.

/// Counts consecutive idle ticks on the active connection.
///
/// One monitor exists per connection epoch; a reconnect gets a fresh
/// monitor and with it a fresh grace window.
#[derive(Debug)]
pub(crate) struct HeartbeatMonitor {
    missed: i32,
    limit: i32,
}

impl HeartbeatMonitor {
    /// Create a monitor in the just-connected state (`missed = -grace`).
    pub(crate) fn new(grace: i32, limit: i32) -> Self {
        Self {
            missed: -grace,
            limit,
        }
    }

    /// Record an idle tick. Returns `true` when the miss limit is reached.
    pub(crate) fn mark_idle(&mut self) -> bool {
        self.missed += 1;
        self.missed >= self.limit
    }

    /// Record a successful read.
    pub(crate) fn mark_active(&mut self) {
        self.missed = 0;
    }

    /// Current miss count (negative while inside the grace window).
    pub(crate) fn missed(&self) -> i32 {
        self.missed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expires_at_limit() {
        let mut hb = HeartbeatMonitor::new(0, 3);
        assert!(!hb.mark_idle());
        assert!(!hb.mark_idle());
        assert!(hb.mark_idle());
    }

    #[test]
    fn test_grace_absorbs_initial_idle_ticks() {
        // With grace 5 and limit 3, expiry takes 5 + 3 idle ticks.
        let mut hb = HeartbeatMonitor::new(5, 3);
        for _ in 0..7 {
            assert!(!hb.mark_idle());
        }
        assert!(hb.mark_idle());
    }

    #[test]
    fn test_read_resets_counter() {
        let mut hb = HeartbeatMonitor::new(0, 3);
        hb.mark_idle();
        hb.mark_idle();
        hb.mark_active();
        assert_eq!(hb.missed(), 0);
        assert!(!hb.mark_idle());
        assert!(!hb.mark_idle());
        assert!(hb.mark_idle());
    }

    #[test]
    fn test_fresh_monitor_starts_in_grace_window() {
        let hb = HeartbeatMonitor::new(2, 3);
        assert_eq!(hb.missed(), -2);
    }

    #[test]
    fn test_reset_after_read_skips_grace() {
        // Grace applies to a fresh connection only; after traffic the
        // counter restarts at zero, not at -grace.
        let mut hb = HeartbeatMonitor::new(5, 3);
        hb.mark_active();
        assert!(!hb.mark_idle());
        assert!(!hb.mark_idle());
        assert!(hb.mark_idle());
    }
}
