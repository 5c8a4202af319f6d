use crate::{error::KeeperResult, keeper::DriftCheck};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Drifted { first_difference: Option<usize> },
    BackInSync,
    Failed(String),
}

/// Polling state for the "changed externally" check.
///
/// Scheduler agnostic: callers ask [`DriftMonitor::begin`] whether a check may
/// run now and report back through [`DriftMonitor::finish`]. A tick that
/// arrives while the shell is busy or while a check is still running is
/// dropped, not queued.
#[derive(Debug, Clone)]
pub struct DriftMonitor {
    interval: Duration,
    enabled: bool,
    in_flight: bool,
    last_started: Option<Instant>,
    changed_externally: bool,
    last_error: Option<String>,
}

impl DriftMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            enabled: false,
            in_flight: false,
            last_started: None,
            changed_externally: false,
            last_error: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_checking(&self) -> bool {
        self.in_flight
    }

    pub fn changed_externally(&self) -> bool {
        self.changed_externally
    }

    /// Monitoring only runs with a valid configuration and an existing
    /// reference; switching it off clears the drift flag.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        self.last_started = None;
        if !enabled {
            self.changed_externally = false;
            self.last_error = None;
        }
    }

    /// Makes the next [`begin`](Self::begin) run regardless of the interval.
    pub fn request_check(&mut self) {
        self.last_started = None;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_started {
            Some(started) => now.saturating_duration_since(started) >= self.interval,
            None => true,
        }
    }

    /// Claims the check slot. Returns false when disabled, busy, already
    /// checking, or not yet due.
    pub fn begin(&mut self, now: Instant, busy: bool) -> bool {
        if !self.enabled || busy || self.in_flight || !self.is_due(now) {
            return false;
        }
        self.in_flight = true;
        self.last_started = Some(now);
        true
    }

    /// Releases the check slot and reports a state change, if any.
    pub fn finish(&mut self, result: KeeperResult<DriftCheck>) -> Option<MonitorEvent> {
        self.in_flight = false;
        match result {
            Ok(check) => {
                self.last_error = None;
                if !self.enabled || check.drifted == self.changed_externally {
                    return None;
                }
                self.changed_externally = check.drifted;
                Some(if check.drifted {
                    MonitorEvent::Drifted {
                        first_difference: check.first_difference,
                    }
                } else {
                    MonitorEvent::BackInSync
                })
            }
            Err(err) => {
                let message = err.to_string();
                if self.last_error.as_deref() == Some(message.as_str()) {
                    return None;
                }
                self.last_error = Some(message.clone());
                Some(MonitorEvent::Failed(message))
            }
        }
    }

    /// Runs `check` if a tick is due, enforcing the busy and reentrancy rules.
    pub fn run_if_due<F>(&mut self, now: Instant, busy: bool, check: F) -> Option<MonitorEvent>
    where
        F: FnOnce() -> KeeperResult<DriftCheck>,
    {
        if !self.begin(now, busy) {
            return None;
        }
        self.finish(check())
    }
}
