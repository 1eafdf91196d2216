//! Generation lifecycle state.
//!
//! One request is in flight at a time. Every submission gets a fresh
//! monotonically increasing id, and a completion is only accepted while its
//! id matches the current Loading phase, so a slow superseded request can
//! never overwrite a newer result.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone)]
pub enum Phase {
    Idle,
    Loading {
        request: RequestId,
        started: Instant,
    },
    Done {
        request: RequestId,
        elapsed: Duration,
    },
    Failed {
        message: String,
    },
}

pub struct GenerationSession {
    next_request: u64,
    phase: Phase,
}

impl GenerationSession {
    pub fn new() -> Self {
        Self {
            next_request: 0,
            phase: Phase::Idle,
        }
    }

    /// Enters Loading and returns the id the eventual completion must carry.
    pub fn begin(&mut self) -> RequestId {
        self.next_request += 1;
        let request = RequestId(self.next_request);
        self.phase = Phase::Loading {
            request,
            started: Instant::now(),
        };
        request
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn controls_enabled(&self) -> bool {
        !self.is_loading()
    }

    /// Accepts a successful completion; returns false for a stale id.
    pub fn complete_success(&mut self, request: RequestId) -> bool {
        match &self.phase {
            Phase::Loading {
                request: current,
                started,
            } if *current == request => {
                let elapsed = started.elapsed();
                self.phase = Phase::Done { request, elapsed };
                true
            }
            _ => false,
        }
    }

    /// Accepts a failed completion; returns false for a stale id.
    pub fn complete_failure(&mut self, request: RequestId, message: impl Into<String>) -> bool {
        match &self.phase {
            Phase::Loading {
                request: current, ..
            } if *current == request => {
                self.phase = Phase::Failed {
                    message: message.into(),
                };
                true
            }
            _ => false,
        }
    }

    pub fn loading_elapsed(&self) -> Option<Duration> {
        match &self.phase {
            Phase::Loading { started, .. } => Some(started.elapsed()),
            _ => None,
        }
    }

    pub fn final_elapsed(&self) -> Option<Duration> {
        match &self.phase {
            Phase::Done { elapsed, .. } => Some(*elapsed),
            _ => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failed { message } => Some(message),
            _ => None,
        }
    }
}

impl Default for GenerationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole seconds, for the live counter shown while loading.
pub fn format_running_elapsed(elapsed: Duration) -> String {
    format!("{}s", elapsed.as_secs())
}

/// One decimal place, for the final "Done in ..." badge.
pub fn format_final_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_enters_loading_and_disables_controls() {
        let mut session = GenerationSession::new();
        assert!(session.controls_enabled());

        let request = session.begin();
        assert!(session.is_loading());
        assert!(!session.controls_enabled());
        assert!(session.loading_elapsed().is_some());
        assert_eq!(request, RequestId(1));
    }

    #[test]
    fn success_completion_reenables_controls_and_records_elapsed() {
        let mut session = GenerationSession::new();
        let request = session.begin();

        assert!(session.complete_success(request));
        assert!(session.controls_enabled());
        assert!(session.final_elapsed().is_some());
        assert!(session.loading_elapsed().is_none());
    }

    #[test]
    fn failure_completion_reenables_controls_and_keeps_message() {
        let mut session = GenerationSession::new();
        let request = session.begin();

        assert!(session.complete_failure(request, "bad prompt"));
        assert!(session.controls_enabled());
        assert_eq!(session.failure_message(), Some("bad prompt"));
    }

    #[test]
    fn stale_completion_does_not_disturb_newer_request() {
        let mut session = GenerationSession::new();
        let first = session.begin();
        let second = session.begin();
        assert_ne!(first, second);

        // The slow first request finishing late must be ignored.
        assert!(!session.complete_success(first));
        assert!(session.is_loading());

        assert!(session.complete_success(second));
        assert!(session.final_elapsed().is_some());
    }

    #[test]
    fn completions_after_settling_are_ignored() {
        let mut session = GenerationSession::new();
        let request = session.begin();
        assert!(session.complete_failure(request, "boom"));

        assert!(!session.complete_success(request));
        assert_eq!(session.failure_message(), Some("boom"));
    }

    #[test]
    fn elapsed_formats() {
        assert_eq!(format_running_elapsed(Duration::from_millis(1_250)), "1s");
        assert_eq!(format_running_elapsed(Duration::ZERO), "0s");
        assert_eq!(format_final_elapsed(Duration::from_millis(2_340)), "2.3s");
        assert_eq!(format_final_elapsed(Duration::ZERO), "0.0s");
    }
}
