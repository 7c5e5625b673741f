//! Idempotent start/stop state machine shared by engine adapters.

use std::{fmt, sync::Mutex};

use {serde::Serialize, tracing::debug};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LifecycleState {
    #[default]
    Stopped,
    Running,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Running => f.write_str("running"),
        }
    }
}

/// Serialises lifecycle transitions and skips the ones that would not change
/// the state, so supervisors may call `start`/`stop` as often as they like.
#[derive(Debug, Default)]
pub struct LifecycleGuard {
    state: Mutex<LifecycleState>,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Run `start` unless already running. The state only changes when
    /// `start` succeeds.
    pub fn start_with<F>(&self, start: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == LifecycleState::Running {
            debug!("start requested while running, ignoring");
            return Ok(());
        }
        start()?;
        *state = LifecycleState::Running;
        Ok(())
    }

    /// Run `stop` unless already stopped.
    pub fn stop_with<F>(&self, stop: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state == LifecycleState::Stopped {
            debug!("stop requested while stopped, ignoring");
            return Ok(());
        }
        stop()?;
        *state = LifecycleState::Stopped;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::Error,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn start_is_idempotent() {
        let guard = LifecycleGuard::new();
        let starts = AtomicUsize::new(0);
        let start = || {
            starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        guard.start_with(start).unwrap();
        guard.start_with(start).unwrap();
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(guard.is_running());
    }

    #[test]
    fn stop_when_stopped_is_noop() {
        let guard = LifecycleGuard::new();
        let stops = AtomicUsize::new(0);
        guard
            .stop_with(|| {
                stops.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        assert_eq!(guard.state(), LifecycleState::Stopped);
    }

    #[test]
    fn failed_start_leaves_stopped() {
        let guard = LifecycleGuard::new();
        let err = guard
            .start_with(|| Err(Error::internal(std::io::Error::other("no runtime"))))
            .unwrap_err();
        assert!(err.to_string().contains("no runtime"));
        assert_eq!(guard.state(), LifecycleState::Stopped);
    }

    #[test]
    fn full_cycle() {
        let guard = LifecycleGuard::new();
        guard.start_with(|| Ok(())).unwrap();
        guard.stop_with(|| Ok(())).unwrap();
        guard.start_with(|| Ok(())).unwrap();
        assert_eq!(guard.state().to_string(), "running");
    }
}
