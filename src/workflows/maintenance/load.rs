use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::storage::{PropertyStore, StorageError};

pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Completed,
    TimedOut,
}

impl LoadOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Completed => "Completed",
            Self::TimedOut => "Timed Out",
        }
    }
}

/// One-shot completion flag guarded by a mutex and paired with a condition variable.
///
/// A signal belongs to a single report run. Once completed it stays completed.
#[derive(Debug, Default)]
pub struct LoadSignal {
    completed: Mutex<bool>,
    ready: Condvar,
}

impl LoadSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn complete(&self) {
        let mut completed = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *completed = true;
        self.ready.notify_all();
    }

    /// Blocks until the signal completes or `timeout` elapses.
    ///
    /// The flag is checked under the lock before sleeping, so a completion that
    /// happened before this call returns immediately.
    pub fn wait(&self, timeout: Duration) -> LoadOutcome {
        let guard = self
            .completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *guard {
            return LoadOutcome::Completed;
        }

        let (guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |completed| !*completed)
            .unwrap_or_else(PoisonError::into_inner);

        if *guard {
            LoadOutcome::Completed
        } else {
            LoadOutcome::TimedOut
        }
    }
}

/// Cloneable producer side of a [`LoadSignal`], handed to the asynchronous loader.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    signal: Arc<LoadSignal>,
}

impl CompletionHandle {
    pub fn complete(&self) {
        self.signal.complete();
    }
}

/// Bridges an asynchronous load to a synchronous caller with a bounded wait.
#[derive(Debug, Clone, Copy)]
pub struct LoadCoordinator {
    timeout: Duration,
}

impl Default for LoadCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_LOAD_TIMEOUT)
    }
}

impl LoadCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `trigger` with a fresh completion handle and waits for it to fire.
    pub fn await_completion<F>(&self, trigger: F) -> LoadOutcome
    where
        F: FnOnce(CompletionHandle),
    {
        let signal = LoadSignal::new();
        trigger(CompletionHandle {
            signal: Arc::clone(&signal),
        });

        let started = Instant::now();
        let outcome = signal.wait(self.timeout);
        debug!(
            outcome = outcome.label(),
            waited_ms = started.elapsed().as_millis() as u64,
            "load wait finished"
        );
        outcome
    }

    /// Registers a completion listener on `store`, starts its load and waits.
    ///
    /// A store that refuses to start is an error; a load that never reports
    /// back is `LoadOutcome::TimedOut`.
    pub fn await_load<S>(&self, store: &S) -> Result<LoadOutcome, StorageError>
    where
        S: PropertyStore + ?Sized,
    {
        let mut started = Ok(());
        let outcome = self.await_completion(|handle| {
            let listener = handle.clone();
            store.add_completion_listener(Box::new(move || listener.complete()));
            info!(
                timeout_ms = self.timeout.as_millis() as u64,
                "waiting for property data to load"
            );
            started = store.start_load();
            // nothing will report back
            if started.is_err() {
                handle.complete();
            }
        });

        started?;
        if outcome == LoadOutcome::TimedOut {
            warn!(
                timeout_ms = self.timeout.as_millis() as u64,
                "property data did not load in time"
            );
        }
        Ok(outcome)
    }
}
