//! Fixed-interval driver for the reconciler.

use crate::error::DdnsError;
use crate::reconciler::Reconciler;
use crate::state::State;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Where the scheduler is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Waiting,
    Stopped,
}

/// Runs one pass immediately, then one per interval, until cancelled.
///
/// Passes run on the calling task one after another, so the owned [`State`]
/// is never touched by two passes at once.
pub struct Scheduler {
    reconciler: Reconciler,
    interval: Duration,
    state: State,
    phase: Phase,
    passes: u64,
}

impl Scheduler {
    /// Create a scheduler that owns `state` for the life of the loop.
    pub fn new(reconciler: Reconciler, interval: Duration, state: State) -> Self {
        Self {
            reconciler,
            interval,
            state,
            phase: Phase::Idle,
            passes: 0,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Passes started so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// State as of the last pass.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Loop until `cancel` fires. Pass errors are logged and never end the loop.
    pub async fn run(&mut self, cancel: CancellationToken) {
        tracing::info!(
            check_interval = ?self.interval,
            domains = self.reconciler.domains().len(),
            "Starting DDNS updater"
        );

        // First tick completes immediately.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            self.phase = Phase::Waiting;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.phase = Phase::Stopped;
                    tracing::info!("Shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }

            self.run_pass(&cancel).await;
        }
    }

    /// Run a single pass and report whether it succeeded.
    pub async fn run_pass(&mut self, cancel: &CancellationToken) -> bool {
        self.phase = Phase::Running;
        self.passes += 1;

        let result = self.reconciler.run_once(cancel, &mut self.state).await;
        let ok = match result {
            Ok(report) => {
                tracing::info!(
                    ip = %report.public_ip,
                    updated = report.updated.len(),
                    unchanged = report.unchanged.len(),
                    "Check complete"
                );
                true
            }
            Err(DdnsError::Cancelled) => {
                tracing::info!("Check abandoned, shutdown requested");
                false
            }
            Err(e) if self.passes == 1 => {
                tracing::error!(error = %e, "Initial check failed");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Check and update failed");
                false
            }
        };

        self.phase = Phase::Idle;
        ok
    }
}
