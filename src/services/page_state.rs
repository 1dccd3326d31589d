// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Loading state machine for a page or panel backed by one async operation.
//!
//! A load is driven by exactly one future and one owned timer. The timer is
//! armed for the "slow" threshold, re-armed for the hard deadline, and dropped
//! together with the future when the load ends, so it can never fire after
//! the operation resolved.

use crate::error::AppError;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Observable state of a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(feature = "binding-generation", ts(export, export_to = "web/src/lib/generated/"))]
#[serde(rename_all = "lowercase")]
pub enum PageState {
    /// Nothing requested yet
    Idle,
    /// Operation in flight, within the expected time
    Loading,
    /// Operation resolved successfully
    Ready,
    /// Operation still in flight past the slow threshold
    Degraded,
    /// Operation failed or hit the deadline; retry is available
    Failed,
}

impl PageState {
    /// An operation is currently in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self, PageState::Loading | PageState::Degraded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Start,
    SlowThreshold,
    Resolved,
    Rejected,
    Deadline,
    Reset,
}

/// Pure transition function. Events that don't apply leave the state as is.
pub fn transition(state: PageState, event: PageEvent) -> PageState {
    use PageEvent as E;
    use PageState as S;

    match (state, event) {
        (_, E::Reset) => S::Idle,
        (S::Idle | S::Ready | S::Failed, E::Start) => S::Loading,
        (S::Loading, E::SlowThreshold) => S::Degraded,
        (S::Loading | S::Degraded, E::Resolved) => S::Ready,
        (S::Loading | S::Degraded, E::Rejected | E::Deadline) => S::Failed,
        (s, _) => s,
    }
}

/// Timing policy for one load.
#[derive(Debug, Clone, Copy)]
pub struct LoadPolicy {
    /// Report `Degraded` after this long
    pub degraded_after: Duration,
    /// Give up (and cancel the operation) after this long
    pub fail_after: Duration,
}

impl LoadPolicy {
    pub fn new(degraded_after: Duration, fail_after: Duration) -> Self {
        Self {
            degraded_after,
            fail_after,
        }
    }
}

/// Run `operation` under `policy`, reporting every state change to `observer`.
///
/// Returns the operation's result, or [`AppError::Timeout`] when the deadline
/// passes first (the operation is dropped at that point).
pub async fn drive<F, T, O>(
    operation: F,
    policy: LoadPolicy,
    mut observer: O,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
    O: FnMut(PageState),
{
    let started = Instant::now();
    let mut state = transition(PageState::Idle, PageEvent::Start);
    observer(state);

    let deadline = started + policy.fail_after;
    let first_alarm = if policy.degraded_after < policy.fail_after {
        started + policy.degraded_after
    } else {
        deadline
    };

    let timer = sleep_until(first_alarm);
    tokio::pin!(operation);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            biased;

            result = &mut operation => {
                let event = if result.is_ok() { PageEvent::Resolved } else { PageEvent::Rejected };
                state = transition(state, event);
                observer(state);
                return result;
            }
            _ = &mut timer => {
                if state == PageState::Loading && timer.deadline() < deadline {
                    state = transition(state, PageEvent::SlowThreshold);
                    observer(state);
                    timer.as_mut().reset(deadline);
                } else {
                    state = transition(state, PageEvent::Deadline);
                    observer(state);
                    tracing::warn!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Load hit its deadline, cancelling"
                    );
                    return Err(AppError::Timeout(format!(
                        "no result after {}s",
                        policy.fail_after.as_secs()
                    )));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LoadPolicy {
        LoadPolicy::new(Duration::from_secs(8), Duration::from_secs(25))
    }

    #[test]
    fn test_transitions() {
        use PageEvent as E;
        use PageState as S;

        assert_eq!(transition(S::Idle, E::Start), S::Loading);
        assert_eq!(transition(S::Loading, E::SlowThreshold), S::Degraded);
        assert_eq!(transition(S::Degraded, E::Resolved), S::Ready);
        assert_eq!(transition(S::Loading, E::Deadline), S::Failed);
        assert_eq!(transition(S::Failed, E::Start), S::Loading);
        assert_eq!(transition(S::Ready, E::Reset), S::Idle);
    }

    #[test]
    fn test_late_events_are_ignored() {
        use PageEvent as E;
        use PageState as S;

        // A timer event after resolution must not move the state.
        assert_eq!(transition(S::Ready, E::SlowThreshold), S::Ready);
        assert_eq!(transition(S::Ready, E::Deadline), S::Ready);
        assert_eq!(transition(S::Failed, E::Resolved), S::Failed);
        assert_eq!(transition(S::Idle, E::Resolved), S::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_goes_straight_to_ready() {
        let mut seen = Vec::new();
        let result = drive(async { Ok::<_, AppError>(42) }, policy(), |s| seen.push(s)).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(seen, vec![PageState::Loading, PageState::Ready]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_degrades_then_resolves() {
        let mut seen = Vec::new();
        let op = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, AppError>("done")
        };
        let result = drive(op, policy(), |s| seen.push(s)).await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(
            seen,
            vec![PageState::Loading, PageState::Degraded, PageState::Ready]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_operation() {
        let mut seen = Vec::new();
        let op = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, AppError>(())
        };
        let result = drive(op, policy(), |s| seen.push(s)).await;

        assert!(matches!(result, Err(AppError::Timeout(_))));
        assert_eq!(
            seen,
            vec![PageState::Loading, PageState::Degraded, PageState::Failed]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_fails_without_waiting() {
        let mut seen = Vec::new();
        let op = async { Err::<(), _>(AppError::Generation("boom".to_string())) };
        let result = drive(op, policy(), |s| seen.push(s)).await;

        assert!(matches!(result, Err(AppError::Generation(_))));
        assert_eq!(seen, vec![PageState::Loading, PageState::Failed]);
    }
}
