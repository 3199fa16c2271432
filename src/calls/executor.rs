//! The resilient call executor.
//!
//! Wraps one asynchronous unit of backend work with a per-attempt timeout,
//! bounded linear-backoff retries, and cooperative cancellation. One
//! executor instance holds at most one authoritative in-flight invocation:
//! starting a new call supersedes the previous one, which resolves with
//! neither a success nor a failure.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::calls::auth::AuthContext;
use crate::calls::error::CallError;

/// Resilience settings applied to every invocation of an executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallPolicy {
    /// Budget for a single attempt. A timed-out attempt counts as a
    /// failed attempt, not a caller cancellation.
    pub timeout: Duration,
    /// Additional attempts after the first; `max_retries + 1` attempts
    /// total.
    pub max_retries: u32,
    /// Linear backoff base: attempt `n` failing waits `backoff_base * n`
    /// before attempt `n + 1`.
    pub backoff_base: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Resolution of one logical invocation.
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// The call succeeded. Fires exactly once per logical invocation.
    Completed(T),
    /// Every attempt failed; this is the terminal classification.
    Failed(CallError),
    /// A newer call through the same executor (or an explicit `cancel`)
    /// superseded this one. Deliberately neither success nor failure: the
    /// caller that issued the newer call receives the authoritative
    /// outcome.
    Superseded,
}

impl<T> CallOutcome<T> {
    /// Collapse into a `Result`, mapping supersession to `None`.
    pub fn into_result(self) -> Option<Result<T, CallError>> {
        match self {
            CallOutcome::Completed(value) => Some(Ok(value)),
            CallOutcome::Failed(err) => Some(Err(err)),
            CallOutcome::Superseded => None,
        }
    }

    #[must_use]
    pub fn is_superseded(&self) -> bool {
        matches!(self, CallOutcome::Superseded)
    }
}

/// Executes backend calls under a uniform resilience contract.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use flowforge::calls::{AuthContext, CallExecutor, CallOutcome, CallPolicy};
///
/// # async fn example() {
/// let executor = CallExecutor::new(CallPolicy::default(), Arc::new(AuthContext::new()));
/// let outcome = executor.run(|| async { Ok::<_, flowforge::calls::CallError>(42) }).await;
/// assert!(matches!(outcome, CallOutcome::Completed(42)));
/// # }
/// ```
pub struct CallExecutor {
    policy: CallPolicy,
    auth: Arc<AuthContext>,
    in_flight: Mutex<CancellationToken>,
}

impl CallExecutor {
    #[must_use]
    pub fn new(policy: CallPolicy, auth: Arc<AuthContext>) -> Self {
        Self {
            policy,
            auth,
            in_flight: Mutex::new(CancellationToken::new()),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CallPolicy {
        &self.policy
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<AuthContext> {
        &self.auth
    }

    /// Execute one logical invocation.
    ///
    /// `attempt` is called once per attempt to produce a fresh future.
    /// The invocation resolves `Completed` at most once; after
    /// `max_retries + 1` failed attempts the last error is classified and
    /// returned as `Failed`. A terminal `Unauthorized` tears down the
    /// [`AuthContext`], since a stale credential cannot self-heal.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> CallOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        let token = self.begin();
        let total_attempts = self.policy.max_retries.saturating_add(1);
        let mut last_error = CallError::Network {
            message: "call was not attempted".to_string(),
        };

        for attempt_no in 1..=total_attempts {
            let fut = attempt();
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(attempt = attempt_no, "invocation superseded");
                    return CallOutcome::Superseded;
                }
                resolved = time::timeout(self.policy.timeout, fut) => {
                    match resolved {
                        Ok(Ok(value)) => return CallOutcome::Completed(value),
                        Ok(Err(err)) => {
                            tracing::warn!(
                                attempt = attempt_no,
                                total = total_attempts,
                                error = %err,
                                "attempt failed"
                            );
                            last_error = err;
                        }
                        Err(_elapsed) => {
                            tracing::warn!(
                                attempt = attempt_no,
                                total = total_attempts,
                                budget_ms = self.policy.timeout.as_millis() as u64,
                                "attempt timed out"
                            );
                            last_error = CallError::Timeout;
                        }
                    }
                }
            }

            if attempt_no < total_attempts {
                let backoff = self.policy.backoff_base * attempt_no;
                tokio::select! {
                    _ = token.cancelled() => return CallOutcome::Superseded,
                    _ = time::sleep(backoff) => {}
                }
            }
        }

        if matches!(last_error, CallError::Unauthorized) {
            tracing::warn!("terminal unauthorized failure; tearing down auth context");
            self.auth.teardown();
        }
        CallOutcome::Failed(last_error)
    }

    /// Explicit caller cancellation: the in-flight invocation (if any)
    /// stops retrying and resolves `Superseded`.
    pub fn cancel(&self) {
        self.in_flight
            .lock()
            .expect("executor lock poisoned")
            .cancel();
    }

    /// Install a fresh token for the new invocation, cancelling the
    /// previous in-flight one.
    fn begin(&self) -> CancellationToken {
        let mut slot = self.in_flight.lock().expect("executor lock poisoned");
        slot.cancel();
        *slot = CancellationToken::new();
        slot.clone()
    }
}

impl std::fmt::Debug for CallExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor(policy: CallPolicy) -> CallExecutor {
        CallExecutor::new(policy, Arc::new(AuthContext::new()))
    }

    #[tokio::test]
    async fn success_resolves_completed() {
        let exec = executor(CallPolicy::default());
        let outcome = exec.run(|| async { Ok::<_, CallError>("done") }).await;
        assert!(matches!(outcome, CallOutcome::Completed("done")));
    }

    #[tokio::test(start_paused = true)]
    async fn failure_is_retried_then_surfaced() {
        let exec = executor(CallPolicy {
            timeout: Duration::from_millis(50),
            max_retries: 1,
            backoff_base: Duration::from_millis(10),
        });
        let mut calls = 0u32;
        let outcome: CallOutcome<()> = exec
            .run(|| {
                calls += 1;
                async {
                    Err(CallError::Network {
                        message: "refused".into(),
                    })
                }
            })
            .await;
        assert_eq!(calls, 2);
        assert!(matches!(outcome, CallOutcome::Failed(CallError::Network { .. })));
    }

    #[tokio::test]
    async fn explicit_cancel_pre_empts_next_run() {
        let exec = Arc::new(executor(CallPolicy::default()));
        let worker = Arc::clone(&exec);
        let handle = tokio::spawn(async move {
            worker
                .run(|| async {
                    futures_util::future::pending::<()>().await;
                    Ok::<_, CallError>(())
                })
                .await
        });
        tokio::task::yield_now().await;
        exec.cancel();
        let outcome = handle.await.unwrap();
        assert!(outcome.is_superseded());
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_unauthorized_tears_down_auth() {
        let auth = Arc::new(AuthContext::with_token("stale"));
        let exec = CallExecutor::new(
            CallPolicy {
                timeout: Duration::from_millis(50),
                max_retries: 0,
                backoff_base: Duration::from_millis(1),
            },
            Arc::clone(&auth),
        );
        let outcome: CallOutcome<()> = exec.run(|| async { Err(CallError::Unauthorized) }).await;
        assert!(matches!(outcome, CallOutcome::Failed(CallError::Unauthorized)));
        assert!(!auth.is_authenticated());
    }
}
