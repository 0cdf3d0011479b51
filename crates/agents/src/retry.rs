use crate::agent::AgentOutcome;
use crate::error::Result;
use std::future::Future;
use std::time::Duration;

/// Bounded attempt/timeout policy for one agent call site.
#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    pub attempts: u32,
    pub timeout: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            attempts: 2,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Run an agent call with bounded attempts and a per-attempt timeout,
/// falling back deterministically when every attempt fails. Errors never
/// propagate past the call site.
pub async fn call_with_fallback<T, F, Fut>(
    policy: CallPolicy,
    label: &str,
    mut op: F,
    fallback: impl FnOnce() -> T,
) -> AgentOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 1..=policy.attempts.max(1) {
        match tokio::time::timeout(policy.timeout, op()).await {
            Ok(Ok(value)) => {
                log::debug!("agent call '{label}' succeeded on attempt {attempt}");
                return AgentOutcome::Agent(value);
            }
            Ok(Err(err)) => {
                log::warn!("agent call '{label}' attempt {attempt} failed: {err}");
            }
            Err(_) => {
                log::warn!(
                    "agent call '{label}' attempt {attempt} timed out after {:?}",
                    policy.timeout
                );
            }
        }
    }

    log::info!("agent call '{label}' exhausted attempts, using fallback");
    AgentOutcome::Fallback(fallback())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn success_returns_agent_outcome() {
        let outcome = call_with_fallback(
            CallPolicy::default(),
            "classify",
            || async { Ok(42) },
            || 0,
        )
        .await;
        assert_eq!(outcome, AgentOutcome::Agent(42));
    }

    #[tokio::test]
    async fn failures_are_bounded_and_fall_back() {
        let calls = AtomicU32::new(0);
        let outcome = call_with_fallback(
            CallPolicy {
                attempts: 3,
                timeout: Duration::from_secs(1),
            },
            "rank",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<u32, _>(AgentError::Failed("boom".to_string())) }
            },
            || 7,
        )
        .await;

        assert_eq!(outcome, AgentOutcome::Fallback(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_call_times_out_into_fallback() {
        let outcome = call_with_fallback(
            CallPolicy {
                attempts: 1,
                timeout: Duration::from_millis(50),
            },
            "compose",
            || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(1)
            },
            || -1,
        )
        .await;
        assert_eq!(outcome, AgentOutcome::Fallback(-1));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let outcome = call_with_fallback(
            CallPolicy {
                attempts: 0,
                timeout: Duration::from_secs(1),
            },
            "classify",
            || async { Ok("value") },
            || "fallback",
        )
        .await;
        assert_eq!(outcome, AgentOutcome::Agent("value"));
    }
}
