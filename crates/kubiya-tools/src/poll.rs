//! Bounded status polling
//!
//! Used to wait for long-running vendor operations (ArgoCD sync) without an
//! unbounded loop: at most `max_attempts` probes, `interval` apart.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Attempts and spacing for [`poll_until`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on time spent waiting
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

impl Default for PollConfig {
    /// 60 attempts, 5 seconds apart
    fn default() -> Self {
        Self::new(60, Duration::from_secs(5))
    }
}

/// What a single probe observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe<T> {
    /// Still running
    Pending(T),
    /// Reached a final state
    Terminal(T),
    /// Nothing left to observe; treated as completion
    Gone,
}

/// How the poll loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Terminal { value: T, attempts: u32 },
    Gone { attempts: u32 },
    /// Attempts exhausted; carries the last pending value, if any
    TimedOut { last: Option<T>, attempts: u32 },
}

impl<T> PollOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Terminal { attempts, .. }
            | PollOutcome::Gone { attempts }
            | PollOutcome::TimedOut { attempts, .. } => *attempts,
        }
    }
}

/// Sleep `interval`, then probe; repeat until a terminal observation or
/// `max_attempts` probes.
pub async fn poll_until<T, F, Fut>(config: PollConfig, mut probe: F) -> PollOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Probe<T>>,
{
    let mut last = None;

    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.interval).await;

        match probe(attempt).await {
            Probe::Terminal(value) => {
                debug!(attempt, "Poll reached terminal state");
                return PollOutcome::Terminal { value, attempts: attempt };
            }
            Probe::Gone => {
                debug!(attempt, "Poll target gone");
                return PollOutcome::Gone { attempts: attempt };
            }
            Probe::Pending(value) => {
                debug!(attempt, max_attempts = config.max_attempts, "Poll pending");
                last = Some(value);
            }
        }
    }

    PollOutcome::TimedOut {
        last,
        attempts: config.max_attempts,
    }
}

/// ArgoCD operation phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncPhase {
    Running,
    Terminating,
    Succeeded,
    Failed,
    Error,
    Unknown(String),
}

impl SyncPhase {
    pub fn parse(phase: &str) -> Self {
        match phase {
            "Running" => SyncPhase::Running,
            "Terminating" => SyncPhase::Terminating,
            "Succeeded" => SyncPhase::Succeeded,
            "Failed" => SyncPhase::Failed,
            "Error" => SyncPhase::Error,
            other => SyncPhase::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncPhase::Succeeded | SyncPhase::Failed | SyncPhase::Error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncPhase::Succeeded)
    }

    pub fn as_str(&self) -> &str {
        match self {
            SyncPhase::Running => "Running",
            SyncPhase::Terminating => "Terminating",
            SyncPhase::Succeeded => "Succeeded",
            SyncPhase::Failed => "Failed",
            SyncPhase::Error => "Error",
            SyncPhase::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_terminal() {
        let config = PollConfig::default();
        let start = tokio::time::Instant::now();

        let outcome = poll_until(config, |attempt| async move {
            if attempt < 3 {
                Probe::Pending(SyncPhase::Running)
            } else {
                Probe::Terminal(SyncPhase::Succeeded)
            }
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Terminal {
                value: SyncPhase::Succeeded,
                attempts: 3
            }
        );
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gone_counts_as_done() {
        let outcome: PollOutcome<()> =
            poll_until(PollConfig::default(), |_| async { Probe::Gone }).await;
        assert_eq!(outcome, PollOutcome::Gone { attempts: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let config = PollConfig::new(4, Duration::from_secs(5));
        let start = tokio::time::Instant::now();

        let outcome = poll_until(config, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Probe::Pending(attempt) }
        })
        .await;

        assert_eq!(outcome, PollOutcome::TimedOut { last: Some(4), attempts: 4 });
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), config.budget());
    }

    #[test]
    fn test_sync_phase() {
        assert!(SyncPhase::parse("Succeeded").is_terminal());
        assert!(SyncPhase::parse("Failed").is_terminal());
        assert!(SyncPhase::parse("Error").is_terminal());
        assert!(!SyncPhase::parse("Running").is_terminal());
        assert_eq!(SyncPhase::parse("weird"), SyncPhase::Unknown("weird".into()));
        assert_eq!(SyncPhase::Succeeded.to_string(), "Succeeded");
        assert_eq!(PollConfig::default().budget(), Duration::from_secs(300));
    }
}
