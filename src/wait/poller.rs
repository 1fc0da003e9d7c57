/**
 * Condition polling against an eventually-consistent API
 *
 * A wait repeatedly fetches one resource until every criterion holds on the
 * same snapshot, a fetch fails for a reason retrying cannot fix, or the
 * deadline passes.
 */
use super::config::PollConfig;
use super::criterion::{Criterion, first_failing};
use super::fetcher::{FetchError, ResourceFetcher, ResourceKey};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

/// Criterion name reported when the resource was absent on the last poll
pub const EXISTS: &str = "exists";

/// Criterion name reported when a deletion wait times out
pub const DELETED: &str = "deleted";

/// Stand-in deadline for timeouts too large to add to the current instant
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

#[derive(Debug, thiserror::Error)]
pub enum WaitError<T> {
    /// The deadline passed before the resource converged
    #[error("timed out after {elapsed:?} waiting for {key}: last failed criterion was '{failed_criterion}'")]
    Timeout {
        key: ResourceKey,
        elapsed: Duration,
        failed_criterion: String,
        /// Snapshot seen on the final poll, `None` if the resource was absent
        last: Option<Box<T>>,
    },

    #[error("aborted waiting for {key}")]
    Fatal {
        key: ResourceKey,
        #[source]
        source: FetchError,
    },
}

impl<T> WaitError<T> {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    #[must_use]
    pub fn last_snapshot(&self) -> Option<&T> {
        match self {
            Self::Timeout { last, .. } => last.as_deref(),
            Self::Fatal { .. } => None,
        }
    }

    #[must_use]
    pub fn failed_criterion(&self) -> Option<&str> {
        match self {
            Self::Timeout {
                failed_criterion, ..
            } => Some(failed_criterion),
            Self::Fatal { .. } => None,
        }
    }
}

/// Poll `key` until one snapshot satisfies every criterion.
///
/// With no criteria, existence alone is enough. Not-found fetches are retried
/// until the deadline; any other fetch error ends the wait at once.
///
/// # Errors
///
/// Returns [`WaitError::Fatal`] on a non-transient fetch failure and
/// [`WaitError::Timeout`] once `config.timeout` has elapsed without convergence.
pub async fn wait_for<F>(
    fetcher: &F,
    key: &ResourceKey,
    criteria: &[Criterion<F::Snapshot>],
    config: PollConfig,
) -> Result<F::Snapshot, WaitError<F::Snapshot>>
where
    F: ResourceFetcher + ?Sized,
{
    let start = Instant::now();
    let deadline = deadline_after(start, config.timeout);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let (last, failed_criterion) = match fetcher.fetch(key).await {
            Ok(snapshot) => match first_failing(criteria, &snapshot) {
                None => {
                    info!(
                        "✅ {} converged after {} attempt(s) in {:?}",
                        key,
                        attempts,
                        start.elapsed()
                    );
                    return Ok(snapshot);
                }
                Some(index) => {
                    let name = criteria[index].name().to_string();
                    debug!("⏳ {}: criterion '{}' not met yet", key, name);
                    (Some(snapshot), name)
                }
            },
            Err(FetchError::NotFound) => {
                debug!("⏳ {}: not found yet", key);
                (None, EXISTS.to_string())
            }
            Err(source) => {
                error!("❌ {}: giving up after {} attempt(s): {}", key, attempts, source);
                return Err(WaitError::Fatal {
                    key: key.clone(),
                    source,
                });
            }
        };

        let now = Instant::now();
        if now >= deadline {
            let elapsed = now - start;
            warn!(
                "⌛ {}: timed out after {:?} ({} attempts), last failed criterion '{}'",
                key, elapsed, attempts, failed_criterion
            );
            return Err(WaitError::Timeout {
                key: key.clone(),
                elapsed,
                failed_criterion,
                last: last.map(Box::new),
            });
        }
        sleep(config.interval.min(deadline - now)).await;
    }
}

/// Poll `key` until the fetcher reports it as not found.
///
/// # Errors
///
/// Returns [`WaitError::Fatal`] on a non-transient fetch failure and
/// [`WaitError::Timeout`] if the resource still exists at the deadline.
pub async fn wait_until_deleted<F>(
    fetcher: &F,
    key: &ResourceKey,
    config: PollConfig,
) -> Result<(), WaitError<F::Snapshot>>
where
    F: ResourceFetcher + ?Sized,
{
    let start = Instant::now();
    let deadline = deadline_after(start, config.timeout);

    loop {
        let last = match fetcher.fetch(key).await {
            Err(FetchError::NotFound) => {
                info!("🗑️ {} deleted after {:?}", key, start.elapsed());
                return Ok(());
            }
            Err(source) => {
                error!("❌ {}: giving up on deletion: {}", key, source);
                return Err(WaitError::Fatal {
                    key: key.clone(),
                    source,
                });
            }
            Ok(snapshot) => snapshot,
        };
        debug!("⏳ {}: still present", key);

        let now = Instant::now();
        if now >= deadline {
            warn!("⌛ {}: still present after {:?}", key, now - start);
            return Err(WaitError::Timeout {
                key: key.clone(),
                elapsed: now - start,
                failed_criterion: DELETED.to_string(),
                last: Some(Box::new(last)),
            });
        }
        sleep(config.interval.min(deadline - now)).await;
    }
}
