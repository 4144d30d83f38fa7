//! Application service — generic long-poll loop for remote operations.
//!
//! Every long-running image operation (creation task, activation,
//! deactivation) is tracked by the same loop; only the status fetch and the
//! vocabulary differ.

use std::future::Future;
use std::time::Duration;

use cloudimg_common::{ImageRecord, TaskStatus};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::ports::ProgressReporter;
use crate::domain::error::ApiError;
use crate::domain::poll::{
    Classification, PollOutcome, PollSettings, PollTarget, UNRECOGNIZED_WARN_AFTER,
};

/// Anything the poller can observe a status string on.
pub trait StatusReport {
    fn status(&self) -> &str;
}

impl StatusReport for TaskStatus {
    fn status(&self) -> &str {
        &self.status
    }
}

impl StatusReport for ImageRecord {
    fn status(&self) -> &str {
        &self.status
    }
}

impl StatusReport for String {
    fn status(&self) -> &str {
        self
    }
}

/// Poll `fetch` every `settings.interval` until `classify` reports a
/// terminal status or `settings.timeout` elapses.
///
/// The first fetch happens one interval after the call. Transient fetch
/// errors (network, 5xx) are logged and the loop continues; callers that
/// want to survive other errors must map them to transient ones before
/// returning. Dropping the returned future cancels the timer.
///
/// # Errors
///
/// Returns the first permanent `ApiError` produced by `fetch`.
pub async fn poll_until_terminal<S, F, Fut, C>(
    mut fetch: F,
    classify: C,
    settings: PollSettings,
    reporter: &impl ProgressReporter,
) -> Result<PollOutcome<S>, ApiError>
where
    S: StatusReport,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, ApiError>>,
    C: Fn(&S) -> Classification,
{
    let interval = settings.interval.max(Duration::from_millis(1));

    let run = async {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status: Option<String> = None;
        let mut unrecognized_streak = 0u32;

        loop {
            ticker.tick().await;

            let observed = match fetch().await {
                Ok(observed) => observed,
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "status check failed, retrying on next tick");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let status = observed.status().to_string();
            if last_status.as_deref() == Some(status.as_str()) {
                debug!(%status, "status unchanged");
            } else {
                info!(%status, "status changed");
                reporter.status(&status);
            }

            match classify(&observed) {
                Classification::Success => return Ok(PollOutcome::Success(observed)),
                Classification::Failure => return Ok(PollOutcome::Failure(observed)),
                Classification::InProgress => unrecognized_streak = 0,
                Classification::Unrecognized => {
                    unrecognized_streak += 1;
                    if unrecognized_streak == UNRECOGNIZED_WARN_AFTER {
                        warn!(
                            %status,
                            ticks = unrecognized_streak,
                            "unrecognized status, still waiting"
                        );
                    }
                }
            }
            last_status = Some(status);
        }
    };

    match tokio::time::timeout(settings.timeout, run).await {
        Ok(result) => result,
        Err(_) => {
            warn!(timeout_secs = settings.timeout.as_secs(), "poll timed out");
            Ok(PollOutcome::TimedOut)
        }
    }
}

/// Poll a `PollTarget` using its own status vocabulary.
///
/// # Errors
///
/// Returns the first permanent `ApiError` produced by `fetch`.
pub async fn poll_target<S, F, Fut>(
    target: &PollTarget,
    fetch: F,
    settings: PollSettings,
    reporter: &impl ProgressReporter,
) -> Result<PollOutcome<S>, ApiError>
where
    S: StatusReport,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, ApiError>>,
{
    let vocabulary = target.vocabulary();
    debug!(resource = %target.describe(), "polling");
    poll_until_terminal(fetch, |s: &S| vocabulary.classify(s.status()), settings, reporter).await
}
