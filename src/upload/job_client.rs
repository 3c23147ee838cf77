use crate::config::Polling;
use crate::error::JobError;
use crate::upload::api::{ProcessApi, ProgressSink};
use crate::upload::types::{JobResult, Multiplier, UploadCandidate};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Wait schedule between result fetches once processing has been triggered.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub backoff_factor: f64,
    pub deadline: Duration,
}

impl PollPolicy {
    /// Never exceeds `max_interval`, even when the product overflows `Duration`.
    pub fn next_interval(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff_factor)
            .map_or(self.max_interval, |next| next.min(self.max_interval))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::from(&Polling::default())
    }
}

impl From<&Polling> for PollPolicy {
    fn from(cfg: &Polling) -> Self {
        let initial_interval = Duration::from_millis(cfg.initial_interval_ms);
        Self {
            initial_interval,
            max_interval: Duration::from_millis(cfg.max_interval_ms).max(initial_interval),
            backoff_factor: cfg.backoff_factor.max(1.0),
            deadline: Duration::from_secs(cfg.deadline_secs),
        }
    }
}

/// Runs create → trigger → fetch for one submission. Not idempotent: every
/// call creates a new job on the server.
#[derive(Clone)]
pub struct JobClient<A> {
    api: A,
    poll: PollPolicy,
}

impl<A: ProcessApi> JobClient<A> {
    pub fn new(api: A, poll: PollPolicy) -> Self {
        Self { api, poll }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn submit(
        &self,
        candidate: &UploadCandidate,
        multiplier: Multiplier,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<JobResult, JobError> {
        info!(
            "Submitting '{}' ({} bytes) with multiplier {}",
            candidate.name, candidate.size_bytes, multiplier
        );

        let job = self
            .api
            .create_job(candidate, multiplier, Arc::clone(&sink))
            .await
            .inspect_err(|e| warn!("Create failed: {e}"))?;
        sink.on_upload_progress(100);
        sink.on_job_created(&job);
        info!("Created job {job}");

        self.api
            .start_processing(&job)
            .await
            .inspect_err(|e| warn!("Trigger failed for job {job}: {e}"))?;
        debug!("Processing started for job {job}");

        let started = Instant::now();
        let mut interval = self.poll.initial_interval;
        let mut attempt = 1u32;
        loop {
            let record = self
                .api
                .fetch_job(&job)
                .await
                .inspect_err(|e| warn!("Fetch failed for job {job}: {e}"))?;

            if let Some(result) = record.into_result() {
                info!("Job {job} complete after {attempt} fetch(es), generator {}", result.gan_used);
                return Ok(result);
            }

            let waited = started.elapsed();
            if waited + interval > self.poll.deadline {
                warn!("Job {job} still incomplete after {waited:?}, giving up");
                return Err(JobError::NotReady { job, waited });
            }
            debug!("Job {job} not ready (attempt {attempt}), retrying in {interval:?}");
            tokio::time::sleep(interval).await;
            interval = self.poll.next_interval(interval);
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps() {
        let policy = PollPolicy {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_millis(1_500),
            backoff_factor: 2.0,
            deadline: Duration::from_secs(10),
        };
        let second = policy.next_interval(policy.initial_interval);
        assert_eq!(second, Duration::from_millis(1_000));
        assert_eq!(policy.next_interval(second), Duration::from_millis(1_500));
        assert_eq!(
            policy.next_interval(Duration::from_millis(1_500)),
            Duration::from_millis(1_500)
        );
    }

    #[test]
    fn huge_factor_saturates_at_max_interval() {
        let policy = PollPolicy {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            backoff_factor: 1e20,
            deadline: Duration::from_secs(10),
        };
        assert_eq!(policy.next_interval(Duration::from_secs(5)), Duration::from_secs(5));
        assert_eq!(policy.next_interval(Duration::MAX), Duration::from_secs(5));

        let policy = PollPolicy {
            backoff_factor: f64::INFINITY,
            ..policy
        };
        assert_eq!(policy.next_interval(Duration::from_millis(1)), Duration::from_secs(5));
    }

    #[test]
    fn policy_from_config_is_sane() {
        let cfg = Polling {
            initial_interval_ms: 800,
            max_interval_ms: 100,
            backoff_factor: 0.2,
            deadline_secs: 30,
        };
        let policy = PollPolicy::from(&cfg);
        assert_eq!(policy.max_interval, Duration::from_millis(800));
        assert_eq!(policy.backoff_factor, 1.0);
        assert_eq!(policy.deadline, Duration::from_secs(30));
    }
}
