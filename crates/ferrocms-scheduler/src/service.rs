//! The scheduler contract (§4.7): `Enqueue` is idempotent on `key`,
//! `CancelByKey` swallows a missing job into `Ok(())` at the call sites
//! that need it (content/page `Delete`) but surfaces [`Error::JobNotFound`]
//! here so callers can choose.

use std::sync::Arc;

use ferrocms_core::{Clock, Error, Result, Service, ServiceHealth};

use crate::job::{Job, JobSpec, JobStatus};
use crate::repository::SchedulerJobRepository;

pub struct SchedulerService {
    repository: Arc<dyn SchedulerJobRepository>,
    clock: Arc<dyn Clock>,
}

impl SchedulerService {
    pub fn new(repository: Arc<dyn SchedulerJobRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Idempotent on `spec.key`: replaces any existing entry, pending or
    /// not, with a fresh pending job.
    pub async fn enqueue(&self, spec: JobSpec) -> Result<Job> {
        let job = Job::from_spec(spec, self.clock.now());
        tracing::debug!(key = %job.spec.key, job_type = %job.spec.job_type, "enqueuing scheduler job");
        self.repository.upsert(job).await
    }

    pub async fn cancel_by_key(&self, key: &str) -> Result<Job> {
        match self.repository.find_by_key(key).await? {
            Some(mut job) if job.status == JobStatus::Pending => {
                job.status = JobStatus::Canceled;
                job.updated_at = self.clock.now();
                self.repository.save(job).await
            }
            Some(job) => Ok(job),
            None => Err(Error::JobNotFound { key: key.to_string() }),
        }
    }

    /// Best-effort cancellation used from `Delete`/`Schedule(publish_at: None)`
    /// call sites: a missing job is not an error (§7 propagation policy).
    pub async fn cancel_by_key_best_effort(&self, key: &str) -> Result<()> {
        match self.cancel_by_key(key).await {
            Ok(_) => Ok(()),
            Err(Error::JobNotFound { .. }) => {
                tracing::debug!(key, "no scheduler job to cancel");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    pub async fn list_due(&self, limit: u32) -> Result<Vec<Job>> {
        self.repository.list_due(self.clock.now(), limit).await
    }

    pub async fn mark_done(&self, id: uuid::Uuid) -> Result<Job> {
        let mut job = self.get(id).await?;
        job.status = JobStatus::Completed;
        job.updated_at = self.clock.now();
        self.repository.save(job).await
    }

    /// Increments the attempt counter; failures below `max_attempts` stay
    /// `pending` so a worker retries them, otherwise the job moves to
    /// `failed`.
    pub async fn mark_failed(&self, id: uuid::Uuid, error: impl Into<String>) -> Result<Job> {
        let mut job = self.get(id).await?;
        job.attempt += 1;
        job.last_error = Some(error.into());
        job.updated_at = self.clock.now();
        job.status = if job.attempt < job.spec.max_attempts {
            JobStatus::Pending
        } else {
            JobStatus::Failed
        };
        self.repository.save(job).await
    }

    async fn get(&self, id: uuid::Uuid) -> Result<Job> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("scheduler_job", id.to_string()))
    }
}

#[async_trait::async_trait]
impl Service for SchedulerService {
    fn name(&self) -> &str {
        "scheduler-service"
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemorySchedulerJobRepository;
    use ferrocms_core::SystemClock;
    use serde_json::json;

    fn service() -> SchedulerService {
        SchedulerService::new(
            Arc::new(InMemorySchedulerJobRepository::new()),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn reenqueueing_the_same_key_never_duplicates_a_pending_job() {
        let svc = service();
        let spec = |payload| {
            JobSpec::new("content.unpublish.1", "cms.content.unpublish", chrono::Utc::now())
                .with_payload(payload)
        };

        let first = svc.enqueue(spec(json!({"n": 1}))).await.unwrap();
        let second = svc.enqueue(spec(json!({"n": 2}))).await.unwrap();

        assert_ne!(first.id, second.id);
        let due = svc.list_due(10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, second.id);
    }

    #[tokio::test]
    async fn cancel_missing_key_surfaces_job_not_found() {
        let svc = service();
        let err = svc.cancel_by_key("missing").await.unwrap_err();
        assert!(matches!(err, Error::JobNotFound { .. }));
    }

    #[tokio::test]
    async fn cancel_best_effort_swallows_missing_job() {
        let svc = service();
        svc.cancel_by_key_best_effort("missing").await.unwrap();
    }

    #[tokio::test]
    async fn mark_failed_stays_pending_until_max_attempts() {
        let svc = service();
        let job = svc
            .enqueue(
                JobSpec::new("k", "cms.content.publish", chrono::Utc::now())
                    .with_max_attempts(2),
            )
            .await
            .unwrap();

        let after_first = svc.mark_failed(job.id, "boom").await.unwrap();
        assert_eq!(after_first.status, JobStatus::Pending);
        assert_eq!(after_first.attempt, 1);

        let after_second = svc.mark_failed(job.id, "boom again").await.unwrap();
        assert_eq!(after_second.status, JobStatus::Failed);
        assert_eq!(after_second.attempt, 2);
    }

    #[tokio::test]
    async fn mark_done_completes_the_job() {
        let svc = service();
        let job = svc
            .enqueue(JobSpec::new("k", "cms.page.publish", chrono::Utc::now()))
            .await
            .unwrap();
        let done = svc.mark_done(job.id).await.unwrap();
        assert_eq!(done.status, JobStatus::Completed);
    }
}
