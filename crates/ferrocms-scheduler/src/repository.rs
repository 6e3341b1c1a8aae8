//! Storage contract for scheduler jobs (§2 "Repository contracts").

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ferrocms_core::Result;

use crate::job::Job;

#[async_trait]
pub trait SchedulerJobRepository: Send + Sync {
    /// Inserts or replaces the job stored under `job.spec.key`.
    async fn upsert(&self, job: Job) -> Result<Job>;

    async fn find_by_key(&self, key: &str) -> Result<Option<Job>>;

    async fn find_by_id(&self, id: uuid::Uuid) -> Result<Option<Job>>;

    /// Pending jobs with `run_at <= until`, ordered by `run_at` ascending,
    /// capped at `limit`.
    async fn list_due(&self, until: DateTime<Utc>, limit: u32) -> Result<Vec<Job>>;

    async fn delete_by_key(&self, key: &str) -> Result<Option<Job>>;

    async fn save(&self, job: Job) -> Result<Job>;
}
