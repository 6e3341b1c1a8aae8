//! In-memory [`SchedulerJobRepository`], keyed by id with a secondary
//! index on the idempotency key — the same `DashMap` + `RwLock` index
//! pattern the directory and content repositories use.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use ferrocms_core::Result;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::job::Job;
use crate::repository::SchedulerJobRepository;

#[derive(Default)]
pub struct InMemorySchedulerJobRepository {
    rows: DashMap<Uuid, Job>,
    by_key: RwLock<HashMap<String, Uuid>>,
}

impl InMemorySchedulerJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&self, key: &str, id: Uuid) {
        self.by_key.write().insert(key.to_string(), id);
    }
}

#[async_trait]
impl SchedulerJobRepository for InMemorySchedulerJobRepository {
    async fn upsert(&self, job: Job) -> Result<Job> {
        if let Some(existing_id) = self.by_key.read().get(&job.spec.key).copied() {
            if existing_id != job.id {
                self.rows.remove(&existing_id);
            }
        }
        self.index(&job.spec.key, job.id);
        self.rows.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_key(&self, key: &str) -> Result<Option<Job>> {
        let id = self.by_key.read().get(key).copied();
        Ok(id.and_then(|id| self.rows.get(&id).map(|r| r.clone())))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.rows.get(&id).map(|r| r.clone()))
    }

    async fn list_due(&self, until: DateTime<Utc>, limit: u32) -> Result<Vec<Job>> {
        let mut due: Vec<Job> = self
            .rows
            .iter()
            .map(|r| r.clone())
            .filter(|job| {
                matches!(job.status, crate::job::JobStatus::Pending) && job.spec.run_at <= until
            })
            .collect();
        due.sort_by_key(|job| job.spec.run_at);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn delete_by_key(&self, key: &str) -> Result<Option<Job>> {
        let id = self.by_key.write().remove(key);
        Ok(id.and_then(|id| self.rows.remove(&id).map(|(_, v)| v)))
    }

    async fn save(&self, job: Job) -> Result<Job> {
        self.rows.insert(job.id, job.clone());
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobSpec, JobStatus};
    use serde_json::json;

    fn spec(key: &str) -> JobSpec {
        JobSpec::new(key, "cms.content.publish", Utc::now()).with_payload(json!({}))
    }

    #[tokio::test]
    async fn upsert_replaces_the_prior_job_for_the_same_key() {
        let repo = InMemorySchedulerJobRepository::new();
        let first = Job::from_spec(spec("content.publish.1"), Utc::now());
        let first_id = first.id;
        repo.upsert(first).await.unwrap();

        let second = Job::from_spec(spec("content.publish.1"), Utc::now());
        let second_id = second.id;
        repo.upsert(second).await.unwrap();

        assert!(repo.find_by_id(first_id).await.unwrap().is_none());
        assert!(repo.find_by_id(second_id).await.unwrap().is_some());
        assert_eq!(
            repo.find_by_key("content.publish.1").await.unwrap().unwrap().id,
            second_id
        );
    }

    #[tokio::test]
    async fn list_due_orders_by_run_at_and_excludes_future_jobs() {
        let repo = InMemorySchedulerJobRepository::new();
        let now = Utc::now();
        let later = Job::from_spec(
            JobSpec::new("b", "cms.content.publish", now + chrono::Duration::hours(1)),
            now,
        );
        let sooner = Job::from_spec(JobSpec::new("a", "cms.content.publish", now), now);
        repo.upsert(later).await.unwrap();
        repo.upsert(sooner.clone()).await.unwrap();

        let due = repo.list_due(now, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, sooner.id);
    }

    #[tokio::test]
    async fn canceled_jobs_are_not_due() {
        let repo = InMemorySchedulerJobRepository::new();
        let mut job = Job::from_spec(spec("x"), Utc::now());
        job.status = JobStatus::Canceled;
        repo.upsert(job).await.unwrap();

        let due = repo.list_due(Utc::now(), 10).await.unwrap();
        assert!(due.is_empty());
    }
}
