//! The scheduler boundary (§6): `JobSpec`/`Job` and the job-type strings the
//! content and page services emit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Job type strings the core emits (§6).
pub mod job_type {
    pub const CONTENT_PUBLISH: &str = "cms.content.publish";
    pub const CONTENT_UNPUBLISH: &str = "cms.content.unpublish";
    pub const PAGE_PUBLISH: &str = "cms.page.publish";
    pub const PAGE_UNPUBLISH: &str = "cms.page.unpublish";
}

/// Status of a scheduler job (§3 data model: SchedulerJob).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Completed,
    Canceled,
    Failed,
}

/// The caller-supplied spec for a job. `key` is the idempotency boundary:
/// re-enqueuing with the same key replaces the existing pending job rather
/// than creating a second one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub key: String,
    pub job_type: String,
    pub run_at: DateTime<Utc>,
    pub payload: Value,
    pub max_attempts: u32,
}

impl JobSpec {
    pub fn new(key: impl Into<String>, job_type: impl Into<String>, run_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            job_type: job_type.into(),
            run_at,
            payload: Value::Null,
            max_attempts: 3,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// A stored job (§3 data model: SchedulerJob).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: uuid::Uuid,
    pub spec: JobSpec,
    pub status: JobStatus,
    pub attempt: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn from_spec(spec: JobSpec, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            spec,
            status: JobStatus::Pending,
            attempt: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// `content.publish.<id>` / `page.unpublish.<id>` style helper for
    /// building the keys §4.3/§4.4 specify.
    pub fn key_for(entity: &str, id: impl std::fmt::Display, action: &str) -> String {
        format!("{entity}.{action}.{id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_for_matches_the_documented_format() {
        assert_eq!(
            Job::key_for("content", "abc-123", "publish"),
            "content.publish.abc-123"
        );
        assert_eq!(
            Job::key_for("page", "xyz", "unpublish"),
            "page.unpublish.xyz"
        );
    }
}
