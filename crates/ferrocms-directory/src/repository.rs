//! Storage contracts for environments and locales (§2: "Repository
//! contracts"). Each has an in-memory implementation here; a persistent
//! implementation lives alongside the rest of the engine's sqlx-backed
//! repositories.

use async_trait::async_trait;
use ferrocms_core::{EnvironmentId, LocaleId, QueryableRepository, Result};

use crate::entities::{Environment, Locale};

#[async_trait]
pub trait EnvironmentRepository: QueryableRepository<Environment, EnvironmentId> {
    async fn find_by_key(&self, key: &str) -> Result<Option<Environment>>;
    async fn find_default(&self) -> Result<Option<Environment>>;
}

#[async_trait]
pub trait LocaleRepository: QueryableRepository<Locale, LocaleId> {
    async fn find_by_code(&self, code: &str) -> Result<Option<Locale>>;
    async fn find_default(&self) -> Result<Option<Locale>>;
    async fn list_active(&self) -> Result<Vec<Locale>>;
}
