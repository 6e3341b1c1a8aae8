//! Repository pattern: the storage abstraction every entity repository
//! (content, content-type, page, block-definition, block-instance,
//! block-translation, block-version, locale, environment, scheduler-job)
//! implements twice — once in-memory, once against a real store.

use crate::error::Result;
use crate::service::{ListParams, ListResult};
use async_trait::async_trait;
use std::fmt::Debug;

/// Base repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, Id>: Send + Sync
where
    T: Send + Sync,
    Id: Send + Sync,
{
    /// Create a new entity
    async fn create(&self, entity: T) -> Result<T>;

    /// Find an entity by ID
    async fn find_by_id(&self, id: &Id) -> Result<Option<T>>;

    /// Update an existing entity
    async fn update(&self, entity: T) -> Result<T>;

    /// Delete an entity by ID
    async fn delete(&self, id: &Id) -> Result<()>;

    /// Check if an entity exists
    async fn exists(&self, id: &Id) -> Result<bool>;

    /// Count total entities
    async fn count(&self) -> Result<u64>;
}

/// Extended repository with listing and querying capabilities
#[async_trait]
pub trait QueryableRepository<T, Id>: Repository<T, Id>
where
    T: Send + Sync,
    Id: Send + Sync,
{
    /// List entities with pagination
    async fn list(&self, params: &ListParams) -> Result<ListResult<T>>;

    /// Find entities by a specific field
    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<T>>;

    /// Find a single entity by a unique field
    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<T>>;

    /// Search entities
    async fn search(&self, query: &str, params: &ListParams) -> Result<ListResult<T>>;
}

/// Soft-delete repository trait
#[async_trait]
pub trait SoftDeleteRepository<T, Id>: Repository<T, Id>
where
    T: Send + Sync,
    Id: Send + Sync,
{
    /// Soft delete an entity
    async fn soft_delete(&self, id: &Id) -> Result<()>;

    /// Restore a soft-deleted entity
    async fn restore(&self, id: &Id) -> Result<()>;

    /// Find including soft-deleted entities
    async fn find_with_deleted(&self, id: &Id) -> Result<Option<T>>;

    /// Find only soft-deleted entities
    async fn find_deleted(&self, params: &ListParams) -> Result<ListResult<T>>;

    /// Permanently delete (hard delete)
    async fn hard_delete(&self, id: &Id) -> Result<()>;
}
