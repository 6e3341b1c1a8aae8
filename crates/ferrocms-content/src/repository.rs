//! Storage contracts for content types, content entries, translations, and
//! versions (§3, §4.2, §4.3).

use async_trait::async_trait;
use ferrocms_core::{
    ContentId, ContentTypeId, EnvironmentId, ListParams, ListResult, LocaleId, QueryableRepository,
    Repository, Result,
};

use crate::entities::{Content, ContentTranslation, ContentType, ContentVersion};

#[async_trait]
pub trait ContentTypeRepository: QueryableRepository<ContentType, ContentTypeId> {
    async fn find_by_slug(
        &self,
        environment_id: EnvironmentId,
        slug: &str,
    ) -> Result<Option<ContentType>>;

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<ContentType>>;

    async fn search_by_environment(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<ContentType>>;
}

#[async_trait]
pub trait ContentRepository: Repository<Content, ContentId> {
    async fn find_by_slug(
        &self,
        environment_id: EnvironmentId,
        content_type_id: ContentTypeId,
        slug: &str,
    ) -> Result<Option<Content>>;

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<Content>>;

    async fn search_by_environment(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<Content>>;
}

#[async_trait]
pub trait ContentTranslationRepository: Send + Sync {
    async fn upsert(&self, translation: ContentTranslation) -> Result<ContentTranslation>;

    async fn find(&self, content_id: ContentId, locale_id: LocaleId) -> Result<Option<ContentTranslation>>;

    async fn list_by_content(&self, content_id: ContentId) -> Result<Vec<ContentTranslation>>;

    async fn delete(&self, content_id: ContentId, locale_id: LocaleId) -> Result<()>;
}

#[async_trait]
pub trait ContentVersionRepository: Send + Sync {
    async fn create(&self, version: ContentVersion) -> Result<ContentVersion>;

    async fn update(&self, version: ContentVersion) -> Result<ContentVersion>;

    async fn get(&self, content_id: ContentId, version: i32) -> Result<Option<ContentVersion>>;

    async fn list_by_content(&self, content_id: ContentId) -> Result<Vec<ContentVersion>>;

    async fn find_published(&self, content_id: ContentId) -> Result<Option<ContentVersion>>;
}
