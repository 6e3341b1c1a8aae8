//! Storage contracts for templates, pages, page translations, and page
//! versions (§3, §3.1, §4.4).

use async_trait::async_trait;
use ferrocms_core::{
    EnvironmentId, ListParams, ListResult, LocaleId, PageId, QueryableRepository, Repository, Result,
    TemplateId,
};

use crate::entities::{Page, PageTranslation, PageVersion, Template};

#[async_trait]
pub trait TemplateRepository: QueryableRepository<Template, TemplateId> {
    async fn find_by_slug(&self, environment_id: EnvironmentId, slug: &str) -> Result<Option<Template>>;

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<Template>>;
}

#[async_trait]
pub trait PageRepository: Repository<Page, PageId> {
    async fn find_by_slug(&self, environment_id: EnvironmentId, slug: &str) -> Result<Option<Page>>;

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<Page>>;

    async fn list_children(&self, parent_id: PageId) -> Result<Vec<Page>>;

    async fn search_by_environment(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<Page>>;
}

#[async_trait]
pub trait PageTranslationRepository: Send + Sync {
    /// `environment_id` is carried alongside the translation purely to key
    /// the cross-page `(env, locale, path)` uniqueness index - the
    /// translation row itself does not store it (§3: path uniqueness is
    /// scoped wider than the translation's own ownership).
    async fn upsert(&self, environment_id: EnvironmentId, translation: PageTranslation) -> Result<PageTranslation>;

    async fn find(&self, page_id: PageId, locale_id: LocaleId) -> Result<Option<PageTranslation>>;

    async fn list_by_page(&self, page_id: PageId) -> Result<Vec<PageTranslation>>;

    /// Looks up the live translation occupying `path` within
    /// `(environment_id, locale_id)`, for the path-uniqueness check (§3:
    /// "unique across non-deleted pages").
    async fn find_by_path(
        &self,
        environment_id: EnvironmentId,
        locale_id: LocaleId,
        path: &str,
    ) -> Result<Option<PageTranslation>>;

    async fn delete(&self, environment_id: EnvironmentId, page_id: PageId, locale_id: LocaleId) -> Result<()>;

    async fn delete_all(&self, environment_id: EnvironmentId, page_id: PageId) -> Result<()>;
}

#[async_trait]
pub trait PageVersionRepository: Send + Sync {
    async fn create(&self, version: PageVersion) -> Result<PageVersion>;

    async fn update(&self, version: PageVersion) -> Result<PageVersion>;

    async fn get(&self, page_id: PageId, version: i32) -> Result<Option<PageVersion>>;

    async fn list_by_page(&self, page_id: PageId) -> Result<Vec<PageVersion>>;

    async fn find_published(&self, page_id: PageId) -> Result<Option<PageVersion>>;
}
