//! In-memory repository implementations: the default test double and the
//! reference behavior a persistent implementation must match.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use ferrocms_core::{
    EnvironmentId, Error, ListParams, ListResult, LocaleId, PageId, QueryableRepository, Repository,
    Result, TemplateId,
};
use parking_lot::RwLock;

use crate::entities::{Page, PageTranslation, PageVersion, Template};
use crate::repository::{PageRepository, PageTranslationRepository, PageVersionRepository, TemplateRepository};

fn paginate<T: Clone>(mut items: Vec<T>, params: &ListParams) -> ListResult<T> {
    let total = items.len() as u64;
    let start = params.offset() as usize;
    let end = (start + params.per_page as usize).min(items.len());
    let page = if start < items.len() {
        items.drain(start..end).collect()
    } else {
        Vec::new()
    };
    ListResult::new(page, total, params)
}

/// In-memory [`TemplateRepository`] keyed by id, with a secondary index on
/// `(environment_id, slug)`.
#[derive(Default)]
pub struct InMemoryTemplateRepository {
    rows: DashMap<TemplateId, Template>,
    by_slug: RwLock<HashMap<(EnvironmentId, String), TemplateId>>,
}

impl InMemoryTemplateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&self, entity: &Template) {
        let key = (entity.environment_id, entity.slug.clone());
        let mut index = self.by_slug.write();
        if entity.is_deleted() {
            index.remove(&key);
        } else {
            index.insert(key, entity.id);
        }
    }
}

#[async_trait]
impl Repository<Template, TemplateId> for InMemoryTemplateRepository {
    async fn create(&self, entity: Template) -> Result<Template> {
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &TemplateId) -> Result<Option<Template>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: Template) -> Result<Template> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::not_found("template", entity.id.to_string()));
        }
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &TemplateId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            self.by_slug.write().remove(&(entity.environment_id, entity.slug));
        }
        Ok(())
    }

    async fn exists(&self, id: &TemplateId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl QueryableRepository<Template, TemplateId> for InMemoryTemplateRepository {
    async fn list(&self, params: &ListParams) -> Result<ListResult<Template>> {
        let items: Vec<Template> = self.rows.iter().map(|r| r.clone()).collect();
        Ok(paginate(items, params))
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<Template>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| match field {
                "slug" => r.slug == value,
                "name" => r.name == value,
                _ => false,
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<Template>> {
        Ok(self.find_by_field(field, value).await?.into_iter().next())
    }

    async fn search(&self, query: &str, params: &ListParams) -> Result<ListResult<Template>> {
        let needle = query.to_lowercase();
        let items: Vec<Template> = self
            .rows
            .iter()
            .filter(|r| r.slug.to_lowercase().contains(&needle) || r.name.to_lowercase().contains(&needle))
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn find_by_slug(&self, environment_id: EnvironmentId, slug: &str) -> Result<Option<Template>> {
        let id = self.by_slug.read().get(&(environment_id, slug.to_string())).copied();
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<Template>> {
        let items: Vec<Template> = self
            .rows
            .iter()
            .filter(|r| r.environment_id == environment_id)
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

/// In-memory [`PageRepository`] keyed by id, with secondary indices on
/// `(environment_id, slug)` and `parent_id`.
#[derive(Default)]
pub struct InMemoryPageRepository {
    rows: DashMap<PageId, Page>,
    by_slug: RwLock<HashMap<(EnvironmentId, String), PageId>>,
}

impl InMemoryPageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&self, entity: &Page) {
        let key = (entity.environment_id, entity.slug.clone());
        let mut index = self.by_slug.write();
        if entity.is_deleted() {
            index.remove(&key);
        } else {
            index.insert(key, entity.id);
        }
    }
}

#[async_trait]
impl Repository<Page, PageId> for InMemoryPageRepository {
    async fn create(&self, entity: Page) -> Result<Page> {
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &PageId) -> Result<Option<Page>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: Page) -> Result<Page> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::not_found("page", entity.id.to_string()));
        }
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &PageId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            self.by_slug.write().remove(&(entity.environment_id, entity.slug));
        }
        Ok(())
    }

    async fn exists(&self, id: &PageId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl PageRepository for InMemoryPageRepository {
    async fn find_by_slug(&self, environment_id: EnvironmentId, slug: &str) -> Result<Option<Page>> {
        let id = self.by_slug.read().get(&(environment_id, slug.to_string())).copied();
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<Page>> {
        let items: Vec<Page> = self
            .rows
            .iter()
            .filter(|r| r.environment_id == environment_id)
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }

    async fn list_children(&self, parent_id: PageId) -> Result<Vec<Page>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.parent_id == Some(parent_id) && !r.is_deleted())
            .map(|r| r.clone())
            .collect())
    }

    async fn search_by_environment(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<Page>> {
        let needle = query.to_lowercase();
        let items: Vec<Page> = self
            .rows
            .iter()
            .filter(|r| r.environment_id == environment_id && r.slug.to_lowercase().contains(&needle))
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

/// In-memory [`PageTranslationRepository`] keyed by `(page_id, locale_id)`,
/// with a secondary `(environment_id, locale_id, path)` uniqueness index
/// spanning every page in the environment.
#[derive(Default)]
pub struct InMemoryPageTranslationRepository {
    rows: DashMap<(PageId, LocaleId), PageTranslation>,
    by_path: RwLock<HashMap<(EnvironmentId, LocaleId, String), PageId>>,
}

impl InMemoryPageTranslationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageTranslationRepository for InMemoryPageTranslationRepository {
    async fn upsert(&self, environment_id: EnvironmentId, translation: PageTranslation) -> Result<PageTranslation> {
        let key = (translation.page_id, translation.locale_id);
        if let Some(existing) = self.rows.get(&key) {
            let path_key = (environment_id, translation.locale_id, existing.path.clone());
            if existing.path != translation.path {
                self.by_path.write().remove(&path_key);
            }
        }
        self.by_path.write().insert(
            (environment_id, translation.locale_id, translation.path.clone()),
            translation.page_id,
        );
        self.rows.insert(key, translation.clone());
        Ok(translation)
    }

    async fn find(&self, page_id: PageId, locale_id: LocaleId) -> Result<Option<PageTranslation>> {
        Ok(self.rows.get(&(page_id, locale_id)).map(|r| r.clone()))
    }

    async fn list_by_page(&self, page_id: PageId) -> Result<Vec<PageTranslation>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.key().0 == page_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn find_by_path(
        &self,
        environment_id: EnvironmentId,
        locale_id: LocaleId,
        path: &str,
    ) -> Result<Option<PageTranslation>> {
        let page_id = self
            .by_path
            .read()
            .get(&(environment_id, locale_id, path.to_string()))
            .copied();
        match page_id {
            Some(page_id) => self.find(page_id, locale_id).await,
            None => Ok(None),
        }
    }

    async fn delete(&self, environment_id: EnvironmentId, page_id: PageId, locale_id: LocaleId) -> Result<()> {
        if let Some((_, translation)) = self.rows.remove(&(page_id, locale_id)) {
            self.by_path
                .write()
                .remove(&(environment_id, locale_id, translation.path));
        }
        Ok(())
    }

    async fn delete_all(&self, environment_id: EnvironmentId, page_id: PageId) -> Result<()> {
        let locales: Vec<LocaleId> = self
            .rows
            .iter()
            .filter(|r| r.key().0 == page_id)
            .map(|r| r.key().1)
            .collect();
        for locale_id in locales {
            self.delete(environment_id, page_id, locale_id).await?;
        }
        Ok(())
    }
}

/// In-memory [`PageVersionRepository`] keyed by `(page_id, version)`.
#[derive(Default)]
pub struct InMemoryPageVersionRepository {
    rows: DashMap<(PageId, i32), PageVersion>,
}

impl InMemoryPageVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PageVersionRepository for InMemoryPageVersionRepository {
    async fn create(&self, version: PageVersion) -> Result<PageVersion> {
        let key = (version.page_id, version.version);
        self.rows.insert(key, version.clone());
        Ok(version)
    }

    async fn update(&self, version: PageVersion) -> Result<PageVersion> {
        let key = (version.page_id, version.version);
        if !self.rows.contains_key(&key) {
            return Err(Error::not_found("page_version", version.version.to_string()));
        }
        self.rows.insert(key, version.clone());
        Ok(version)
    }

    async fn get(&self, page_id: PageId, version: i32) -> Result<Option<PageVersion>> {
        Ok(self.rows.get(&(page_id, version)).map(|r| r.clone()))
    }

    async fn list_by_page(&self, page_id: PageId) -> Result<Vec<PageVersion>> {
        let mut versions: Vec<PageVersion> = self
            .rows
            .iter()
            .filter(|r| r.key().0 == page_id)
            .map(|r| r.clone())
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn find_published(&self, page_id: PageId) -> Result<Option<PageVersion>> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.key().0 == page_id && r.status == crate::entities::PageVersionStatus::Published)
            .map(|r| r.clone()))
    }
}
