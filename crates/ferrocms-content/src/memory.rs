//! In-memory repository implementations: the default test double and the
//! reference behavior a persistent implementation must match.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use ferrocms_core::{
    ContentId, ContentTypeId, EnvironmentId, Error, ListParams, ListResult, LocaleId,
    QueryableRepository, Repository, Result,
};
use parking_lot::RwLock;

use crate::entities::{Content, ContentTranslation, ContentType, ContentVersion};
use crate::repository::{
    ContentRepository, ContentTranslationRepository, ContentTypeRepository, ContentVersionRepository,
};

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

/// In-memory [`ContentTypeRepository`] keyed by id, with a secondary index
/// on `(environment_id, slug)` for uniqueness checks and lookup. A
/// soft-deleted row drops out of the slug index so the slug is reusable
/// (§4.2: "soft-delete unhooks the slug").
#[derive(Default)]
pub struct InMemoryContentTypeRepository {
    rows: DashMap<ContentTypeId, ContentType>,
    by_slug: RwLock<HashMap<(EnvironmentId, String), ContentTypeId>>,
}

impl InMemoryContentTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&self, entity: &ContentType) {
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
impl Repository<ContentType, ContentTypeId> for InMemoryContentTypeRepository {
    async fn create(&self, entity: ContentType) -> Result<ContentType> {
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &ContentTypeId) -> Result<Option<ContentType>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: ContentType) -> Result<ContentType> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::not_found("content_type", entity.id.to_string()));
        }
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &ContentTypeId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            self.by_slug
                .write()
                .remove(&(entity.environment_id, entity.slug));
        }
        Ok(())
    }

    async fn exists(&self, id: &ContentTypeId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl QueryableRepository<ContentType, ContentTypeId> for InMemoryContentTypeRepository {
    async fn list(&self, params: &ListParams) -> Result<ListResult<ContentType>> {
        let items: Vec<ContentType> = self.rows.iter().map(|r| r.clone()).collect();
        Ok(paginate(items, params))
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<ContentType>> {
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

    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<ContentType>> {
        Ok(self.find_by_field(field, value).await?.into_iter().next())
    }

    async fn search(&self, query: &str, params: &ListParams) -> Result<ListResult<ContentType>> {
        let needle = query.to_lowercase();
        let items: Vec<ContentType> = self
            .rows
            .iter()
            .filter(|r| r.slug.to_lowercase().contains(&needle) || r.name.to_lowercase().contains(&needle))
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

#[async_trait]
impl ContentTypeRepository for InMemoryContentTypeRepository {
    async fn find_by_slug(
        &self,
        environment_id: EnvironmentId,
        slug: &str,
    ) -> Result<Option<ContentType>> {
        let id = self
            .by_slug
            .read()
            .get(&(environment_id, slug.to_string()))
            .copied();
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<ContentType>> {
        let items: Vec<ContentType> = self
            .rows
            .iter()
            .filter(|r| r.environment_id == environment_id)
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }

    async fn search_by_environment(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<ContentType>> {
        let needle = query.to_lowercase();
        let items: Vec<ContentType> = self
            .rows
            .iter()
            .filter(|r| {
                r.environment_id == environment_id
                    && (r.slug.to_lowercase().contains(&needle) || r.name.to_lowercase().contains(&needle))
            })
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

/// In-memory [`ContentRepository`] keyed by id, with a secondary index on
/// `(environment_id, content_type_id, slug)`.
#[derive(Default)]
pub struct InMemoryContentRepository {
    rows: DashMap<ContentId, Content>,
    by_slug: RwLock<HashMap<(EnvironmentId, ContentTypeId, String), ContentId>>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&self, entity: &Content) {
        let key = (entity.environment_id, entity.content_type_id, entity.slug.clone());
        let mut index = self.by_slug.write();
        if entity.is_deleted() {
            index.remove(&key);
        } else {
            index.insert(key, entity.id);
        }
    }
}

#[async_trait]
impl Repository<Content, ContentId> for InMemoryContentRepository {
    async fn create(&self, entity: Content) -> Result<Content> {
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &ContentId) -> Result<Option<Content>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: Content) -> Result<Content> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::not_found("content", entity.id.to_string()));
        }
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &ContentId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            self.by_slug
                .write()
                .remove(&(entity.environment_id, entity.content_type_id, entity.slug));
        }
        Ok(())
    }

    async fn exists(&self, id: &ContentId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn find_by_slug(
        &self,
        environment_id: EnvironmentId,
        content_type_id: ContentTypeId,
        slug: &str,
    ) -> Result<Option<Content>> {
        let id = self
            .by_slug
            .read()
            .get(&(environment_id, content_type_id, slug.to_string()))
            .copied();
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn list_by_environment(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<Content>> {
        let items: Vec<Content> = self
            .rows
            .iter()
            .filter(|r| r.environment_id == environment_id)
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }

    async fn search_by_environment(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<Content>> {
        let needle = query.to_lowercase();
        let items: Vec<Content> = self
            .rows
            .iter()
            .filter(|r| r.environment_id == environment_id && r.slug.to_lowercase().contains(&needle))
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

/// In-memory [`ContentTranslationRepository`] keyed by `(content_id,
/// locale_id)`.
#[derive(Default)]
pub struct InMemoryContentTranslationRepository {
    rows: DashMap<(ContentId, LocaleId), ContentTranslation>,
}

impl InMemoryContentTranslationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentTranslationRepository for InMemoryContentTranslationRepository {
    async fn upsert(&self, translation: ContentTranslation) -> Result<ContentTranslation> {
        let key = (translation.content_id, translation.locale_id);
        self.rows.insert(key, translation.clone());
        Ok(translation)
    }

    async fn find(&self, content_id: ContentId, locale_id: LocaleId) -> Result<Option<ContentTranslation>> {
        Ok(self.rows.get(&(content_id, locale_id)).map(|r| r.clone()))
    }

    async fn list_by_content(&self, content_id: ContentId) -> Result<Vec<ContentTranslation>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.key().0 == content_id)
            .map(|r| r.clone())
            .collect())
    }

    async fn delete(&self, content_id: ContentId, locale_id: LocaleId) -> Result<()> {
        self.rows.remove(&(content_id, locale_id));
        Ok(())
    }
}

/// In-memory [`ContentVersionRepository`] keyed by `(content_id, version)`.
#[derive(Default)]
pub struct InMemoryContentVersionRepository {
    rows: DashMap<(ContentId, i32), ContentVersion>,
}

impl InMemoryContentVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentVersionRepository for InMemoryContentVersionRepository {
    async fn create(&self, version: ContentVersion) -> Result<ContentVersion> {
        let key = (version.content_id, version.version);
        self.rows.insert(key, version.clone());
        Ok(version)
    }

    async fn update(&self, version: ContentVersion) -> Result<ContentVersion> {
        let key = (version.content_id, version.version);
        if !self.rows.contains_key(&key) {
            return Err(Error::not_found("content_version", version.version.to_string()));
        }
        self.rows.insert(key, version.clone());
        Ok(version)
    }

    async fn get(&self, content_id: ContentId, version: i32) -> Result<Option<ContentVersion>> {
        Ok(self.rows.get(&(content_id, version)).map(|r| r.clone()))
    }

    async fn list_by_content(&self, content_id: ContentId) -> Result<Vec<ContentVersion>> {
        let mut versions: Vec<ContentVersion> = self
            .rows
            .iter()
            .filter(|r| r.key().0 == content_id)
            .map(|r| r.clone())
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn find_published(&self, content_id: ContentId) -> Result<Option<ContentVersion>> {
        Ok(self
            .rows
            .iter()
            .find(|r| r.key().0 == content_id && r.status == crate::entities::ContentVersionStatus::Published)
            .map(|r| r.clone()))
    }
}
