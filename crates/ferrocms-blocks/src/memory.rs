//! In-memory repository implementations — `DashMap` keyed by id plus
//! `RwLock`-guarded secondary index maps, the same pattern used throughout
//! the directory, events, and scheduler crates.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use ferrocms_core::{
    BlockDefinitionId, BlockInstanceId, Error, EnvironmentId, ListParams, ListResult, LocaleId,
    PageId, QueryableRepository, Repository, Result,
};
use parking_lot::RwLock;

use crate::entities::{BlockDefinition, BlockInstance, BlockTranslation, BlockVersion};
use crate::repository::{
    BlockDefinitionRepository, BlockInstanceRepository, BlockTranslationRepository,
    BlockVersionRepository,
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

#[derive(Default)]
pub struct InMemoryBlockDefinitionRepository {
    rows: DashMap<BlockDefinitionId, BlockDefinition>,
    by_slug: RwLock<HashMap<(EnvironmentId, String), BlockDefinitionId>>,
}

impl InMemoryBlockDefinitionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<BlockDefinition, BlockDefinitionId> for InMemoryBlockDefinitionRepository {
    async fn create(&self, entity: BlockDefinition) -> Result<BlockDefinition> {
        self.by_slug
            .write()
            .insert((entity.environment_id, entity.slug.clone()), entity.id);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &BlockDefinitionId) -> Result<Option<BlockDefinition>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: BlockDefinition) -> Result<BlockDefinition> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::not_found("block_definition", entity.id.to_string()));
        }
        self.by_slug
            .write()
            .insert((entity.environment_id, entity.slug.clone()), entity.id);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &BlockDefinitionId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            self.by_slug
                .write()
                .remove(&(entity.environment_id, entity.slug));
        }
        Ok(())
    }

    async fn exists(&self, id: &BlockDefinitionId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl QueryableRepository<BlockDefinition, BlockDefinitionId> for InMemoryBlockDefinitionRepository {
    async fn list(&self, params: &ListParams) -> Result<ListResult<BlockDefinition>> {
        let items: Vec<BlockDefinition> = self
            .rows
            .iter()
            .filter(|r| !r.is_deleted())
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<BlockDefinition>> {
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

    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<BlockDefinition>> {
        Ok(self.find_by_field(field, value).await?.into_iter().next())
    }

    async fn search(&self, query: &str, params: &ListParams) -> Result<ListResult<BlockDefinition>> {
        let needle = query.to_lowercase();
        let items: Vec<BlockDefinition> = self
            .rows
            .iter()
            .filter(|r| {
                !r.is_deleted()
                    && (r.slug.to_lowercase().contains(&needle)
                        || r.name.to_lowercase().contains(&needle))
            })
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

#[async_trait]
impl BlockDefinitionRepository for InMemoryBlockDefinitionRepository {
    async fn find_by_slug(
        &self,
        environment_id: EnvironmentId,
        slug: &str,
    ) -> Result<Option<BlockDefinition>> {
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
}

#[derive(Default)]
pub struct InMemoryBlockInstanceRepository {
    rows: DashMap<BlockInstanceId, BlockInstance>,
    by_mirror_key: RwLock<HashMap<String, BlockInstanceId>>,
}

impl InMemoryBlockInstanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn reindex(&self, entity: &BlockInstance) {
        if let Some(key) = &entity.mirror_key {
            self.by_mirror_key.write().insert(key.clone(), entity.id);
        }
    }
}

#[async_trait]
impl Repository<BlockInstance, BlockInstanceId> for InMemoryBlockInstanceRepository {
    async fn create(&self, entity: BlockInstance) -> Result<BlockInstance> {
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &BlockInstanceId) -> Result<Option<BlockInstance>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: BlockInstance) -> Result<BlockInstance> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::not_found("block_instance", entity.id.to_string()));
        }
        self.reindex(&entity);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &BlockInstanceId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            if let Some(key) = entity.mirror_key {
                self.by_mirror_key.write().remove(&key);
            }
        }
        Ok(())
    }

    async fn exists(&self, id: &BlockInstanceId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl BlockInstanceRepository for InMemoryBlockInstanceRepository {
    async fn find_by_mirror_key(&self, mirror_key: &str) -> Result<Option<BlockInstance>> {
        let id = self.by_mirror_key.read().get(mirror_key).copied();
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn list_by_mirror_prefix(&self, owner_prefix: &str) -> Result<Vec<BlockInstance>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| {
                r.mirror_key
                    .as_deref()
                    .is_some_and(|key| key.starts_with(owner_prefix))
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn list_by_page(&self, page_id: PageId) -> Result<Vec<BlockInstance>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.page_id == Some(page_id))
            .map(|r| r.clone())
            .collect())
    }

    async fn list_global(&self, environment_id: EnvironmentId) -> Result<Vec<BlockInstance>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.environment_id == environment_id && r.is_global())
            .map(|r| r.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryBlockTranslationRepository {
    rows: RwLock<HashMap<(BlockInstanceId, LocaleId), BlockTranslation>>,
}

impl InMemoryBlockTranslationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockTranslationRepository for InMemoryBlockTranslationRepository {
    async fn upsert(&self, translation: BlockTranslation) -> Result<BlockTranslation> {
        self.rows.write().insert(
            (translation.block_instance_id, translation.locale_id),
            translation.clone(),
        );
        Ok(translation)
    }

    async fn find(
        &self,
        block_instance_id: BlockInstanceId,
        locale_id: LocaleId,
    ) -> Result<Option<BlockTranslation>> {
        Ok(self
            .rows
            .read()
            .get(&(block_instance_id, locale_id))
            .cloned())
    }

    async fn list_by_instance(&self, block_instance_id: BlockInstanceId) -> Result<Vec<BlockTranslation>> {
        Ok(self
            .rows
            .read()
            .values()
            .filter(|t| t.block_instance_id == block_instance_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, block_instance_id: BlockInstanceId, locale_id: LocaleId) -> Result<()> {
        self.rows.write().remove(&(block_instance_id, locale_id));
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryBlockVersionRepository {
    rows: RwLock<HashMap<(BlockInstanceId, i32), BlockVersion>>,
}

impl InMemoryBlockVersionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlockVersionRepository for InMemoryBlockVersionRepository {
    async fn create(&self, version: BlockVersion) -> Result<BlockVersion> {
        self.rows
            .write()
            .insert((version.block_instance_id, version.version), version.clone());
        Ok(version)
    }

    async fn update(&self, version: BlockVersion) -> Result<BlockVersion> {
        if !self
            .rows
            .read()
            .contains_key(&(version.block_instance_id, version.version))
        {
            return Err(Error::not_found(
                "block_version",
                format!("{}@{}", version.block_instance_id, version.version),
            ));
        }
        self.rows
            .write()
            .insert((version.block_instance_id, version.version), version.clone());
        Ok(version)
    }

    async fn get(&self, block_instance_id: BlockInstanceId, version: i32) -> Result<Option<BlockVersion>> {
        Ok(self.rows.read().get(&(block_instance_id, version)).cloned())
    }

    async fn list_by_instance(&self, block_instance_id: BlockInstanceId) -> Result<Vec<BlockVersion>> {
        let mut versions: Vec<BlockVersion> = self
            .rows
            .read()
            .values()
            .filter(|v| v.block_instance_id == block_instance_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    async fn find_published(&self, block_instance_id: BlockInstanceId) -> Result<Option<BlockVersion>> {
        Ok(self
            .rows
            .read()
            .values()
            .find(|v| {
                v.block_instance_id == block_instance_id
                    && v.status == crate::entities::BlockStatus::Published
            })
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::BlockStatus;
    use chrono::Utc;
    use serde_json::json;

    fn instance(mirror_key: Option<&str>) -> BlockInstance {
        BlockInstance {
            id: BlockInstanceId::new(),
            environment_id: EnvironmentId::new(),
            definition_id: BlockDefinitionId::new(),
            page_id: None,
            region: "main".to_string(),
            position: 0,
            configuration: json!({}),
            status: BlockStatus::Draft,
            current_version: 1,
            published_version: None,
            mirror_key: mirror_key.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn mirror_key_lookup_finds_the_indexed_instance() {
        let repo = InMemoryBlockInstanceRepository::new();
        let created = repo.create(instance(Some("content:1:hero:0"))).await.unwrap();

        let found = repo
            .find_by_mirror_key("content:1:hero:0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn mirror_prefix_scopes_to_one_owner() {
        let repo = InMemoryBlockInstanceRepository::new();
        repo.create(instance(Some("content:1:hero:0"))).await.unwrap();
        repo.create(instance(Some("content:1:hero:1"))).await.unwrap();
        repo.create(instance(Some("content:2:hero:0"))).await.unwrap();

        let owned = repo.list_by_mirror_prefix("content:1:").await.unwrap();
        assert_eq!(owned.len(), 2);
    }

    #[tokio::test]
    async fn deleting_an_instance_clears_its_mirror_index_entry() {
        let repo = InMemoryBlockInstanceRepository::new();
        let created = repo.create(instance(Some("content:1:hero:0"))).await.unwrap();
        repo.delete(&created.id).await.unwrap();

        assert!(repo
            .find_by_mirror_key("content:1:hero:0")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn slug_lookup_is_scoped_per_environment() {
        let repo = InMemoryBlockDefinitionRepository::new();
        let env_a = EnvironmentId::new();
        let env_b = EnvironmentId::new();

        repo.create(BlockDefinition {
            id: BlockDefinitionId::new(),
            environment_id: env_a,
            slug: "hero".to_string(),
            name: "Hero".to_string(),
            schema: json!({ "type": "object" }),
            schema_version: "hero@v1.0.0".to_string(),
            defaults: json!({}),
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
        .await
        .unwrap();

        assert!(repo.find_by_slug(env_a, "hero").await.unwrap().is_some());
        assert!(repo.find_by_slug(env_b, "hero").await.unwrap().is_none());
    }
}
