//! Storage contracts for block definitions, instances, translations, and
//! versions (§3, §4.5).

use async_trait::async_trait;
use ferrocms_core::{
    BlockInstanceId, EnvironmentId, LocaleId, PageId, QueryableRepository, Repository, Result,
};

use crate::entities::{BlockDefinition, BlockInstance, BlockTranslation, BlockVersion};

#[async_trait]
pub trait BlockDefinitionRepository:
    QueryableRepository<BlockDefinition, ferrocms_core::BlockDefinitionId>
{
    async fn find_by_slug(
        &self,
        environment_id: EnvironmentId,
        slug: &str,
    ) -> Result<Option<BlockDefinition>>;
}

#[async_trait]
pub trait BlockInstanceRepository: Repository<BlockInstance, BlockInstanceId> {
    /// Looks up the instance mirroring a given embedded-block payload, keyed
    /// by the bridge's opaque `mirror_key` (§4.3: "keyed by a stable hash of
    /// type + position").
    async fn find_by_mirror_key(&self, mirror_key: &str) -> Result<Option<BlockInstance>>;

    /// Every mirror currently owned by one content/page record, so the
    /// bridge can delete mirrors no longer referenced by the payload.
    async fn list_by_mirror_prefix(&self, owner_prefix: &str) -> Result<Vec<BlockInstance>>;

    async fn list_by_page(&self, page_id: PageId) -> Result<Vec<BlockInstance>>;

    async fn list_global(&self, environment_id: EnvironmentId) -> Result<Vec<BlockInstance>>;
}

#[async_trait]
pub trait BlockTranslationRepository: Send + Sync {
    async fn upsert(&self, translation: BlockTranslation) -> Result<BlockTranslation>;

    async fn find(
        &self,
        block_instance_id: BlockInstanceId,
        locale_id: LocaleId,
    ) -> Result<Option<BlockTranslation>>;

    async fn list_by_instance(&self, block_instance_id: BlockInstanceId) -> Result<Vec<BlockTranslation>>;

    async fn delete(&self, block_instance_id: BlockInstanceId, locale_id: LocaleId) -> Result<()>;
}

#[async_trait]
pub trait BlockVersionRepository: Send + Sync {
    async fn create(&self, version: BlockVersion) -> Result<BlockVersion>;

    async fn update(&self, version: BlockVersion) -> Result<BlockVersion>;

    async fn get(&self, block_instance_id: BlockInstanceId, version: i32) -> Result<Option<BlockVersion>>;

    async fn list_by_instance(&self, block_instance_id: BlockInstanceId) -> Result<Vec<BlockVersion>>;

    async fn find_published(&self, block_instance_id: BlockInstanceId) -> Result<Option<BlockVersion>>;
}
