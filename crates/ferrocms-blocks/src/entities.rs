//! Block definitions, instances, translations, and versions (§3 data
//! model: BlockDefinition, BlockInstance, BlockTranslation, BlockVersion).

use chrono::{DateTime, Utc};
use ferrocms_core::{
    BlockDefinitionId, BlockInstanceId, BlockTranslationId, BlockVersionId, EnvironmentId,
    LocaleId, PageId,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A registered block type. Versions form an append-only history (§4.5);
/// `schema_version` always names the latest registered version for
/// `slug`, mirrored from [`ferrocms_schema::SchemaRegistry`]'s own
/// "latest" pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub id: BlockDefinitionId,
    pub environment_id: EnvironmentId,
    pub slug: String,
    pub name: String,
    pub schema: Value,
    pub schema_version: String,
    pub defaults: Value,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlockDefinition {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Lifecycle status shared by block instances and block versions — the
/// same three-state machine content and pages use (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockStatus {
    Draft,
    Published,
    Archived,
}

impl Default for BlockStatus {
    fn default() -> Self {
        Self::Draft
    }
}

/// A placed block. `page_id: None` means global — visible to every page
/// reading the region once published (§3 ownership summary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInstance {
    pub id: BlockInstanceId,
    pub environment_id: EnvironmentId,
    pub definition_id: BlockDefinitionId,
    pub page_id: Option<PageId>,
    pub region: String,
    pub position: i32,
    pub configuration: Value,
    pub status: BlockStatus,
    pub current_version: i32,
    pub published_version: Option<i32>,
    /// Stable key of the inline payload this instance mirrors, when it was
    /// created by the embedded-blocks bridge rather than directly.
    pub mirror_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BlockInstance {
    pub fn is_global(&self) -> bool {
        self.page_id.is_none()
    }
}

/// A locale-specific rendering of a block instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTranslation {
    pub id: BlockTranslationId,
    pub block_instance_id: BlockInstanceId,
    pub locale_id: LocaleId,
    pub content: Value,
    pub attribute_overrides: Option<Value>,
    pub media_bindings: Vec<MediaBinding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reference to a media asset; resolved through the optional
/// `MediaService` (§3.1), a no-op passthrough when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaBinding {
    pub id: Option<String>,
    pub path: Option<String>,
}

impl MediaBinding {
    pub fn is_populated(&self) -> bool {
        self.id.as_deref().is_some_and(|s| !s.is_empty())
            || self.path.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// An immutable snapshot of a block instance's configuration and
/// translations at the moment a version was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub configuration: Value,
    pub translations: Vec<BlockTranslation>,
}

/// A versioned snapshot of a block instance (§3: at most one `published`
/// per instance, publish migrates forward to the current schema version).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockVersion {
    pub id: BlockVersionId,
    pub block_instance_id: BlockInstanceId,
    pub version: i32,
    pub status: BlockStatus,
    pub snapshot: BlockSnapshot,
    pub created_by: Option<uuid::Uuid>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub published_by: Option<uuid::Uuid>,
}

/// The reserved shape of one entry in a content/page payload's `blocks`
/// array (§4.3 embedded-block payload key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedBlock {
    #[serde(rename = "_type")]
    pub block_type: String,
    #[serde(rename = "_schema_version")]
    pub schema_version: String,
    #[serde(flatten)]
    pub body: Value,
}

impl EmbeddedBlock {
    /// Stable key used by the bridge to match an inline block back to its
    /// mirrored [`BlockInstance`] across writes: `_type` plus array
    /// position, since inline blocks carry no id of their own.
    pub fn mirror_key(block_type: &str, position: usize) -> String {
        format!("{block_type}:{position}")
    }
}
