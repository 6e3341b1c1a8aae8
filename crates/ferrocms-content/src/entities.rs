//! Content types and content entries (§3 data model: ContentType, Content,
//! ContentTranslation, ContentVersion).

use chrono::{DateTime, Utc};
use ferrocms_core::{ContentId, ContentTranslationId, ContentTypeId, ContentVersionId, EnvironmentId, LocaleId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Draft/active lifecycle for a content type definition (§4.2). Unlike
/// content/page status this is a one-way gate: once active, a type cannot
/// move back to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentTypeStatus {
    Draft,
    Active,
}

/// One recorded schema change, appended every time `Update` changes the
/// schema or UI schema (§4.2: "stamps history with a snapshot").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTypeSchemaSnapshot {
    pub version: String,
    pub schema: Value,
    pub ui_schema: Value,
    pub recorded_at: DateTime<Utc>,
}

/// A registered content schema: a JSON Schema document plus an append-only
/// history of prior versions (§4.2, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentType {
    pub id: ContentTypeId,
    pub environment_id: EnvironmentId,
    pub slug: String,
    pub name: String,
    pub schema: Value,
    pub ui_schema: Value,
    pub status: ContentTypeStatus,
    pub schema_version: String,
    pub schema_history: Vec<ContentTypeSchemaSnapshot>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentType {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Clock-driven lifecycle state of a content entry (§4.3, §4.4: derived
/// from `publish_at`/`unpublish_at`/`published_at` at read time, but the
/// engine also keeps a resting value in storage for listing/filtering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Scheduled,
    Published,
    Archived,
}

/// A content entry: the owning record translations and versions hang off
/// of. Slug and content type are immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    pub environment_id: EnvironmentId,
    pub content_type_id: ContentTypeId,
    pub slug: String,
    pub status: ContentStatus,
    pub current_version: i32,
    pub published_version: Option<i32>,
    pub publish_at: Option<DateTime<Utc>>,
    pub unpublish_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub primary_locale: Option<LocaleId>,
    pub metadata: Value,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Content {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// The effective status at `now`, per the condition table: an
    /// unpublish window takes precedence over everything, then a future
    /// `publish_at` (scheduled), then a due `publish_at` or a recorded
    /// `published_at` (published), else the resting status (§4.4).
    pub fn effective_status(&self, now: DateTime<Utc>) -> ContentStatus {
        if let Some(unpublish_at) = self.unpublish_at {
            if unpublish_at <= now {
                return ContentStatus::Archived;
            }
        }
        if let Some(publish_at) = self.publish_at {
            if publish_at > now {
                return ContentStatus::Scheduled;
            }
            return ContentStatus::Published;
        }
        if let Some(published_at) = self.published_at {
            if published_at <= now {
                return ContentStatus::Published;
            }
        }
        self.status
    }
}

/// A locale-specific rendering of a content entry. `translation_group_id`
/// links translations created together (e.g. across a `Duplicate`) even
/// once one of them is individually replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentTranslation {
    pub id: ContentTranslationId,
    pub content_id: ContentId,
    pub locale_id: LocaleId,
    pub translation_group_id: Uuid,
    pub title: String,
    pub summary: Option<String>,
    pub content: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable snapshot of a content entry's translations and metadata at
/// the moment a version was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub translations: Vec<ContentTranslation>,
    pub metadata: Value,
}

/// The same three-state machine block versions use (§4.5 cross-reference):
/// a content version is a draft, the one published version, or archived
/// once superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentVersionStatus {
    Draft,
    Published,
    Archived,
}

/// A versioned snapshot of a content entry (§3: at most one `published`
/// per content, publishing migrates the snapshot to the content type's
/// current schema version).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentVersion {
    pub id: ContentVersionId,
    pub content_id: ContentId,
    pub version: i32,
    pub status: ContentVersionStatus,
    pub snapshot: ContentSnapshot,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub published_by: Option<Uuid>,
}

/// The translations a caller hands `Create`/`Update`/`UpdateTranslation`,
/// keyed by locale code rather than a resolved [`LocaleId`] since the
/// caller deals in locale codes, not ids (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewContentTranslation {
    pub locale_code: String,
    pub title: String,
    pub summary: Option<String>,
    pub content: Value,
}

/// Request DTO for [`crate::content::ContentService::create`]. Every
/// tunable `Create` accepts is enumerated here rather than threaded as
/// positional arguments (§9: explicit operation configuration records).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateContentRequest {
    pub slug: String,
    pub content_type_id: ContentTypeId,
    pub translations: Vec<NewContentTranslation>,
    pub primary_locale_code: Option<String>,
    pub metadata: Value,
    pub allow_missing_translations: Option<bool>,
    pub created_by: Option<Uuid>,
}

/// Request DTO for [`crate::content::ContentService::update`]. `None`
/// leaves a field untouched; `Some` replaces it — including `Some(empty
/// map)` to explicitly clear `metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateContentRequest {
    pub translations: Option<Vec<NewContentTranslation>>,
    pub metadata: Option<Value>,
    pub updated_by: Option<Uuid>,
}
