//! Pages, page translations, versions, and the template/widget model (§3
//! data model: Page, PageTranslation, PageVersion; §3.1 expansion: Template,
//! Region, WidgetPlacement).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use ferrocms_blocks::{BlockInstance, MediaBinding};
use ferrocms_core::{ContentId, EnvironmentId, LocaleId, PageId, TemplateId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A named area of a page template that accepts an ordered list of block
/// placements, optionally also accepting widgets (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub accepts_widgets: bool,
}

/// A registered page layout: an ordered set of named regions (§3.1). Pages
/// reference a template by id; `themes_enabled` in [`ferrocms_core::EngineConfig`]
/// gates whether the template must additionally resolve against a
/// `ThemeService` or may be taken at face value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub environment_id: EnvironmentId,
    pub slug: String,
    pub name: String,
    pub regions: Vec<Region>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Template {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.name == name)
    }
}

/// An opaque reference to a widget plus its placement within a template
/// area, resolved per read through the optional `WidgetService` (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetPlacement {
    pub area: String,
    pub widget_ref: String,
    pub position: i32,
}

/// A fully resolved widget, as returned by [`crate::widget::WidgetService`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedWidget {
    pub widget_ref: String,
    pub area: String,
    pub position: i32,
    pub payload: Value,
}

/// Clock-driven lifecycle state of a page, mirroring [`ferrocms_content::ContentStatus`]
/// (§4.4: derived from `publish_at`/`unpublish_at`/`published_at` at read
/// time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Draft,
    Scheduled,
    Published,
    Archived,
}

/// A routing/hierarchy entry wrapping a [`ferrocms_content::Content`] record.
/// Slug and template are immutable after creation; the parent chain must
/// stay acyclic across `Create`/`Move`/`Duplicate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub environment_id: EnvironmentId,
    pub content_id: ContentId,
    pub template_id: TemplateId,
    pub parent_id: Option<PageId>,
    pub slug: String,
    pub status: PageStatus,
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

impl Page {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Effective status at `now`, per the same precedence table content
    /// uses: an unpublish window first, then a future `publish_at`
    /// (scheduled), then a due `publish_at` or recorded `published_at`
    /// (published), else the resting status (§4.4 condition table).
    pub fn effective_status(&self, now: DateTime<Utc>) -> PageStatus {
        if let Some(unpublish_at) = self.unpublish_at {
            if unpublish_at <= now {
                return PageStatus::Archived;
            }
        }
        if let Some(publish_at) = self.publish_at {
            if publish_at > now {
                return PageStatus::Scheduled;
            }
            return PageStatus::Published;
        }
        if let Some(published_at) = self.published_at {
            if published_at <= now {
                return PageStatus::Published;
            }
        }
        self.status
    }

    pub fn is_visible(&self, now: DateTime<Utc>) -> bool {
        matches!(self.effective_status(now), PageStatus::Published)
    }
}

/// A locale-specific routing entry for a page: title, path, SEO fields, and
/// media references. `path` is normalized to begin with `/` and must be
/// unique across non-deleted pages within `(environment_id, locale_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTranslation {
    pub id: ferrocms_core::PageTranslationId,
    pub page_id: PageId,
    pub locale_id: LocaleId,
    pub title: String,
    pub path: String,
    pub summary: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub media_bindings: Vec<MediaBinding>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable snapshot of a page's region/widget layout and metadata at
/// the moment a version was created (§3: `Regions: map<region,
/// ordered[block placement]>`, `Widgets: map<area, ordered[widget
/// placement]>`, `Metadata`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub regions: HashMap<String, Vec<BlockInstance>>,
    pub widgets: HashMap<String, Vec<WidgetPlacement>>,
    pub metadata: Value,
}

/// The same three-state machine content versions use (§4.4 cross-reference).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageVersionStatus {
    Draft,
    Published,
    Archived,
}

/// A versioned snapshot of a page's layout (§3: at most one `published` per
/// page).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageVersion {
    pub id: ferrocms_core::PageVersionId,
    pub page_id: PageId,
    pub version: i32,
    pub status: PageVersionStatus,
    pub snapshot: PageSnapshot,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub published_by: Option<Uuid>,
}

/// A page's resting fields plus everything the enrichment pipeline
/// decorates on read: merged region block instances, resolved widgets, and
/// the clock-derived effective status (§4.4 enrichment pipeline).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedPage {
    pub page: Page,
    pub template: Template,
    pub regions: HashMap<String, Vec<BlockInstance>>,
    pub widgets: HashMap<String, Vec<ResolvedWidget>>,
    pub effective_status: PageStatus,
    pub is_visible: bool,
}

/// The translations a caller hands `Create`/`Update`/`UpdateTranslation`,
/// keyed by locale code (§4.4, mirroring [`ferrocms_content::NewContentTranslation`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPageTranslation {
    pub locale_code: String,
    pub title: String,
    pub path: String,
    pub summary: Option<String>,
    pub seo_title: Option<String>,
    pub seo_description: Option<String>,
    pub media_bindings: Vec<MediaBinding>,
}

/// Request DTO for [`crate::service::PageService::create`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePageRequest {
    pub slug: String,
    pub content_id: ContentId,
    pub template_id: TemplateId,
    pub parent_id: Option<PageId>,
    pub translations: Vec<NewPageTranslation>,
    pub primary_locale_code: Option<String>,
    pub metadata: Value,
    pub allow_missing_translations: Option<bool>,
    pub created_by: Option<Uuid>,
}

/// Request DTO for [`crate::service::PageService::update`]. `None` leaves a
/// field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePageRequest {
    pub translations: Option<Vec<NewPageTranslation>>,
    pub metadata: Option<Value>,
    pub updated_by: Option<Uuid>,
}

/// Request DTO for [`crate::service::PageService::move_page`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovePageRequest {
    pub new_parent_id: Option<PageId>,
}

/// Request DTO for [`crate::service::PageService::duplicate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatePageRequest {
    pub slug: Option<String>,
    pub created_by: Option<Uuid>,
}
