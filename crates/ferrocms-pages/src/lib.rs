//! Page hierarchy, templates, and page lifecycle: CRUD, translations, move,
//! duplicate, versioning, scheduling, and the region/widget/media
//! enrichment pipeline (§3, §3.1, §4.4).

pub mod entities;
pub mod media;
pub mod memory;
pub mod repository;
pub mod service;
pub mod widget;

pub use entities::{
    CreatePageRequest, DuplicatePageRequest, EnrichedPage, MovePageRequest, NewPageTranslation, Page,
    PageSnapshot, PageStatus, PageTranslation, PageVersion, PageVersionStatus, Region, ResolvedWidget,
    Template, UpdatePageRequest, WidgetPlacement,
};
pub use media::{MediaAsset, MediaService, NoopMediaService};
pub use memory::{
    InMemoryPageRepository, InMemoryPageTranslationRepository, InMemoryPageVersionRepository,
    InMemoryTemplateRepository,
};
pub use repository::{PageRepository, PageTranslationRepository, PageVersionRepository, TemplateRepository};
pub use service::PageService;
pub use widget::{NoopWidgetService, WidgetService};
