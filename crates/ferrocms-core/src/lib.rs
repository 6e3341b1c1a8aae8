//! # FerroCMS Core
//!
//! Shared types, traits, and interfaces used across the content, page,
//! block, directory, scheduler, and schema crates: identifiers, the
//! request context, the error taxonomy, engine configuration, the
//! repository abstractions, the service/pagination envelope, and the
//! pluggable hook registry.

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod hook;
pub mod id;
pub mod repository;
pub mod service;
pub mod slug;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use context::RequestContext;
pub use error::{Error, Result, ValidationError, ValidationErrors};
pub use hook::{Action, Filter, Hook, HookRegistry};
pub use id::{
    ActorId, BlockDefinitionId, BlockInstanceId, BlockTranslationId, BlockVersionId,
    ContentId, ContentTranslationId, ContentTypeId, ContentVersionId, EnvironmentId, LocaleId,
    PageId, PageTranslationId, PageVersionId, TemplateId,
};
pub use repository::{QueryableRepository, Repository, SoftDeleteRepository};
pub use service::{HealthStatus, ListParams, ListResult, Service, ServiceHealth, SortOrder};
pub use slug::{disambiguate_slug, normalize_path, normalize_slug};

/// The current version of the engine core, exposed for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
