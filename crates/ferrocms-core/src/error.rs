//! Unified error type for the editorial engine.
//!
//! Every public service method returns [`Result<T>`]. Variants are grouped by
//! the semantic kind described in the error handling design, not by which
//! repository or subsystem raised them — callers branch on kind, not shape.

use std::fmt;
use thiserror::Error;

/// The unified error type for the editorial engine.
#[derive(Error, Debug)]
pub enum Error {
    // --- Not found -------------------------------------------------------
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    // --- Validation --------------------------------------------------------
    #[error("slug is required")]
    SlugRequired,

    #[error("slug is invalid: {input:?}")]
    SlugInvalid { input: String },

    #[error("path is invalid: {path:?}")]
    PathInvalid { path: String },

    #[error("unknown locale: {code}")]
    UnknownLocale { code: String },

    #[error("duplicate locale in request: {code}")]
    DuplicateLocale { code: String },

    #[error("default locale {locale:?} is required but missing from request")]
    DefaultLocaleRequired { locale: String },

    #[error("schema invalid for {slug}@{version}: {detail}")]
    SchemaInvalid {
        slug: String,
        version: String,
        detail: String,
    },

    #[error("schedule window invalid: {reason}")]
    ScheduleWindowInvalid { reason: String },

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    // --- Invariant ---------------------------------------------------------
    #[error("{entity_type} slug already exists: {slug}")]
    SlugExists { entity_type: String, slug: String },

    #[error("path already exists: {path}")]
    PathExists { path: String },

    #[error("moving page {page_id} would create a parent cycle")]
    ParentCycle { page_id: String },

    #[error("{entity_type} version conflict: expected base version {expected}, got {actual}")]
    VersionConflict {
        entity_type: String,
        expected: i32,
        actual: i32,
    },

    #[error("{entity_type} version {version} is already published")]
    VersionAlreadyPublished { entity_type: String, version: i32 },

    #[error("content type schema change is breaking while status=active")]
    ContentTypeSchemaBreaking,

    #[error("content type cannot transition from active back to draft")]
    ContentTypeStatusChange,

    #[error("could not derive a unique slug for duplicate of {source_slug}")]
    PageDuplicateSlug { source_slug: String },

    #[error("version retention exceeded for {entity_type} {id}")]
    VersionRetentionExceeded { entity_type: String, id: String },

    // --- Feature disabled ----------------------------------------------------
    #[error("versioning is disabled")]
    VersioningDisabled,

    #[error("scheduling is disabled")]
    SchedulingDisabled,

    #[error("translations are disabled")]
    TranslationsDisabled,

    // --- Migration -----------------------------------------------------------
    #[error("no migration registered for {slug} from {from} to {to}")]
    SchemaMigrationRequired {
        slug: String,
        from: String,
        to: String,
    },

    // --- Resource --------------------------------------------------------------
    #[error("environment not found: {key}")]
    EnvironmentNotFound { key: String },

    #[error("environment inactive: {key}")]
    EnvironmentInactive { key: String },

    #[error("template unknown: {id}")]
    TemplateUnknown { id: String },

    #[error("media reference requires a non-empty id or path")]
    MediaReferenceRequired,

    // --- Soft-delete policy ------------------------------------------------------
    #[error("content does not support soft delete; pass hard_delete=true")]
    ContentSoftDeleteUnsupported,

    #[error("page does not support soft delete; pass hard_delete=true")]
    PageSoftDeleteUnsupported,

    // --- Scheduler -----------------------------------------------------------------
    #[error("scheduler job not found: {key}")]
    JobNotFound { key: String },

    // --- Ambient / infrastructure ----------------------------------------------------
    #[error("storage error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("operation canceled")]
    Canceled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Collected field-level validation errors, used by the schema validator.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result<T>(self, value: T) -> Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self))
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Diagnostic context that can be attached to an error before it crosses a
/// service boundary (entity kind, operation name, correlation id).
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub operation: String,
    pub entity_type: Option<String>,
    pub correlation_id: Option<String>,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Default::default()
        }
    }

    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

impl Error {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Error::Database {
            message: message.into(),
            source: None,
        }
    }

    pub fn database_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Error::Database {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add("_", message.into());
        Error::Validation(errors)
    }

    /// Whether a caller may reasonably retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Database { .. })
    }

    /// HTTP-equivalent status class, for callers (CLI/HTTP) mapping codes to
    /// exit codes or status codes.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound { .. }
            | Error::EnvironmentNotFound { .. }
            | Error::TemplateUnknown { .. }
            | Error::JobNotFound { .. } => 404,

            Error::SlugRequired
            | Error::SlugInvalid { .. }
            | Error::PathInvalid { .. }
            | Error::UnknownLocale { .. }
            | Error::DuplicateLocale { .. }
            | Error::DefaultLocaleRequired { .. }
            | Error::SchemaInvalid { .. }
            | Error::ScheduleWindowInvalid { .. }
            | Error::Validation(_)
            | Error::MediaReferenceRequired => 400,

            Error::SlugExists { .. }
            | Error::PathExists { .. }
            | Error::ParentCycle { .. }
            | Error::VersionConflict { .. }
            | Error::VersionAlreadyPublished { .. }
            | Error::ContentTypeSchemaBreaking
            | Error::ContentTypeStatusChange
            | Error::PageDuplicateSlug { .. }
            | Error::VersionRetentionExceeded { .. } => 409,

            Error::VersioningDisabled | Error::SchedulingDisabled | Error::TranslationsDisabled => {
                422
            }

            Error::SchemaMigrationRequired { .. } => 422,

            Error::EnvironmentInactive { .. }
            | Error::ContentSoftDeleteUnsupported
            | Error::PageSoftDeleteUnsupported => 409,

            Error::Canceled => 499,

            Error::Database { .. } | Error::Serialization { .. } | Error::Internal { .. } | Error::Other(_) => {
                500
            }
        }
    }

    /// Stable machine code such as `cms.pages.version.conflict`.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "cms.not_found",
            Error::SlugRequired => "cms.slug.required",
            Error::SlugInvalid { .. } => "cms.slug.invalid",
            Error::PathInvalid { .. } => "cms.path.invalid",
            Error::UnknownLocale { .. } => "cms.locale.unknown",
            Error::DuplicateLocale { .. } => "cms.locale.duplicate",
            Error::DefaultLocaleRequired { .. } => "cms.locale.default_required",
            Error::SchemaInvalid { .. } => "cms.schema.invalid",
            Error::ScheduleWindowInvalid { .. } => "cms.schedule.window_invalid",
            Error::Validation(_) => "cms.validation",
            Error::SlugExists { .. } => "cms.slug.exists",
            Error::PathExists { .. } => "cms.path.exists",
            Error::ParentCycle { .. } => "cms.pages.parent_cycle",
            Error::VersionConflict { .. } => "cms.version.conflict",
            Error::VersionAlreadyPublished { .. } => "cms.version.already_published",
            Error::ContentTypeSchemaBreaking => "cms.content_types.schema.breaking",
            Error::ContentTypeStatusChange => "cms.content_types.status.invalid_transition",
            Error::PageDuplicateSlug { .. } => "cms.pages.duplicate.slug_exhausted",
            Error::VersionRetentionExceeded { .. } => "cms.version.retention_exceeded",
            Error::VersioningDisabled => "cms.feature.versioning_disabled",
            Error::SchedulingDisabled => "cms.feature.scheduling_disabled",
            Error::TranslationsDisabled => "cms.feature.translations_disabled",
            Error::SchemaMigrationRequired { .. } => "cms.schema.migration_required",
            Error::EnvironmentNotFound { .. } => "cms.environment.not_found",
            Error::EnvironmentInactive { .. } => "cms.environment.inactive",
            Error::TemplateUnknown { .. } => "cms.pages.template.unknown",
            Error::MediaReferenceRequired => "cms.pages.media.reference_required",
            Error::ContentSoftDeleteUnsupported => "cms.content.soft_delete_unsupported",
            Error::PageSoftDeleteUnsupported => "cms.pages.soft_delete_unsupported",
            Error::JobNotFound { .. } => "cms.scheduler.job_not_found",
            Error::Database { .. } => "cms.storage.error",
            Error::Serialization { .. } => "cms.serialization.error",
            Error::Internal { .. } => "cms.internal",
            Error::Canceled => "cms.canceled",
            Error::Other(_) => "cms.unknown",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        assert_eq!(Error::not_found("content", "123").status_code(), 404);
    }

    #[test]
    fn version_conflict_maps_to_409_and_stable_code() {
        let err = Error::VersionConflict {
            entity_type: "page".into(),
            expected: 2,
            actual: 3,
        };
        assert_eq!(err.status_code(), 409);
        assert_eq!(err.error_code(), "cms.version.conflict");
    }

    #[test]
    fn validation_errors_collect_and_convert() {
        let mut errors = ValidationErrors::new();
        assert!(errors.is_empty());
        errors.add("slug", "is required");
        assert!(!errors.is_empty());
        let result: Result<()> = errors.into_result(());
        assert!(result.is_err());
    }

    #[test]
    fn database_errors_are_retryable_others_are_not() {
        assert!(Error::database("connection reset").is_retryable());
        assert!(!Error::not_found("page", "1").is_retryable());
    }
}
