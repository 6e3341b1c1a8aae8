//! Content CRUD, translations, versioning, scheduling, and the embedded-block
//! bridge integration (§4.3).

use std::sync::Arc;

use async_trait::async_trait;
use ferrocms_blocks::EmbeddedBlocksBridge;
use ferrocms_core::{
    hook::hooks, slug::normalize_slug, Clock, ContentId, ContentTypeId, EngineConfig, EnvironmentId,
    Error, HookRegistry, ListParams, ListResult, LocaleId, Result, Service, ServiceHealth,
    ValidationErrors,
};
use ferrocms_directory::{EnvironmentService, LocaleService};
use ferrocms_events::{Activity, ActivityEmitter, ActivityVerb, ObjectType};
use ferrocms_schema::{validate_partial_payload, validate_payload, Migrator, SchemaVersion, ValidationMode};
use ferrocms_scheduler::{job_type, Job, JobSpec, SchedulerService};
use serde_json::Value;
use uuid::Uuid;

use crate::entities::{
    Content, ContentSnapshot, ContentStatus, ContentTranslation, ContentVersion,
    ContentVersionStatus, CreateContentRequest, NewContentTranslation, UpdateContentRequest,
};
use crate::repository::{ContentRepository, ContentTranslationRepository, ContentTypeRepository, ContentVersionRepository};

/// Owns content CRUD, translation replacement, draft/publish/preview/restore
/// versioning, scheduling, and embedded-block synchronization. Consumes the
/// content type registry (for schema lookups), the environment service (to
/// gate every mutation on an active environment), the locale service (for
/// translation validation), the shared schema migrator, the scheduler, the
/// embedded-blocks bridge, and the activity emitter.
pub struct ContentService {
    content_types: Arc<dyn ContentTypeRepository>,
    contents: Arc<dyn ContentRepository>,
    translations: Arc<dyn ContentTranslationRepository>,
    versions: Arc<dyn ContentVersionRepository>,
    environments: Arc<EnvironmentService>,
    locales: Arc<LocaleService>,
    migrator: Arc<Migrator>,
    scheduler: Arc<SchedulerService>,
    blocks: Arc<EmbeddedBlocksBridge>,
    activity: Arc<ActivityEmitter>,
    hooks: Arc<HookRegistry>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ContentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        content_types: Arc<dyn ContentTypeRepository>,
        contents: Arc<dyn ContentRepository>,
        translations: Arc<dyn ContentTranslationRepository>,
        versions: Arc<dyn ContentVersionRepository>,
        environments: Arc<EnvironmentService>,
        locales: Arc<LocaleService>,
        migrator: Arc<Migrator>,
        scheduler: Arc<SchedulerService>,
        blocks: Arc<EmbeddedBlocksBridge>,
        activity: Arc<ActivityEmitter>,
        hooks: Arc<HookRegistry>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            content_types,
            contents,
            translations,
            versions,
            environments,
            locales,
            migrator,
            scheduler,
            blocks,
            activity,
            hooks,
            clock,
            config,
        }
    }

    fn owner_key(content_id: ContentId) -> String {
        format!("content:{content_id}")
    }

    /// Resolves one request translation to a stored row, validating locale
    /// codes and rejecting duplicates within the same request.
    async fn resolve_translations(
        &self,
        content_id: ContentId,
        incoming: &[NewContentTranslation],
        existing: &[ContentTranslation],
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<ContentTranslation>> {
        let mut seen = std::collections::HashSet::new();
        let mut resolved = Vec::with_capacity(incoming.len());

        for item in incoming {
            let code = item.locale_code.trim().to_lowercase();
            if !seen.insert(code.clone()) {
                return Err(Error::DuplicateLocale { code });
            }
            let locale = self
                .locales
                .resolve_code(&code)
                .await
                .map_err(|_| Error::UnknownLocale { code: code.clone() })?;

            let prior = existing.iter().find(|t| t.locale_id == locale.id);
            resolved.push(ContentTranslation {
                id: prior
                    .map(|t| t.id)
                    .unwrap_or_else(ferrocms_core::ContentTranslationId::new),
                content_id,
                locale_id: locale.id,
                translation_group_id: prior.map(|t| t.translation_group_id).unwrap_or_else(|| *content_id.as_uuid()),
                title: item.title.clone(),
                summary: item.summary.clone(),
                content: item.content.clone(),
                created_at: prior.map(|t| t.created_at).unwrap_or(now),
                updated_at: now,
            });
        }
        Ok(resolved)
    }

    fn require_translation_coverage(
        &self,
        translations: &[NewContentTranslation],
        allow_missing: Option<bool>,
    ) -> Result<()> {
        let allow_missing = allow_missing.unwrap_or(false);
        if allow_missing {
            return Ok(());
        }
        if self.config.require_translations && translations.is_empty() {
            let mut errors = ValidationErrors::new();
            errors.add("translations", "at least one translation is required");
            return Err(Error::Validation(errors));
        }
        if self.config.default_locale_required {
            let default_code = self.config.default_locale.to_lowercase();
            let has_default = translations
                .iter()
                .any(|t| t.locale_code.trim().to_lowercase() == default_code);
            if !has_default {
                return Err(Error::DefaultLocaleRequired { locale: default_code });
            }
        }
        Ok(())
    }

    /// Creates a content entry: validates the content type, translation
    /// coverage, and locale codes, writes the record plus its translations,
    /// syncs embedded blocks from each translation's payload, and emits a
    /// `create` activity.
    pub async fn create(&self, environment_id: EnvironmentId, req: CreateContentRequest) -> Result<Content> {
        self.environments.require_active(environment_id).await?;
        let content_type = self
            .content_types
            .find_by_id(&req.content_type_id)
            .await?
            .ok_or_else(|| Error::not_found("content_type", req.content_type_id.to_string()))?;
        if content_type.environment_id != environment_id {
            return Err(Error::not_found("content_type", req.content_type_id.to_string()));
        }

        let slug = normalize_slug(&req.slug)?;
        if self
            .contents
            .find_by_slug(environment_id, req.content_type_id, &slug)
            .await?
            .is_some()
        {
            return Err(Error::SlugExists {
                entity_type: "content".to_string(),
                slug,
            });
        }

        self.require_translation_coverage(&req.translations, req.allow_missing_translations)?;

        let now = self.clock.now();
        let content_id = ContentId::new();
        let resolved = self
            .resolve_translations(content_id, &req.translations, &[], now)
            .await?;

        let primary_locale = match &req.primary_locale_code {
            Some(code) => Some(self.locales.resolve_code(code).await?.id),
            None => resolved.first().map(|t| t.locale_id),
        };

        let content = Content {
            id: content_id,
            environment_id,
            content_type_id: req.content_type_id,
            slug,
            status: ContentStatus::Draft,
            current_version: 1,
            published_version: None,
            publish_at: None,
            unpublish_at: None,
            published_at: None,
            primary_locale,
            metadata: req.metadata,
            created_by: req.created_by,
            updated_by: req.created_by,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let content = self.contents.create(content).await?;

        for translation in &resolved {
            self.translations.upsert(translation.clone()).await?;
        }

        self.versions
            .create(ContentVersion {
                id: ferrocms_core::ContentVersionId::new(),
                content_id,
                version: 1,
                status: ContentVersionStatus::Draft,
                snapshot: ContentSnapshot {
                    translations: resolved.clone(),
                    metadata: content.metadata.clone(),
                },
                created_by: req.created_by,
                created_at: now,
                published_at: None,
                published_by: None,
            })
            .await?;

        for translation in &resolved {
            self.blocks
                .sync(environment_id, &Self::owner_key(content_id), &translation.content, ValidationMode::Partial)
                .await?;
        }

        self.emit(ActivityVerb::Create, &content).await;
        self.hooks.do_action(hooks::CONTENT_CREATED, Arc::new(content.clone())).await;
        Ok(content)
    }

    pub async fn get(&self, id: ContentId) -> Result<Content> {
        self.contents
            .find_by_id(&id)
            .await?
            .filter(|c| !c.is_deleted())
            .ok_or_else(|| Error::not_found("content", id.to_string()))
    }

    pub async fn list(&self, environment_id: EnvironmentId, params: &ListParams) -> Result<ListResult<Content>> {
        self.contents.list_by_environment(environment_id, params).await
    }

    pub async fn search(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<Content>> {
        self.contents.search_by_environment(environment_id, query, params).await
    }

    /// Replaces translations wholesale when `req.translations` is `Some`,
    /// preserving `created_at`/`translation_group_id` per locale. `metadata:
    /// None` leaves it untouched; `Some` (including an empty map) replaces
    /// it.
    pub async fn update(&self, id: ContentId, req: UpdateContentRequest) -> Result<Content> {
        let mut content = self.get(id).await?;
        self.environments.require_active(content.environment_id).await?;
        let now = self.clock.now();

        if let Some(incoming) = req.translations {
            self.require_translation_coverage(&incoming, Some(true))?;
            let existing = self.translations.list_by_content(id).await?;
            let resolved = self.resolve_translations(id, &incoming, &existing, now).await?;

            let keep: std::collections::HashSet<LocaleId> = resolved.iter().map(|t| t.locale_id).collect();
            for stale in existing.iter().filter(|t| !keep.contains(&t.locale_id)) {
                self.translations.delete(id, stale.locale_id).await?;
            }
            for translation in &resolved {
                self.translations.upsert(translation.clone()).await?;
                self.blocks
                    .sync(
                        content.environment_id,
                        &Self::owner_key(id),
                        &translation.content,
                        ValidationMode::Partial,
                    )
                    .await?;
            }
        }

        if let Some(metadata) = req.metadata {
            content.metadata = metadata;
        }
        if let Some(updated_by) = req.updated_by {
            content.updated_by = Some(updated_by);
        }
        content.updated_at = now;

        let content = self.contents.update(content).await?;
        self.emit(ActivityVerb::Update, &content).await;
        Ok(content)
    }

    /// Only hard delete is supported (§7: soft-delete policy). Cancels
    /// pending publish/unpublish scheduler jobs best-effort.
    pub async fn delete(&self, id: ContentId, hard_delete: bool) -> Result<()> {
        if !hard_delete {
            return Err(Error::ContentSoftDeleteUnsupported);
        }
        let content = self.get(id).await?;
        self.environments.require_active(content.environment_id).await?;

        self.scheduler
            .cancel_by_key_best_effort(&Job::key_for("content", id, "publish"))
            .await?;
        self.scheduler
            .cancel_by_key_best_effort(&Job::key_for("content", id, "unpublish"))
            .await?;

        self.contents.delete(&id).await?;
        self.emit(ActivityVerb::Delete, &content).await;
        self.hooks.do_action(hooks::CONTENT_DELETED, Arc::new(content.clone())).await;
        Ok(())
    }

    pub async fn update_translation(
        &self,
        content_id: ContentId,
        translation: NewContentTranslation,
    ) -> Result<ContentTranslation> {
        let content = self.get(content_id).await?;
        self.environments.require_active(content.environment_id).await?;
        let existing = self.translations.list_by_content(content_id).await?;
        let now = self.clock.now();
        let resolved = self
            .resolve_translations(content_id, std::slice::from_ref(&translation), &existing, now)
            .await?
            .remove(0);

        let stored = self.translations.upsert(resolved.clone()).await?;
        self.blocks
            .sync(content.environment_id, &Self::owner_key(content_id), &stored.content, ValidationMode::Partial)
            .await?;
        Ok(stored)
    }

    /// Rejects deleting the last remaining translation when
    /// `require_translations` is set, and the default locale when
    /// `default_locale_required` is set.
    pub async fn delete_translation(&self, content_id: ContentId, locale_code: &str) -> Result<()> {
        let content = self.get(content_id).await?;
        self.environments.require_active(content.environment_id).await?;
        let locale = self.locales.resolve_code(locale_code).await?;
        let existing = self.translations.list_by_content(content_id).await?;

        if self.config.require_translations && existing.len() <= 1 {
            let mut errors = ValidationErrors::new();
            errors.add("locale_code", "cannot delete the only remaining translation");
            return Err(Error::Validation(errors));
        }
        if self.config.default_locale_required
            && locale_code.trim().to_lowercase() == self.config.default_locale.to_lowercase()
        {
            return Err(Error::DefaultLocaleRequired {
                locale: self.config.default_locale.clone(),
            });
        }

        self.translations.delete(content_id, locale.id).await
    }

    /// Validates the publish/unpublish window, recomputes the resting
    /// status, and idempotently enqueues or cancels the scheduler jobs
    /// keyed `content.publish.<id>` / `content.unpublish.<id>`.
    pub async fn schedule(
        &self,
        content_id: ContentId,
        publish_at: Option<chrono::DateTime<chrono::Utc>>,
        unpublish_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Content> {
        if !self.config.scheduling_enabled {
            return Err(Error::SchedulingDisabled);
        }
        let mut content = self.get(content_id).await?;
        self.environments.require_active(content.environment_id).await?;

        if let (Some(publish_at), Some(unpublish_at)) = (publish_at, unpublish_at) {
            if publish_at >= unpublish_at {
                return Err(Error::ScheduleWindowInvalid {
                    reason: "publish_at must be before unpublish_at".to_string(),
                });
            }
        }

        content.publish_at = publish_at;
        content.unpublish_at = unpublish_at;

        let now = self.clock.now();
        content.status = if publish_at.map(|at| at > now).unwrap_or(false) {
            ContentStatus::Scheduled
        } else if content.published_version.is_some() && publish_at.map(|at| at <= now).unwrap_or(true) {
            ContentStatus::Published
        } else {
            ContentStatus::Draft
        };
        content.updated_at = self.clock.now();
        let content = self.contents.update(content).await?;

        match publish_at {
            Some(run_at) => {
                self.scheduler
                    .enqueue(JobSpec::new(
                        Job::key_for("content", content_id, "publish"),
                        job_type::CONTENT_PUBLISH,
                        run_at,
                    ))
                    .await?;
            }
            None => {
                self.scheduler
                    .cancel_by_key_best_effort(&Job::key_for("content", content_id, "publish"))
                    .await?;
            }
        }
        match unpublish_at {
            Some(run_at) => {
                self.scheduler
                    .enqueue(JobSpec::new(
                        Job::key_for("content", content_id, "unpublish"),
                        job_type::CONTENT_UNPUBLISH,
                        run_at,
                    ))
                    .await?;
            }
            None => {
                self.scheduler
                    .cancel_by_key_best_effort(&Job::key_for("content", content_id, "unpublish"))
                    .await?;
            }
        }

        self.emit(ActivityVerb::Schedule, &content).await;
        Ok(content)
    }

    /// Appends a new draft version snapshotting current translations and
    /// metadata. Validated in draft (partial) mode; `base_version` guards
    /// against lost updates.
    pub async fn create_draft(&self, content_id: ContentId, base_version: Option<i32>) -> Result<ContentVersion> {
        if !self.config.versioning_enabled {
            return Err(Error::VersioningDisabled);
        }
        let mut content = self.get(content_id).await?;
        self.environments.require_active(content.environment_id).await?;

        if let Some(limit) = self.config.version_retention {
            let existing = self.versions.list_by_content(content_id).await?;
            if existing.len() as u32 >= limit {
                return Err(Error::VersionRetentionExceeded {
                    entity_type: "content".to_string(),
                    id: content_id.to_string(),
                });
            }
        }

        let next_version = content.current_version + 1;
        if let Some(base) = base_version {
            if base != content.current_version {
                return Err(Error::VersionConflict {
                    entity_type: "content".to_string(),
                    expected: content.current_version,
                    actual: base,
                });
            }
        }

        let translations = self.translations.list_by_content(content_id).await?;
        let content_type = self.content_type_for(&content).await?;
        for translation in &translations {
            validate_partial_payload(&content_type.schema, &translation.content)?;
            self.blocks
                .sync(content.environment_id, &Self::owner_key(content_id), &translation.content, ValidationMode::Partial)
                .await?;
        }

        let now = self.clock.now();
        let version = self
            .versions
            .create(ContentVersion {
                id: ferrocms_core::ContentVersionId::new(),
                content_id,
                version: next_version,
                status: ContentVersionStatus::Draft,
                snapshot: ContentSnapshot {
                    translations,
                    metadata: content.metadata.clone(),
                },
                created_by: None,
                created_at: now,
                published_at: None,
                published_by: None,
            })
            .await?;

        content.current_version = next_version;
        if content.published_version.is_none() {
            content.status = ContentStatus::Draft;
        }
        content.updated_at = now;
        self.contents.update(content).await?;

        Ok(version)
    }

    /// Migrates the draft snapshot's translation payloads through the
    /// schema migrator to the content type's current schema version,
    /// migrates embedded blocks to their latest definitions, validates
    /// strictly, archives the previously-published version, and flips the
    /// record to `published` (§4.3 schema migration algorithm).
    pub async fn publish_draft(&self, content_id: ContentId, version: i32) -> Result<ContentVersion> {
        let mut draft = self
            .versions
            .get(content_id, version)
            .await?
            .ok_or_else(|| Error::not_found("content_version", version.to_string()))?;
        if draft.status == ContentVersionStatus::Published {
            return Err(Error::VersionAlreadyPublished {
                entity_type: "content".to_string(),
                version,
            });
        }

        let mut content = self.get(content_id).await?;
        self.environments.require_active(content.environment_id).await?;
        self.hooks.do_action(hooks::PRE_CONTENT_PUBLISH, Arc::new(content.clone())).await;
        let content_type = self.content_type_for(&content).await?;
        let target: SchemaVersion = content_type
            .schema_version
            .parse()
            .unwrap_or_else(|_| SchemaVersion::initial(&content_type.slug));

        for translation in draft.snapshot.translations.iter_mut() {
            self.migrate_translation_payload(&content_type.slug, &target, translation)?;
            self.blocks.migrate_to_latest(content.environment_id, &mut translation.content).await?;
            validate_payload(&content_type.schema, &translation.content)?;
        }

        if let Some(published_version) = content.published_version {
            if let Some(mut previous) = self.versions.get(content_id, published_version).await? {
                previous.status = ContentVersionStatus::Archived;
                self.versions.update(previous).await?;
            }
        }

        let now = self.clock.now();
        draft.status = ContentVersionStatus::Published;
        draft.published_at = Some(now);
        let draft = self.versions.update(draft).await?;

        content.published_version = Some(version);
        content.published_at = Some(now);
        content.status = ContentStatus::Published;
        content.updated_at = now;
        let content = self.contents.update(content).await?;

        tracing::debug!(%content_id, version, "published content version");
        self.emit(ActivityVerb::Publish, &content).await;
        self.hooks.do_action(hooks::CONTENT_PUBLISHED, Arc::new(content.clone())).await;
        Ok(draft)
    }

    /// Returns a fully migrated, draft-mode-validated preview without
    /// persisting anything.
    pub async fn preview_draft(&self, content_id: ContentId, version: i32) -> Result<ContentSnapshot> {
        let draft = self
            .versions
            .get(content_id, version)
            .await?
            .ok_or_else(|| Error::not_found("content_version", version.to_string()))?;
        let content = self.get(content_id).await?;
        let content_type = self.content_type_for(&content).await?;
        let target: SchemaVersion = content_type
            .schema_version
            .parse()
            .unwrap_or_else(|_| SchemaVersion::initial(&content_type.slug));

        let mut snapshot = draft.snapshot;
        for translation in snapshot.translations.iter_mut() {
            self.migrate_translation_payload(&content_type.slug, &target, translation)?;
            self.blocks.migrate_to_latest(content.environment_id, &mut translation.content).await?;
            validate_partial_payload(&content_type.schema, &translation.content)?;
        }
        Ok(snapshot)
    }

    pub async fn list_versions(&self, content_id: ContentId) -> Result<Vec<ContentVersion>> {
        self.versions.list_by_content(content_id).await
    }

    /// Restoration never mutates the source version: it creates a fresh
    /// draft seeded from the prior snapshot.
    pub async fn restore_version(&self, content_id: ContentId, version: i32) -> Result<ContentVersion> {
        let source = self
            .versions
            .get(content_id, version)
            .await?
            .ok_or_else(|| Error::not_found("content_version", version.to_string()))?;

        let mut content = self.get(content_id).await?;
        self.environments.require_active(content.environment_id).await?;

        for translation in &source.snapshot.translations {
            self.translations.upsert(translation.clone()).await?;
        }
        content.metadata = source.snapshot.metadata.clone();
        self.contents.update(content).await?;

        self.create_draft(content_id, None).await
    }

    async fn content_type_for(&self, content: &Content) -> Result<crate::entities::ContentType> {
        self.content_types
            .find_by_id(&content.content_type_id)
            .await?
            .ok_or_else(|| Error::not_found("content_type", content.content_type_id.to_string()))
    }

    /// Schema migration algorithm shared by content and blocks (§4.3): strip
    /// the root `schema_version` key, no-op when absent or already current,
    /// else walk the registered migration chain and re-stamp the target
    /// version.
    fn migrate_translation_payload(
        &self,
        slug: &str,
        target: &SchemaVersion,
        translation: &mut ContentTranslation,
    ) -> Result<()> {
        let body = &mut translation.content;
        let current_label = body
            .get("schema_version")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if current_label == target.to_string() {
            return Ok(());
        }

        let from: SchemaVersion = if current_label.is_empty() {
            SchemaVersion::initial(slug)
        } else {
            current_label.parse()?
        };
        if from.slug != target.slug {
            return Err(Error::SchemaInvalid {
                slug: slug.to_string(),
                version: target.to_string(),
                detail: format!("payload schema_version slug {} does not match {}", from.slug, target.slug),
            });
        }

        let mut payload = body.clone();
        if let Some(obj) = payload.as_object_mut() {
            obj.remove("schema_version");
        }
        let migrated = self.migrator.migrate(slug, &from.version, &target.version, payload)?;
        *body = migrated;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("schema_version".to_string(), Value::String(target.to_string()));
        }
        Ok(())
    }

    async fn emit(&self, verb: ActivityVerb, content: &Content) {
        self.activity
            .emit(
                Activity::new(verb, ObjectType::Content, *content.id.as_uuid())
                    .with_channel("content")
                    .with_metadata("env_id", content.environment_id.to_string())
                    .with_metadata("slug", content.slug.clone())
                    .with_metadata("status", format!("{:?}", content.status).to_lowercase()),
            )
            .await;
    }
}

#[async_trait]
impl Service for ContentService {
    fn name(&self) -> &str {
        "content-service"
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_type::ContentTypeService;
    use crate::memory::{
        InMemoryContentRepository, InMemoryContentTranslationRepository, InMemoryContentTypeRepository,
        InMemoryContentVersionRepository,
    };
    use ferrocms_blocks::{
        InMemoryBlockDefinitionRepository, InMemoryBlockInstanceRepository,
        InMemoryBlockTranslationRepository, InMemoryBlockVersionRepository, BlockService,
    };
    use ferrocms_core::{HookRegistry, SystemClock};
    use ferrocms_directory::memory::{InMemoryEnvironmentRepository, InMemoryLocaleRepository};
    use ferrocms_directory::EnvironmentService;
    use ferrocms_schema::SchemaRegistry;
    use ferrocms_scheduler::InMemorySchedulerJobRepository;
    use serde_json::json;

    struct Harness {
        content: ContentService,
        content_types: ContentTypeService,
        environment_id: EnvironmentId,
    }

    async fn harness() -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let schema_registry = Arc::new(SchemaRegistry::new());
        let migrator = Arc::new(Migrator::new());
        let activity = Arc::new(ActivityEmitter::new());
        let hooks = Arc::new(HookRegistry::new());
        let config = EngineConfig::default();

        let locale_repo = Arc::new(InMemoryLocaleRepository::new());
        let locales = Arc::new(LocaleService::new(locale_repo, clock.clone()));
        locales.create("en", "English", true).await.unwrap();

        let environment_repo = Arc::new(InMemoryEnvironmentRepository::new());
        let environments = Arc::new(EnvironmentService::new(environment_repo, clock.clone()));
        let environment = environments.create("default", "Default", true).await.unwrap();

        let content_type_repo = Arc::new(InMemoryContentTypeRepository::new());
        let content_types = ContentTypeService::new(
            content_type_repo.clone(),
            schema_registry.clone(),
            migrator.clone(),
            activity.clone(),
            environments.clone(),
            clock.clone(),
            config.clone(),
        );

        let block_service = Arc::new(BlockService::new(
            Arc::new(InMemoryBlockDefinitionRepository::new()),
            Arc::new(InMemoryBlockInstanceRepository::new()),
            Arc::new(InMemoryBlockTranslationRepository::new()),
            Arc::new(InMemoryBlockVersionRepository::new()),
            environments.clone(),
            schema_registry.clone(),
            migrator.clone(),
            hooks.clone(),
            clock.clone(),
            config.clone(),
        ));
        let blocks = Arc::new(EmbeddedBlocksBridge::new(block_service));

        let scheduler = Arc::new(SchedulerService::new(
            Arc::new(InMemorySchedulerJobRepository::new()),
            clock.clone(),
        ));

        let content = ContentService::new(
            content_type_repo,
            Arc::new(InMemoryContentRepository::new()),
            Arc::new(InMemoryContentTranslationRepository::new()),
            Arc::new(InMemoryContentVersionRepository::new()),
            environments,
            locales,
            migrator,
            scheduler,
            blocks,
            activity,
            hooks,
            clock,
            config,
        );

        Harness {
            content,
            content_types,
            environment_id: environment.id,
        }
    }

    fn article_schema() -> Value {
        json!({
            "type": "object",
            "required": ["title"],
            "properties": { "title": { "type": "string" } },
        })
    }

    fn create_req(content_type_id: ContentTypeId) -> CreateContentRequest {
        CreateContentRequest {
            slug: "hello".to_string(),
            content_type_id,
            translations: vec![NewContentTranslation {
                locale_code: "en".to_string(),
                title: "Hi".to_string(),
                summary: None,
                content: json!({ "title": "Hi" }),
            }],
            primary_locale_code: Some("en".to_string()),
            metadata: json!({}),
            allow_missing_translations: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn create_then_draft_then_publish_tracks_version_and_status() {
        let h = harness().await;
        let ct = h
            .content_types
            .create(h.environment_id, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();

        let content = h.content.create(h.environment_id, create_req(ct.id)).await.unwrap();
        assert_eq!(content.status, ContentStatus::Draft);
        assert_eq!(content.current_version, 1);

        let draft = h.content.create_draft(content.id, None).await.unwrap();
        assert_eq!(draft.version, 2);

        let published = h.content.publish_draft(content.id, 2).await.unwrap();
        assert_eq!(published.status, ContentVersionStatus::Published);

        let content = h.content.get(content.id).await.unwrap();
        assert_eq!(content.published_version, Some(2));
        assert_eq!(content.status, ContentStatus::Published);
    }

    #[tokio::test]
    async fn duplicate_locale_in_one_request_is_rejected() {
        let h = harness().await;
        let ct = h
            .content_types
            .create(h.environment_id, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();

        let mut req = create_req(ct.id);
        req.translations.push(NewContentTranslation {
            locale_code: "EN".to_string(),
            title: "Hi again".to_string(),
            summary: None,
            content: json!({ "title": "Hi again" }),
        });

        let err = h.content.create(h.environment_id, req).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateLocale { .. }));
    }

    #[tokio::test]
    async fn unknown_locale_is_rejected() {
        let h = harness().await;
        let ct = h
            .content_types
            .create(h.environment_id, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();

        let mut req = create_req(ct.id);
        req.translations[0].locale_code = "xx".to_string();

        let err = h.content.create(h.environment_id, req).await.unwrap_err();
        assert!(matches!(err, Error::UnknownLocale { .. }));
    }

    #[tokio::test]
    async fn slug_collision_within_env_and_type_is_rejected() {
        let h = harness().await;
        let ct = h
            .content_types
            .create(h.environment_id, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();

        h.content.create(h.environment_id, create_req(ct.id)).await.unwrap();
        let err = h.content.create(h.environment_id, create_req(ct.id)).await.unwrap_err();
        assert!(matches!(err, Error::SlugExists { .. }));
    }

    #[tokio::test]
    async fn hard_delete_is_required() {
        let h = harness().await;
        let ct = h
            .content_types
            .create(h.environment_id, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();
        let content = h.content.create(h.environment_id, create_req(ct.id)).await.unwrap();

        let err = h.content.delete(content.id, false).await.unwrap_err();
        assert!(matches!(err, Error::ContentSoftDeleteUnsupported));
        h.content.delete(content.id, true).await.unwrap();
    }

    #[tokio::test]
    async fn preview_draft_never_mutates_storage() {
        let h = harness().await;
        let ct = h
            .content_types
            .create(h.environment_id, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();
        let content = h.content.create(h.environment_id, create_req(ct.id)).await.unwrap();

        let before = h.content.get(content.id).await.unwrap();
        let preview = h.content.preview_draft(content.id, 1).await.unwrap();
        assert_eq!(preview.translations[0].content["title"], "Hi");

        let after = h.content.get(content.id).await.unwrap();
        assert_eq!(before.updated_at, after.updated_at);
        assert_eq!(before.current_version, after.current_version);
    }
}
