//! Page CRUD, translations, hierarchy (move/duplicate), versioning,
//! scheduling, and the read-time enrichment pipeline (§4.4).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use ferrocms_blocks::BlockService;
use ferrocms_content::ContentRepository;
use ferrocms_core::{
    hook::hooks,
    slug::{normalize_path, normalize_slug},
    Clock, EngineConfig, EnvironmentId, Error, HookRegistry, ListParams, ListResult, LocaleId,
    PageId, Result, Service, ServiceHealth, TemplateId, ValidationErrors,
};
use ferrocms_directory::{EnvironmentService, LocaleService};
use ferrocms_events::{Activity, ActivityEmitter, ActivityVerb, ObjectType};
use ferrocms_scheduler::{job_type, Job, JobSpec, SchedulerService};

use crate::entities::{
    CreatePageRequest, DuplicatePageRequest, EnrichedPage, MovePageRequest, NewPageTranslation, Page,
    PageSnapshot, PageStatus, PageTranslation, PageVersion, PageVersionStatus, Template,
    UpdatePageRequest,
};
use crate::media::{MediaAsset, MediaService, NoopMediaService};
use crate::repository::{PageRepository, PageTranslationRepository, PageVersionRepository, TemplateRepository};
use crate::widget::{NoopWidgetService, WidgetService};

/// Owns page CRUD, translation replacement, hierarchy moves/duplication,
/// draft/publish/preview/restore versioning, scheduling, and the
/// region/widget/media enrichment pipeline. Consumes the content repository
/// (for `content_id` existence checks), the template registry, the
/// environment service (to gate every mutation on an active environment),
/// the locale service, the block service (region/global placement lookups),
/// the scheduler, and the activity emitter.
pub struct PageService {
    templates: Arc<dyn TemplateRepository>,
    pages: Arc<dyn PageRepository>,
    translations: Arc<dyn PageTranslationRepository>,
    versions: Arc<dyn PageVersionRepository>,
    contents: Arc<dyn ContentRepository>,
    locales: Arc<LocaleService>,
    environments: Arc<EnvironmentService>,
    blocks: Arc<BlockService>,
    widget_service: Arc<dyn WidgetService>,
    media_service: Arc<dyn MediaService>,
    scheduler: Arc<SchedulerService>,
    activity: Arc<ActivityEmitter>,
    hooks: Arc<HookRegistry>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl PageService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        pages: Arc<dyn PageRepository>,
        translations: Arc<dyn PageTranslationRepository>,
        versions: Arc<dyn PageVersionRepository>,
        contents: Arc<dyn ContentRepository>,
        locales: Arc<LocaleService>,
        environments: Arc<EnvironmentService>,
        blocks: Arc<BlockService>,
        scheduler: Arc<SchedulerService>,
        activity: Arc<ActivityEmitter>,
        hooks: Arc<HookRegistry>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self::with_optional_services(
            templates,
            pages,
            translations,
            versions,
            contents,
            locales,
            environments,
            blocks,
            Arc::new(NoopWidgetService),
            Arc::new(NoopMediaService),
            scheduler,
            activity,
            hooks,
            clock,
            config,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_optional_services(
        templates: Arc<dyn TemplateRepository>,
        pages: Arc<dyn PageRepository>,
        translations: Arc<dyn PageTranslationRepository>,
        versions: Arc<dyn PageVersionRepository>,
        contents: Arc<dyn ContentRepository>,
        locales: Arc<LocaleService>,
        environments: Arc<EnvironmentService>,
        blocks: Arc<BlockService>,
        widget_service: Arc<dyn WidgetService>,
        media_service: Arc<dyn MediaService>,
        scheduler: Arc<SchedulerService>,
        activity: Arc<ActivityEmitter>,
        hooks: Arc<HookRegistry>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            templates,
            pages,
            translations,
            versions,
            contents,
            locales,
            environments,
            blocks,
            widget_service,
            media_service,
            scheduler,
            activity,
            hooks,
            clock,
            config,
        }
    }

    async fn template_for(&self, template_id: TemplateId) -> Result<Option<Template>> {
        self.templates.find_by_id(&template_id).await
    }

    async fn require_template(&self, environment_id: EnvironmentId, template_id: TemplateId) -> Result<()> {
        if !self.config.themes_enabled {
            return Ok(());
        }
        let template = self
            .template_for(template_id)
            .await?
            .ok_or_else(|| Error::TemplateUnknown { id: template_id.to_string() })?;
        if template.environment_id != environment_id || template.is_deleted() {
            return Err(Error::TemplateUnknown { id: template_id.to_string() });
        }
        Ok(())
    }

    fn require_translation_coverage(
        &self,
        translations: &[NewPageTranslation],
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

    /// Resolves one request translation to a stored row, validating locale
    /// codes, path normalization/uniqueness, and media bindings.
    async fn resolve_translations(
        &self,
        environment_id: EnvironmentId,
        page_id: PageId,
        incoming: &[NewPageTranslation],
        existing: &[PageTranslation],
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<PageTranslation>> {
        let mut seen = HashSet::new();
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

            let path = normalize_path(&item.path)?;
            if let Some(holder) = self.translations.find_by_path(environment_id, locale.id, &path).await? {
                if holder.page_id != page_id {
                    return Err(Error::PathExists { path });
                }
            }

            for binding in &item.media_bindings {
                if (binding.id.is_some() || binding.path.is_some()) && !binding.is_populated() {
                    return Err(Error::MediaReferenceRequired);
                }
            }

            let prior = existing.iter().find(|t| t.locale_id == locale.id);
            resolved.push(PageTranslation {
                id: prior.map(|t| t.id).unwrap_or_else(ferrocms_core::PageTranslationId::new),
                page_id,
                locale_id: locale.id,
                title: item.title.clone(),
                path,
                summary: item.summary.clone(),
                seo_title: item.seo_title.clone(),
                seo_description: item.seo_description.clone(),
                media_bindings: item.media_bindings.clone(),
                created_at: prior.map(|t| t.created_at).unwrap_or(now),
                updated_at: now,
            });
        }
        Ok(resolved)
    }

    /// Creates a page: validates the template, the referenced content entry,
    /// the parent (if any), translation coverage, per-locale path
    /// uniqueness, and media references, then writes the record plus
    /// translations and emits a `create` activity.
    pub async fn create(&self, environment_id: EnvironmentId, req: CreatePageRequest) -> Result<Page> {
        self.environments.require_active(environment_id).await?;
        self.require_template(environment_id, req.template_id).await?;

        let content = self
            .contents
            .find_by_id(&req.content_id)
            .await?
            .ok_or_else(|| Error::not_found("content", req.content_id.to_string()))?;
        if content.environment_id != environment_id {
            return Err(Error::not_found("content", req.content_id.to_string()));
        }

        if let Some(parent_id) = req.parent_id {
            let parent = self
                .pages
                .find_by_id(&parent_id)
                .await?
                .filter(|p| !p.is_deleted())
                .ok_or_else(|| Error::not_found("page", parent_id.to_string()))?;
            if parent.environment_id != environment_id {
                return Err(Error::not_found("page", parent_id.to_string()));
            }
        }

        let slug = normalize_slug(&req.slug)?;
        if self.pages.find_by_slug(environment_id, &slug).await?.is_some() {
            return Err(Error::SlugExists {
                entity_type: "page".to_string(),
                slug,
            });
        }

        self.require_translation_coverage(&req.translations, req.allow_missing_translations)?;

        let now = self.clock.now();
        let page_id = PageId::new();
        let resolved = self
            .resolve_translations(environment_id, page_id, &req.translations, &[], now)
            .await?;

        let primary_locale = match &req.primary_locale_code {
            Some(code) => Some(self.locales.resolve_code(code).await?.id),
            None => resolved.first().map(|t| t.locale_id),
        };

        let page = Page {
            id: page_id,
            environment_id,
            content_id: req.content_id,
            template_id: req.template_id,
            parent_id: req.parent_id,
            slug,
            status: PageStatus::Draft,
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
        let page = self.pages.create(page).await?;

        for translation in &resolved {
            self.translations.upsert(environment_id, translation.clone()).await?;
        }

        self.versions
            .create(PageVersion {
                id: ferrocms_core::PageVersionId::new(),
                page_id,
                version: 1,
                status: PageVersionStatus::Draft,
                snapshot: PageSnapshot {
                    regions: HashMap::new(),
                    widgets: HashMap::new(),
                    metadata: page.metadata.clone(),
                },
                created_by: req.created_by,
                created_at: now,
                published_at: None,
                published_by: None,
            })
            .await?;

        self.emit(ActivityVerb::Create, &page).await;
        self.hooks.do_action(hooks::PAGE_CREATED, Arc::new(page.clone())).await;
        Ok(page)
    }

    pub async fn get(&self, id: PageId) -> Result<Page> {
        self.pages
            .find_by_id(&id)
            .await?
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| Error::not_found("page", id.to_string()))
    }

    pub async fn list(&self, environment_id: EnvironmentId, params: &ListParams) -> Result<ListResult<Page>> {
        self.pages.list_by_environment(environment_id, params).await
    }

    pub async fn search(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<Page>> {
        self.pages.search_by_environment(environment_id, query, params).await
    }

    pub async fn list_children(&self, parent_id: PageId) -> Result<Vec<Page>> {
        self.pages.list_children(parent_id).await
    }

    /// Replaces translations wholesale when `req.translations` is `Some`,
    /// preserving `created_at` per locale. `metadata: None` leaves it
    /// untouched.
    pub async fn update(&self, id: PageId, req: UpdatePageRequest) -> Result<Page> {
        let mut page = self.get(id).await?;
        self.environments.require_active(page.environment_id).await?;
        let now = self.clock.now();

        if let Some(incoming) = req.translations {
            self.require_translation_coverage(&incoming, Some(true))?;
            let existing = self.translations.list_by_page(id).await?;
            let resolved = self
                .resolve_translations(page.environment_id, id, &incoming, &existing, now)
                .await?;

            let keep: HashSet<LocaleId> = resolved.iter().map(|t| t.locale_id).collect();
            for stale in existing.iter().filter(|t| !keep.contains(&t.locale_id)) {
                self.translations.delete(page.environment_id, id, stale.locale_id).await?;
            }
            for translation in &resolved {
                self.translations.upsert(page.environment_id, translation.clone()).await?;
            }
        }

        if let Some(metadata) = req.metadata {
            page.metadata = metadata;
        }
        if let Some(updated_by) = req.updated_by {
            page.updated_by = Some(updated_by);
        }
        page.updated_at = now;

        let page = self.pages.update(page).await?;
        self.emit(ActivityVerb::Update, &page).await;
        Ok(page)
    }

    /// Only hard delete is supported (§7: soft-delete policy). Cancels
    /// pending publish/unpublish scheduler jobs best-effort and removes
    /// translations.
    pub async fn delete(&self, id: PageId, hard_delete: bool) -> Result<()> {
        if !hard_delete {
            return Err(Error::PageSoftDeleteUnsupported);
        }
        let page = self.get(id).await?;
        self.environments.require_active(page.environment_id).await?;

        self.scheduler
            .cancel_by_key_best_effort(&Job::key_for("page", id, "publish"))
            .await?;
        self.scheduler
            .cancel_by_key_best_effort(&Job::key_for("page", id, "unpublish"))
            .await?;

        self.translations.delete_all(page.environment_id, id).await?;
        self.pages.delete(&id).await?;
        self.emit(ActivityVerb::Delete, &page).await;
        Ok(())
    }

    pub async fn update_translation(&self, page_id: PageId, translation: NewPageTranslation) -> Result<PageTranslation> {
        let page = self.get(page_id).await?;
        self.environments.require_active(page.environment_id).await?;
        let existing = self.translations.list_by_page(page_id).await?;
        let now = self.clock.now();
        let resolved = self
            .resolve_translations(page.environment_id, page_id, std::slice::from_ref(&translation), &existing, now)
            .await?
            .remove(0);

        self.translations.upsert(page.environment_id, resolved).await
    }

    /// Rejects deleting the last remaining translation when
    /// `require_translations` is set, and the default locale when
    /// `default_locale_required` is set.
    pub async fn delete_translation(&self, page_id: PageId, locale_code: &str) -> Result<()> {
        let page = self.get(page_id).await?;
        self.environments.require_active(page.environment_id).await?;
        let locale = self.locales.resolve_code(locale_code).await?;
        let existing = self.translations.list_by_page(page_id).await?;

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

        self.translations.delete(page.environment_id, page_id, locale.id).await
    }

    /// Rejects a move that would introduce a cycle: walks ancestors from
    /// `new_parent_id` upward and fails with [`Error::ParentCycle`] if
    /// `page_id` itself appears among them (§4.4 DFS from candidate-new-
    /// parent upward). Does not recompute descendant paths (§9 design
    /// note: current behavior leaves paths authored by callers unchanged).
    pub async fn move_page(&self, page_id: PageId, req: MovePageRequest) -> Result<Page> {
        let mut page = self.get(page_id).await?;
        self.environments.require_active(page.environment_id).await?;

        if let Some(new_parent_id) = req.new_parent_id {
            if new_parent_id == page_id {
                return Err(Error::ParentCycle { page_id: page_id.to_string() });
            }
            let mut cursor = Some(new_parent_id);
            let mut visited = HashSet::new();
            while let Some(ancestor_id) = cursor {
                if ancestor_id == page_id {
                    return Err(Error::ParentCycle { page_id: page_id.to_string() });
                }
                if !visited.insert(ancestor_id) {
                    break;
                }
                let ancestor = self
                    .pages
                    .find_by_id(&ancestor_id)
                    .await?
                    .ok_or_else(|| Error::not_found("page", ancestor_id.to_string()))?;
                if ancestor.environment_id != page.environment_id {
                    return Err(Error::not_found("page", ancestor_id.to_string()));
                }
                cursor = ancestor.parent_id;
            }
        }

        page.parent_id = req.new_parent_id;
        page.updated_at = self.clock.now();
        let page = self.pages.update(page).await?;
        self.emit(ActivityVerb::Move, &page).await;
        self.hooks.do_action(hooks::PAGE_MOVED, Arc::new(page.clone())).await;
        Ok(page)
    }

    /// Async counterpart of [`disambiguate_slug`] for page slugs: appends
    /// `-1`, `-2`, … until the candidate is free, bailing out after
    /// `max_attempts` (§4.4).
    async fn disambiguate_page_slug(&self, environment_id: EnvironmentId, base: &str, max_attempts: u32) -> Result<String> {
        if self.pages.find_by_slug(environment_id, base).await?.is_none() {
            return Ok(base.to_string());
        }
        for n in 1..=max_attempts {
            let candidate = format!("{base}-{n}");
            if self.pages.find_by_slug(environment_id, &candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(Error::PageDuplicateSlug { source_slug: base.to_string() })
    }

    /// Same suffix algorithm as [`Self::disambiguate_page_slug`], scoped to
    /// the `(environment, locale)` path-uniqueness index instead.
    async fn disambiguate_page_path(
        &self,
        environment_id: EnvironmentId,
        locale_id: LocaleId,
        base: &str,
        max_attempts: u32,
    ) -> Result<String> {
        let candidate_path = format!("/{base}");
        if self.translations.find_by_path(environment_id, locale_id, &candidate_path).await?.is_none() {
            return Ok(base.to_string());
        }
        for n in 1..=max_attempts {
            let candidate = format!("{base}-{n}");
            let candidate_path = format!("/{candidate}");
            if self.translations.find_by_path(environment_id, locale_id, &candidate_path).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(Error::PageDuplicateSlug { source_slug: base.to_string() })
    }

    /// Reads the source page, derives a new slug (explicit candidate first,
    /// else disambiguated from the source slug), clones translations with
    /// regenerated paths per-locale, and creates the new record in `draft`
    /// status (§4.4). The duplicate references the same `content_id` as the
    /// source; decoupling content is a separate, explicit operation (§9
    /// design note).
    pub async fn duplicate(&self, source_id: PageId, req: DuplicatePageRequest) -> Result<Page> {
        let source = self.get(source_id).await?;
        self.environments.require_active(source.environment_id).await?;
        let source_translations = self.translations.list_by_page(source_id).await?;

        let base = match &req.slug {
            Some(candidate) => normalize_slug(candidate)?,
            None => source.slug.clone(),
        };
        let max_attempts = self.config.duplicate_slug_max_suffix;
        let environment_id = source.environment_id;
        let slug = self.disambiguate_page_slug(environment_id, &base, max_attempts).await?;

        let now = self.clock.now();
        let new_id = PageId::new();
        let mut new_translations = Vec::with_capacity(source_translations.len());
        for translation in &source_translations {
            let path_base = translation.path.trim_start_matches('/').to_string();
            let locale_id = translation.locale_id;
            let new_path = format!(
                "/{}",
                self.disambiguate_page_path(environment_id, locale_id, &path_base, max_attempts).await?
            );

            new_translations.push(PageTranslation {
                id: ferrocms_core::PageTranslationId::new(),
                page_id: new_id,
                locale_id,
                title: translation.title.clone(),
                path: new_path,
                summary: translation.summary.clone(),
                seo_title: translation.seo_title.clone(),
                seo_description: translation.seo_description.clone(),
                media_bindings: translation.media_bindings.clone(),
                created_at: now,
                updated_at: now,
            });
        }

        let page = Page {
            id: new_id,
            environment_id,
            content_id: source.content_id,
            template_id: source.template_id,
            parent_id: source.parent_id,
            slug,
            status: PageStatus::Draft,
            current_version: 1,
            published_version: None,
            publish_at: None,
            unpublish_at: None,
            published_at: None,
            primary_locale: source.primary_locale,
            metadata: source.metadata.clone(),
            created_by: req.created_by,
            updated_by: req.created_by,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        let page = self.pages.create(page).await?;

        for translation in &new_translations {
            self.translations.upsert(environment_id, translation.clone()).await?;
        }

        self.versions
            .create(PageVersion {
                id: ferrocms_core::PageVersionId::new(),
                page_id: new_id,
                version: 1,
                status: PageVersionStatus::Draft,
                snapshot: PageSnapshot {
                    regions: HashMap::new(),
                    widgets: HashMap::new(),
                    metadata: page.metadata.clone(),
                },
                created_by: req.created_by,
                created_at: now,
                published_at: None,
                published_by: None,
            })
            .await?;

        self.emit(ActivityVerb::Duplicate, &page).await;
        Ok(page)
    }

    /// Validates the publish/unpublish window, recomputes the resting
    /// status, and idempotently enqueues or cancels the scheduler jobs
    /// keyed `page.publish.<id>` / `page.unpublish.<id>`.
    pub async fn schedule(
        &self,
        page_id: PageId,
        publish_at: Option<chrono::DateTime<chrono::Utc>>,
        unpublish_at: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Page> {
        if !self.config.scheduling_enabled {
            return Err(Error::SchedulingDisabled);
        }
        let mut page = self.get(page_id).await?;
        self.environments.require_active(page.environment_id).await?;

        if let (Some(publish_at), Some(unpublish_at)) = (publish_at, unpublish_at) {
            if publish_at >= unpublish_at {
                return Err(Error::ScheduleWindowInvalid {
                    reason: "publish_at must be before unpublish_at".to_string(),
                });
            }
        }

        page.publish_at = publish_at;
        page.unpublish_at = unpublish_at;
        let now = self.clock.now();
        page.status = if publish_at.map(|at| at > now).unwrap_or(false) {
            PageStatus::Scheduled
        } else if page.published_version.is_some() && publish_at.map(|at| at <= now).unwrap_or(true) {
            PageStatus::Published
        } else {
            PageStatus::Draft
        };
        page.updated_at = now;
        let page = self.pages.update(page).await?;

        match publish_at {
            Some(run_at) => {
                self.scheduler
                    .enqueue(JobSpec::new(Job::key_for("page", page_id, "publish"), job_type::PAGE_PUBLISH, run_at))
                    .await?;
            }
            None => {
                self.scheduler
                    .cancel_by_key_best_effort(&Job::key_for("page", page_id, "publish"))
                    .await?;
            }
        }
        match unpublish_at {
            Some(run_at) => {
                self.scheduler
                    .enqueue(JobSpec::new(Job::key_for("page", page_id, "unpublish"), job_type::PAGE_UNPUBLISH, run_at))
                    .await?;
            }
            None => {
                self.scheduler
                    .cancel_by_key_best_effort(&Job::key_for("page", page_id, "unpublish"))
                    .await?;
            }
        }

        self.emit(ActivityVerb::Schedule, &page).await;
        Ok(page)
    }

    /// Appends a new draft version snapshotting the page's current region
    /// and widget layout. `base_version` guards against lost updates.
    pub async fn create_draft(&self, page_id: PageId, base_version: Option<i32>) -> Result<PageVersion> {
        if !self.config.versioning_enabled {
            return Err(Error::VersioningDisabled);
        }
        let mut page = self.get(page_id).await?;
        self.environments.require_active(page.environment_id).await?;

        if let Some(limit) = self.config.version_retention {
            let existing = self.versions.list_by_page(page_id).await?;
            if existing.len() as u32 >= limit {
                return Err(Error::VersionRetentionExceeded {
                    entity_type: "page".to_string(),
                    id: page_id.to_string(),
                });
            }
        }

        let next_version = page.current_version + 1;
        if let Some(base) = base_version {
            if base != page.current_version {
                return Err(Error::VersionConflict {
                    entity_type: "page".to_string(),
                    expected: page.current_version,
                    actual: base,
                });
            }
        }

        let current_snapshot = self.current_layout(&page).await?;
        let now = self.clock.now();
        let version = self
            .versions
            .create(PageVersion {
                id: ferrocms_core::PageVersionId::new(),
                page_id,
                version: next_version,
                status: PageVersionStatus::Draft,
                snapshot: current_snapshot,
                created_by: None,
                created_at: now,
                published_at: None,
                published_by: None,
            })
            .await?;

        page.current_version = next_version;
        if page.published_version.is_none() {
            page.status = PageStatus::Draft;
        }
        page.updated_at = now;
        self.pages.update(page).await?;

        Ok(version)
    }

    /// Collects the page's current live layout: block instances grouped by
    /// region (page-scoped plus global, restricted to the template's
    /// declared regions) and the template's metadata, to seed a fresh
    /// draft snapshot.
    async fn current_layout(&self, page: &Page) -> Result<PageSnapshot> {
        let template = self
            .template_for(page.template_id)
            .await?
            .ok_or_else(|| Error::TemplateUnknown { id: page.template_id.to_string() })?;

        let mut regions: HashMap<String, Vec<ferrocms_blocks::BlockInstance>> = HashMap::new();
        let page_blocks = self.blocks.list_by_page(page.id).await?;
        let global_blocks = self.blocks.list_global(page.environment_id).await?;
        for region in &template.regions {
            let mut instances: Vec<ferrocms_blocks::BlockInstance> = page_blocks
                .iter()
                .filter(|b| b.region == region.name)
                .cloned()
                .chain(global_blocks.iter().filter(|b| b.region == region.name).cloned())
                .collect();
            instances.sort_by_key(|b| b.position);
            if !instances.is_empty() {
                regions.insert(region.name.clone(), instances);
            }
        }

        Ok(PageSnapshot {
            regions,
            widgets: HashMap::new(),
            metadata: page.metadata.clone(),
        })
    }

    /// Validates the draft snapshot structurally - every region key must
    /// name a region the template declares, and widgets may only populate
    /// areas the template marks `accepts_widgets` - archives the
    /// previously-published version, and flips the record to `published`.
    pub async fn publish_draft(&self, page_id: PageId, version: i32) -> Result<PageVersion> {
        let mut draft = self
            .versions
            .get(page_id, version)
            .await?
            .ok_or_else(|| Error::not_found("page_version", version.to_string()))?;
        if draft.status == PageVersionStatus::Published {
            return Err(Error::VersionAlreadyPublished {
                entity_type: "page".to_string(),
                version,
            });
        }

        let mut page = self.get(page_id).await?;
        self.environments.require_active(page.environment_id).await?;
        self.hooks.do_action(hooks::PRE_PAGE_PUBLISH, Arc::new(page.clone())).await;
        let template = self
            .template_for(page.template_id)
            .await?
            .ok_or_else(|| Error::TemplateUnknown { id: page.template_id.to_string() })?;
        self.validate_snapshot_against_template(&draft.snapshot, &template)?;

        if let Some(published_version) = page.published_version {
            if let Some(mut previous) = self.versions.get(page_id, published_version).await? {
                previous.status = PageVersionStatus::Archived;
                self.versions.update(previous).await?;
            }
        }

        let now = self.clock.now();
        draft.status = PageVersionStatus::Published;
        draft.published_at = Some(now);
        let draft = self.versions.update(draft).await?;

        page.published_version = Some(version);
        page.published_at = Some(now);
        page.status = PageStatus::Published;
        page.updated_at = now;
        let page = self.pages.update(page).await?;

        tracing::debug!(%page_id, version, "published page version");
        self.emit(ActivityVerb::Publish, &page).await;
        self.hooks.do_action(hooks::PAGE_PUBLISHED, Arc::new(page.clone())).await;
        Ok(draft)
    }

    fn validate_snapshot_against_template(&self, snapshot: &PageSnapshot, template: &Template) -> Result<()> {
        let mut errors = ValidationErrors::new();
        let region_names: HashSet<&str> = template.regions.iter().map(|r| r.name.as_str()).collect();
        for region in snapshot.regions.keys() {
            if !region_names.contains(region.as_str()) {
                errors.add("regions", format!("region {region:?} is not declared by the page's template"));
            }
        }
        for (area, placements) in &snapshot.widgets {
            let accepts = template.region(area).map(|r| r.accepts_widgets).unwrap_or(false);
            if !accepts && !placements.is_empty() {
                errors.add("widgets", format!("area {area:?} does not accept widgets"));
            }
        }
        errors.into_result(())
    }

    /// Returns a preview of the draft snapshot without persisting anything.
    pub async fn preview_draft(&self, page_id: PageId, version: i32) -> Result<PageSnapshot> {
        let draft = self
            .versions
            .get(page_id, version)
            .await?
            .ok_or_else(|| Error::not_found("page_version", version.to_string()))?;
        let page = self.get(page_id).await?;
        let template = self
            .template_for(page.template_id)
            .await?
            .ok_or_else(|| Error::TemplateUnknown { id: page.template_id.to_string() })?;
        self.validate_snapshot_against_template(&draft.snapshot, &template)?;
        Ok(draft.snapshot)
    }

    pub async fn list_versions(&self, page_id: PageId) -> Result<Vec<PageVersion>> {
        self.versions.list_by_page(page_id).await
    }

    /// Restoration never mutates the source version: it creates a fresh
    /// draft seeded from the prior snapshot.
    pub async fn restore_version(&self, page_id: PageId, version: i32) -> Result<PageVersion> {
        let source = self
            .versions
            .get(page_id, version)
            .await?
            .ok_or_else(|| Error::not_found("page_version", version.to_string()))?;

        let mut page = self.get(page_id).await?;
        self.environments.require_active(page.environment_id).await?;
        page.metadata = source.snapshot.metadata.clone();
        self.pages.update(page).await?;

        if !self.config.versioning_enabled {
            return Err(Error::VersioningDisabled);
        }
        self.create_draft(page_id, None).await
    }

    /// The read-time enrichment pipeline (§4.4): merges region/global block
    /// instances scoped to the template's declared regions, resolves
    /// widgets for areas marked `accepts_widgets`, and computes
    /// `effective_status`/`is_visible` with the injected clock.
    pub async fn get_enriched(&self, page_id: PageId) -> Result<EnrichedPage> {
        let page = self.get(page_id).await?;
        let template = self
            .template_for(page.template_id)
            .await?
            .ok_or_else(|| Error::TemplateUnknown { id: page.template_id.to_string() })?;

        let layout = self.current_layout(&page).await?;

        let version_for_widgets = page
            .published_version
            .or(Some(page.current_version));
        let widget_placements = match version_for_widgets {
            Some(v) => self.versions.get(page_id, v).await?.map(|pv| pv.snapshot.widgets).unwrap_or_default(),
            None => HashMap::new(),
        };

        let mut widgets = HashMap::new();
        for region in &template.regions {
            if !region.accepts_widgets {
                continue;
            }
            if let Some(placements) = widget_placements.get(&region.name) {
                let resolved = self.widget_service.resolve(page.environment_id, placements).await?;
                if !resolved.is_empty() {
                    widgets.insert(region.name.clone(), resolved);
                }
            }
        }

        let now = self.clock.now();
        let effective_status = page.effective_status(now);
        let is_visible = page.is_visible(now);

        Ok(EnrichedPage {
            page,
            template,
            regions: layout.regions,
            widgets,
            effective_status,
            is_visible,
        })
    }

    /// Resolves every media binding on a translation through the media
    /// service (optional; no-op when absent per §3.1).
    pub async fn resolve_media(&self, environment_id: EnvironmentId, translation: &PageTranslation) -> Result<Vec<MediaAsset>> {
        let mut resolved = Vec::with_capacity(translation.media_bindings.len());
        for binding in &translation.media_bindings {
            resolved.push(self.media_service.resolve(environment_id, binding).await?);
        }
        Ok(resolved)
    }

    async fn emit(&self, verb: ActivityVerb, page: &Page) {
        self.activity
            .emit(
                Activity::new(verb, ObjectType::Page, *page.id.as_uuid())
                    .with_channel("page")
                    .with_metadata("env_id", page.environment_id.to_string())
                    .with_metadata("slug", page.slug.clone())
                    .with_metadata("status", format!("{:?}", page.status).to_lowercase()),
            )
            .await;
    }
}

#[async_trait]
impl Service for PageService {
    fn name(&self) -> &str {
        "page-service"
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryPageRepository, InMemoryPageTranslationRepository, InMemoryPageVersionRepository,
        InMemoryTemplateRepository,
    };
    use crate::entities::Region;
    use ferrocms_blocks::{
        InMemoryBlockDefinitionRepository, InMemoryBlockInstanceRepository,
        InMemoryBlockTranslationRepository, InMemoryBlockVersionRepository,
    };
    use ferrocms_content::{ContentService, ContentTypeService};
    use ferrocms_content::memory::{
        InMemoryContentRepository, InMemoryContentTranslationRepository, InMemoryContentTypeRepository,
        InMemoryContentVersionRepository,
    };
    use ferrocms_core::{HookRegistry, SystemClock};
    use ferrocms_directory::memory::{InMemoryEnvironmentRepository, InMemoryLocaleRepository};
    use ferrocms_schema::{Migrator, SchemaRegistry};
    use ferrocms_scheduler::InMemorySchedulerJobRepository;
    use serde_json::json;

    struct Harness {
        pages: PageService,
        environment_id: EnvironmentId,
        template_id: TemplateId,
        content_id: ferrocms_core::ContentId,
    }

    async fn harness() -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let schema_registry = Arc::new(SchemaRegistry::new());
        let migrator = Arc::new(Migrator::new());
        let activity = Arc::new(ActivityEmitter::new());
        let hooks = Arc::new(HookRegistry::new());
        let config = EngineConfig::default();

        let environment_repo = Arc::new(InMemoryEnvironmentRepository::new());
        let environments = Arc::new(EnvironmentService::new(environment_repo, clock.clone()));
        let environment_id = environments.create("default", "Default", true).await.unwrap().id;

        let locale_repo = Arc::new(InMemoryLocaleRepository::new());
        let locales = Arc::new(LocaleService::new(locale_repo, clock.clone()));
        locales.create("en", "English", true).await.unwrap();

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
        let article_schema = json!({ "type": "object", "properties": {} });
        let content_type = content_types
            .create(environment_id, Some("article"), "Article", article_schema, json!({}))
            .await
            .unwrap();

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
        let blocks_bridge = Arc::new(ferrocms_blocks::EmbeddedBlocksBridge::new(block_service.clone()));

        let scheduler = Arc::new(SchedulerService::new(
            Arc::new(InMemorySchedulerJobRepository::new()),
            clock.clone(),
        ));

        let content_repo = Arc::new(InMemoryContentRepository::new());
        let content_service = ContentService::new(
            content_type_repo,
            content_repo.clone(),
            Arc::new(InMemoryContentTranslationRepository::new()),
            Arc::new(InMemoryContentVersionRepository::new()),
            environments.clone(),
            locales.clone(),
            migrator,
            scheduler.clone(),
            blocks_bridge,
            activity.clone(),
            hooks.clone(),
            clock.clone(),
            config.clone(),
        );
        let content = content_service
            .create(
                environment_id,
                ferrocms_content::CreateContentRequest {
                    slug: "hello".to_string(),
                    content_type_id: content_type.id,
                    translations: vec![ferrocms_content::NewContentTranslation {
                        locale_code: "en".to_string(),
                        title: "Hi".to_string(),
                        summary: None,
                        content: json!({}),
                    }],
                    primary_locale_code: Some("en".to_string()),
                    metadata: json!({}),
                    allow_missing_translations: None,
                    created_by: None,
                },
            )
            .await
            .unwrap();

        let templates = Arc::new(InMemoryTemplateRepository::new());
        let template = templates
            .create(Template {
                id: TemplateId::new(),
                environment_id,
                slug: "default".to_string(),
                name: "Default".to_string(),
                regions: vec![
                    Region { name: "main".to_string(), accepts_widgets: false },
                    Region { name: "sidebar".to_string(), accepts_widgets: true },
                ],
                deleted_at: None,
                created_at: clock.now(),
                updated_at: clock.now(),
            })
            .await
            .unwrap();

        let pages = PageService::new(
            templates,
            Arc::new(InMemoryPageRepository::new()),
            Arc::new(InMemoryPageTranslationRepository::new()),
            Arc::new(InMemoryPageVersionRepository::new()),
            content_repo,
            locales,
            environments,
            block_service,
            scheduler,
            activity,
            hooks,
            clock,
            config,
        );

        Harness {
            pages,
            environment_id,
            template_id: template.id,
            content_id: content.id,
        }
    }

    fn create_req(h: &Harness, slug: &str, path: &str) -> CreatePageRequest {
        CreatePageRequest {
            slug: slug.to_string(),
            content_id: h.content_id,
            template_id: h.template_id,
            parent_id: None,
            translations: vec![NewPageTranslation {
                locale_code: "en".to_string(),
                title: "Home".to_string(),
                path: path.to_string(),
                summary: None,
                seo_title: None,
                seo_description: None,
                media_bindings: Vec::new(),
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
        let page = h.pages.create(h.environment_id, create_req(&h, "home", "/home")).await.unwrap();
        assert_eq!(page.status, PageStatus::Draft);

        let draft = h.pages.create_draft(page.id, None).await.unwrap();
        assert_eq!(draft.version, 2);

        let published = h.pages.publish_draft(page.id, 2).await.unwrap();
        assert_eq!(published.status, PageVersionStatus::Published);

        let page = h.pages.get(page.id).await.unwrap();
        assert_eq!(page.published_version, Some(2));
        assert_eq!(page.status, PageStatus::Published);
    }

    #[tokio::test]
    async fn duplicate_path_within_env_and_locale_is_rejected() {
        let h = harness().await;
        h.pages.create(h.environment_id, create_req(&h, "home", "/home")).await.unwrap();
        let err = h
            .pages
            .create(h.environment_id, create_req(&h, "home-2", "/home"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PathExists { .. }));
    }

    #[tokio::test]
    async fn moving_a_page_under_its_own_descendant_is_a_cycle() {
        let h = harness().await;
        let a = h.pages.create(h.environment_id, create_req(&h, "a", "/a")).await.unwrap();
        let mut b_req = create_req(&h, "b", "/b");
        b_req.parent_id = Some(a.id);
        let b = h.pages.create(h.environment_id, b_req).await.unwrap();
        let mut c_req = create_req(&h, "c", "/c");
        c_req.parent_id = Some(b.id);
        let c = h.pages.create(h.environment_id, c_req).await.unwrap();

        let err = h
            .pages
            .move_page(a.id, MovePageRequest { new_parent_id: Some(c.id) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ParentCycle { .. }));

        let a_reloaded = h.pages.get(a.id).await.unwrap();
        assert_eq!(a_reloaded.parent_id, None);
    }

    #[tokio::test]
    async fn duplicate_disambiguates_slug_and_path() {
        let h = harness().await;
        h.pages.create(h.environment_id, create_req(&h, "about", "/about")).await.unwrap();
        let mut taken = create_req(&h, "about-1", "/about-1");
        taken.translations[0].locale_code = "en".to_string();
        h.pages.create(h.environment_id, taken).await.unwrap();

        let source = h.pages.create(h.environment_id, create_req(&h, "about-source", "/about-source")).await.unwrap();
        // force the duplicate to target the already-taken "about" base slug
        let duplicate = h
            .pages
            .duplicate(source.id, DuplicatePageRequest { slug: Some("about".to_string()), created_by: None })
            .await
            .unwrap();
        assert_eq!(duplicate.slug, "about-2");
    }

    #[tokio::test]
    async fn hard_delete_is_required() {
        let h = harness().await;
        let page = h.pages.create(h.environment_id, create_req(&h, "home", "/home")).await.unwrap();
        let err = h.pages.delete(page.id, false).await.unwrap_err();
        assert!(matches!(err, Error::PageSoftDeleteUnsupported));
        h.pages.delete(page.id, true).await.unwrap();
    }

    #[tokio::test]
    async fn enrichment_reports_effective_status_and_visibility() {
        let h = harness().await;
        let page = h.pages.create(h.environment_id, create_req(&h, "home", "/home")).await.unwrap();
        let enriched = h.pages.get_enriched(page.id).await.unwrap();
        assert_eq!(enriched.effective_status, PageStatus::Draft);
        assert!(!enriched.is_visible);
    }
}
