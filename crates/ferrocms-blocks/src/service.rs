//! Block definition registration, instance CRUD, translations, and the
//! draft/published/archived version lifecycle (§4.5).

use std::sync::Arc;

use async_trait::async_trait;
use ferrocms_core::{
    hook::hooks, slug::normalize_slug, BlockDefinitionId, BlockInstanceId, Clock, EngineConfig,
    EnvironmentId, Error, HookRegistry, LocaleId, PageId, Result, Service, ServiceHealth,
};
use ferrocms_directory::EnvironmentService;
use ferrocms_schema::{validate_partial_payload, validate_payload, validate_schema, Migrator, SchemaRegistry};
use semver::Version;
use serde_json::Value;

use crate::entities::{
    BlockDefinition, BlockInstance, BlockSnapshot, BlockStatus, BlockTranslation, BlockVersion,
    MediaBinding,
};
use crate::repository::{
    BlockDefinitionRepository, BlockInstanceRepository, BlockTranslationRepository,
    BlockVersionRepository,
};

pub struct BlockService {
    definitions: Arc<dyn BlockDefinitionRepository>,
    instances: Arc<dyn BlockInstanceRepository>,
    translations: Arc<dyn BlockTranslationRepository>,
    versions: Arc<dyn BlockVersionRepository>,
    environments: Arc<EnvironmentService>,
    schema_registry: Arc<SchemaRegistry<Value>>,
    migrator: Arc<Migrator>,
    hooks: Arc<HookRegistry>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl BlockService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        definitions: Arc<dyn BlockDefinitionRepository>,
        instances: Arc<dyn BlockInstanceRepository>,
        translations: Arc<dyn BlockTranslationRepository>,
        versions: Arc<dyn BlockVersionRepository>,
        environments: Arc<EnvironmentService>,
        schema_registry: Arc<SchemaRegistry<Value>>,
        migrator: Arc<Migrator>,
        hooks: Arc<HookRegistry>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            definitions,
            instances,
            translations,
            versions,
            environments,
            schema_registry,
            migrator,
            hooks,
            clock,
            config,
        }
    }

    /// Registers a new definition, or a new schema version of an existing
    /// one: `slug` is normalized, `schema` is self-validated and stamped
    /// with its `schema_version`, and the definition row's pointer advances
    /// to the highest registered version (§4.5).
    pub async fn register_definition(
        &self,
        environment_id: EnvironmentId,
        slug: &str,
        name: &str,
        mut schema: Value,
        defaults: Value,
    ) -> Result<BlockDefinition> {
        self.environments.require_active(environment_id).await?;
        let slug = normalize_slug(slug)?;
        validate_schema(&schema)?;

        let version = self.schema_registry.register(&slug, &mut schema, schema.clone())?;
        let now = self.clock.now();

        let definition = match self.definitions.find_by_slug(environment_id, &slug).await? {
            Some(mut existing) => {
                existing.name = name.to_string();
                existing.schema = schema;
                existing.schema_version = version.to_string();
                existing.defaults = defaults;
                existing.updated_at = now;
                self.definitions.update(existing).await?
            }
            None => {
                self.definitions
                    .create(BlockDefinition {
                        id: BlockDefinitionId::new(),
                        environment_id,
                        slug,
                        name: name.to_string(),
                        schema,
                        schema_version: version.to_string(),
                        defaults,
                        deleted_at: None,
                        created_at: now,
                        updated_at: now,
                    })
                    .await?
            }
        };

        Ok(definition)
    }

    /// Registers a single migration step from one schema version to another
    /// for `slug`, exposed to the content/page engines through the shared
    /// migrator instance.
    pub fn register_migration(
        &self,
        slug: impl Into<String>,
        from: Version,
        to: Version,
        apply: ferrocms_schema::MigrationFn,
    ) {
        self.migrator.register(slug, from, to, apply);
    }

    pub async fn get_definition(&self, id: BlockDefinitionId) -> Result<BlockDefinition> {
        self.definitions
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Error::not_found("block_definition", id.to_string()))
    }

    pub async fn get_definition_by_slug(
        &self,
        environment_id: EnvironmentId,
        slug: &str,
    ) -> Result<BlockDefinition> {
        self.definitions
            .find_by_slug(environment_id, slug)
            .await?
            .ok_or_else(|| Error::not_found("block_definition", slug.to_string()))
    }

    /// Creates a block instance in `draft` status with an initial
    /// version-1 snapshot. `configuration` is validated against the
    /// definition's current schema in draft (partial) mode.
    pub async fn create_instance(
        &self,
        environment_id: EnvironmentId,
        definition_id: BlockDefinitionId,
        page_id: Option<PageId>,
        region: impl Into<String>,
        position: i32,
        configuration: Value,
    ) -> Result<BlockInstance> {
        self.environments.require_active(environment_id).await?;
        let definition = self.get_definition(definition_id).await?;
        validate_partial_payload(&definition.schema, &configuration)?;

        let now = self.clock.now();
        let instance = BlockInstance {
            id: BlockInstanceId::new(),
            environment_id,
            definition_id,
            page_id,
            region: region.into(),
            position,
            configuration: configuration.clone(),
            status: BlockStatus::Draft,
            current_version: 1,
            published_version: None,
            mirror_key: None,
            created_at: now,
            updated_at: now,
        };
        let instance = self.instances.create(instance).await?;

        self.versions
            .create(BlockVersion {
                id: ferrocms_core::BlockVersionId::new(),
                block_instance_id: instance.id,
                version: 1,
                status: BlockStatus::Draft,
                snapshot: BlockSnapshot {
                    configuration,
                    translations: Vec::new(),
                },
                created_by: None,
                created_at: now,
                published_at: None,
                published_by: None,
            })
            .await?;

        self.hooks.do_action(hooks::BLOCK_INSTANCE_SAVED, Arc::new(instance.clone())).await;
        Ok(instance)
    }

    pub async fn get_instance(&self, id: BlockInstanceId) -> Result<BlockInstance> {
        self.instances
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Error::not_found("block_instance", id.to_string()))
    }

    pub async fn delete_instance(&self, id: BlockInstanceId) -> Result<()> {
        let instance = self.get_instance(id).await?;
        self.environments.require_active(instance.environment_id).await?;
        self.instances.delete(&id).await
    }

    pub async fn list_by_page(&self, page_id: PageId) -> Result<Vec<BlockInstance>> {
        self.instances.list_by_page(page_id).await
    }

    pub async fn list_global(&self, environment_id: EnvironmentId) -> Result<Vec<BlockInstance>> {
        self.instances.list_global(environment_id).await
    }

    /// Creates or replaces the translation for `(instance, locale)`.
    /// `TranslationsDisabled` unless the engine config enables them.
    pub async fn upsert_translation(
        &self,
        block_instance_id: BlockInstanceId,
        locale_id: LocaleId,
        content: Value,
        attribute_overrides: Option<Value>,
        media_bindings: Vec<MediaBinding>,
    ) -> Result<BlockTranslation> {
        if !self.config.translations_enabled {
            return Err(Error::TranslationsDisabled);
        }
        let instance = self.get_instance(block_instance_id).await?;
        self.environments.require_active(instance.environment_id).await?;
        for binding in &media_bindings {
            if !binding.is_populated() && (binding.id.is_some() || binding.path.is_some()) {
                return Err(Error::MediaReferenceRequired);
            }
        }

        let now = self.clock.now();
        let existing = self.translations.find(block_instance_id, locale_id).await?;
        let translation = BlockTranslation {
            id: existing
                .as_ref()
                .map(|t| t.id)
                .unwrap_or_else(ferrocms_core::BlockTranslationId::new),
            block_instance_id,
            locale_id,
            content,
            attribute_overrides,
            media_bindings,
            created_at: existing.map(|t| t.created_at).unwrap_or(now),
            updated_at: now,
        };
        let translation = self.translations.upsert(translation).await?;
        self.hooks.do_action(hooks::BLOCK_INSTANCE_SAVED, Arc::new(instance)).await;
        Ok(translation)
    }

    /// Rejects deleting the last remaining translation when the engine
    /// requires at least one (mirrors content's `DeleteTranslation` rule).
    pub async fn delete_translation(
        &self,
        block_instance_id: BlockInstanceId,
        locale_id: LocaleId,
    ) -> Result<()> {
        let instance = self.get_instance(block_instance_id).await?;
        self.environments.require_active(instance.environment_id).await?;
        if self.config.require_translations {
            let remaining = self.translations.list_by_instance(block_instance_id).await?;
            if remaining.len() <= 1 {
                return Err(Error::Validation({
                    let mut errors = ferrocms_core::ValidationErrors::new();
                    errors.add("locale_id", "cannot delete the only remaining translation");
                    errors
                }));
            }
        }
        self.translations.delete(block_instance_id, locale_id).await
    }

    pub async fn list_translations(&self, block_instance_id: BlockInstanceId) -> Result<Vec<BlockTranslation>> {
        self.translations.list_by_instance(block_instance_id).await
    }

    /// Appends a new draft version snapshotting the instance's current
    /// configuration and translations. `base_version` is an optimistic
    /// concurrency guard matching the content/page draft contract.
    pub async fn create_draft(
        &self,
        block_instance_id: BlockInstanceId,
        base_version: Option<i32>,
    ) -> Result<BlockVersion> {
        let mut instance = self.get_instance(block_instance_id).await?;
        self.environments.require_active(instance.environment_id).await?;

        if let Some(limit) = self.config.version_retention {
            let existing = self.versions.list_by_instance(block_instance_id).await?;
            if existing.len() as u32 >= limit {
                return Err(Error::VersionRetentionExceeded {
                    entity_type: "block_instance".to_string(),
                    id: block_instance_id.to_string(),
                });
            }
        }

        let next_version = instance.current_version + 1;
        if let Some(base) = base_version {
            if base != instance.current_version {
                return Err(Error::VersionConflict {
                    entity_type: "block_instance".to_string(),
                    expected: instance.current_version,
                    actual: base,
                });
            }
        }

        let translations = self.translations.list_by_instance(block_instance_id).await?;
        let now = self.clock.now();
        let version = self
            .versions
            .create(BlockVersion {
                id: ferrocms_core::BlockVersionId::new(),
                block_instance_id,
                version: next_version,
                status: BlockStatus::Draft,
                snapshot: BlockSnapshot {
                    configuration: instance.configuration.clone(),
                    translations,
                },
                created_by: None,
                created_at: now,
                published_at: None,
                published_by: None,
            })
            .await?;

        instance.current_version = next_version;
        instance.updated_at = now;
        self.instances.update(instance).await?;

        Ok(version)
    }

    /// Migrates the draft's snapshot to the definition's current schema
    /// version, validates it strictly, archives any previously-published
    /// version, and flips the instance to `published`.
    pub async fn publish(&self, block_instance_id: BlockInstanceId, version: i32) -> Result<BlockVersion> {
        let mut draft = self
            .versions
            .get(block_instance_id, version)
            .await?
            .ok_or_else(|| Error::not_found("block_version", version.to_string()))?;

        if draft.status == BlockStatus::Published {
            return Err(Error::VersionAlreadyPublished {
                entity_type: "block_instance".to_string(),
                version,
            });
        }

        let mut instance = self.get_instance(block_instance_id).await?;
        self.environments.require_active(instance.environment_id).await?;
        let definition = self.get_definition(instance.definition_id).await?;
        let current_version: Version = definition
            .schema_version
            .parse::<ferrocms_schema::SchemaVersion>()
            .map(|v| v.version)
            .unwrap_or_else(|_| Version::new(1, 0, 0));

        validate_payload(&definition.schema, &draft.snapshot.configuration)?;

        if let Some(published_version) = instance.published_version {
            if let Some(mut previous) = self.versions.get(block_instance_id, published_version).await? {
                previous.status = BlockStatus::Archived;
                self.versions.update(previous).await?;
            }
        }

        let now = self.clock.now();
        draft.status = BlockStatus::Published;
        draft.published_at = Some(now);
        let draft = self.versions.update(draft).await?;

        instance.status = BlockStatus::Published;
        instance.published_version = Some(version);
        instance.updated_at = now;
        self.instances.update(instance).await?;

        tracing::debug!(%block_instance_id, version, schema_version = %current_version, "published block version");
        Ok(draft)
    }

    pub async fn list_versions(&self, block_instance_id: BlockInstanceId) -> Result<Vec<BlockVersion>> {
        self.versions.list_by_instance(block_instance_id).await
    }

    // --- Embedded-blocks bridge support (§4.3) --------------------------

    pub async fn find_instance_by_mirror_key(&self, mirror_key: &str) -> Result<Option<BlockInstance>> {
        self.instances.find_by_mirror_key(mirror_key).await
    }

    pub async fn list_instances_by_mirror_prefix(&self, owner_prefix: &str) -> Result<Vec<BlockInstance>> {
        self.instances.list_by_mirror_prefix(owner_prefix).await
    }

    /// Creates or updates the mirror instance for one embedded block entry.
    pub async fn sync_mirror(
        &self,
        environment_id: EnvironmentId,
        definition_slug: &str,
        mirror_key: &str,
        configuration: Value,
        mode: ferrocms_schema::ValidationMode,
    ) -> Result<BlockInstance> {
        self.environments.require_active(environment_id).await?;
        let definition = self.get_definition_by_slug(environment_id, definition_slug).await?;
        match mode {
            ferrocms_schema::ValidationMode::Strict => validate_payload(&definition.schema, &configuration)?,
            ferrocms_schema::ValidationMode::Partial => {
                validate_partial_payload(&definition.schema, &configuration)?
            }
        }

        let now = self.clock.now();
        match self.instances.find_by_mirror_key(mirror_key).await? {
            Some(mut existing) => {
                existing.configuration = configuration;
                existing.updated_at = now;
                self.instances.update(existing).await
            }
            None => {
                self.instances
                    .create(BlockInstance {
                        id: BlockInstanceId::new(),
                        environment_id,
                        definition_id: definition.id,
                        page_id: None,
                        region: String::new(),
                        position: 0,
                        configuration,
                        status: BlockStatus::Draft,
                        current_version: 1,
                        published_version: None,
                        mirror_key: Some(mirror_key.to_string()),
                        created_at: now,
                        updated_at: now,
                    })
                    .await
            }
        }
    }

    pub async fn delete_mirror(&self, mirror_key: &str) -> Result<()> {
        if let Some(existing) = self.instances.find_by_mirror_key(mirror_key).await? {
            self.environments.require_active(existing.environment_id).await?;
            self.instances.delete(&existing.id).await?;
        }
        Ok(())
    }

    pub async fn migrate_payload(
        &self,
        slug: &str,
        from: &semver::Version,
        to: &semver::Version,
        payload: Value,
    ) -> Result<Value> {
        self.hooks.do_action(hooks::PRE_BLOCK_SCHEMA_MIGRATE, Arc::new(slug.to_string())).await;
        self.migrator.migrate(slug, from, to, payload)
    }
}

#[async_trait]
impl Service for BlockService {
    fn name(&self) -> &str {
        "block-service"
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryBlockDefinitionRepository, InMemoryBlockInstanceRepository,
        InMemoryBlockTranslationRepository, InMemoryBlockVersionRepository,
    };
    use ferrocms_core::{HookRegistry, SystemClock};
    use ferrocms_directory::memory::InMemoryEnvironmentRepository;
    use serde_json::json;

    fn service() -> (BlockService, Arc<EnvironmentService>) {
        let environments = Arc::new(EnvironmentService::new(
            Arc::new(InMemoryEnvironmentRepository::new()),
            Arc::new(SystemClock),
        ));
        let svc = BlockService::new(
            Arc::new(InMemoryBlockDefinitionRepository::new()),
            Arc::new(InMemoryBlockInstanceRepository::new()),
            Arc::new(InMemoryBlockTranslationRepository::new()),
            Arc::new(InMemoryBlockVersionRepository::new()),
            environments.clone(),
            Arc::new(SchemaRegistry::new()),
            Arc::new(Migrator::new()),
            Arc::new(HookRegistry::new()),
            Arc::new(SystemClock),
            EngineConfig::default(),
        );
        (svc, environments)
    }

    fn hero_schema() -> Value {
        json!({
            "type": "object",
            "required": ["headline"],
            "properties": { "headline": { "type": "string" } },
        })
    }

    #[tokio::test]
    async fn registering_the_same_slug_twice_bumps_the_tracked_version() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        svc.register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();

        let mut v2 = hero_schema();
        v2["metadata"] = json!({ "schema_version": "hero@v2.0.0" });
        let updated = svc
            .register_definition(env, "Hero", "Hero", v2, json!({}))
            .await
            .unwrap();

        assert_eq!(updated.schema_version, "hero@v2.0.0");
        assert_eq!(svc.get_definition_by_slug(env, "hero").await.unwrap().id, updated.id);
    }

    #[tokio::test]
    async fn create_instance_validates_configuration_in_partial_mode() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let definition = svc
            .register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();

        let instance = svc
            .create_instance(env, definition.id, None, "main", 0, json!({}))
            .await
            .unwrap();
        assert_eq!(instance.status, BlockStatus::Draft);
        assert_eq!(instance.current_version, 1);
    }

    #[tokio::test]
    async fn publish_rejects_a_payload_missing_required_fields() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let definition = svc
            .register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();
        let instance = svc
            .create_instance(env, definition.id, None, "main", 0, json!({}))
            .await
            .unwrap();

        let err = svc.publish(instance.id, 1).await.unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid { .. }));
    }

    #[tokio::test]
    async fn publish_archives_the_previously_published_version() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let definition = svc
            .register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();
        let instance = svc
            .create_instance(
                env,
                definition.id,
                None,
                "main",
                0,
                json!({ "headline": "Hi" }),
            )
            .await
            .unwrap();

        svc.publish(instance.id, 1).await.unwrap();
        svc.create_draft(instance.id, Some(1)).await.unwrap();

        // second draft (v2) has the same snapshot, so it satisfies the
        // schema too.
        svc.publish(instance.id, 2).await.unwrap();

        let v1 = svc.list_versions(instance.id).await.unwrap();
        let archived = v1.iter().find(|v| v.version == 1).unwrap();
        assert_eq!(archived.status, BlockStatus::Archived);

        let refreshed = svc.get_instance(instance.id).await.unwrap();
        assert_eq!(refreshed.published_version, Some(2));
    }

    #[tokio::test]
    async fn publishing_an_already_published_version_is_rejected() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let definition = svc
            .register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();
        let instance = svc
            .create_instance(
                env,
                definition.id,
                None,
                "main",
                0,
                json!({ "headline": "Hi" }),
            )
            .await
            .unwrap();

        svc.publish(instance.id, 1).await.unwrap();
        let err = svc.publish(instance.id, 1).await.unwrap_err();
        assert!(matches!(err, Error::VersionAlreadyPublished { .. }));
    }

    #[tokio::test]
    async fn translations_are_rejected_when_the_feature_is_disabled() {
        let mut config = EngineConfig::default();
        config.translations_enabled = false;
        let environments = Arc::new(EnvironmentService::new(
            Arc::new(InMemoryEnvironmentRepository::new()),
            Arc::new(SystemClock),
        ));
        let svc = BlockService::new(
            Arc::new(InMemoryBlockDefinitionRepository::new()),
            Arc::new(InMemoryBlockInstanceRepository::new()),
            Arc::new(InMemoryBlockTranslationRepository::new()),
            Arc::new(InMemoryBlockVersionRepository::new()),
            environments,
            Arc::new(SchemaRegistry::new()),
            Arc::new(Migrator::new()),
            Arc::new(HookRegistry::new()),
            Arc::new(SystemClock),
            config,
        );

        let err = svc
            .upsert_translation(BlockInstanceId::new(), LocaleId::new(), json!({}), None, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TranslationsDisabled));
    }
}
