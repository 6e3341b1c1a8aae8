//! Content schema registration and lifecycle (§4.2).

use std::sync::Arc;

use async_trait::async_trait;
use ferrocms_core::{
    slug::normalize_slug, Clock, ContentTypeId, EngineConfig, EnvironmentId, Error, ListParams,
    ListResult, Result, Service, ServiceHealth,
};
use ferrocms_directory::EnvironmentService;
use ferrocms_events::{Activity, ActivityEmitter, ActivityVerb, ObjectType};
use ferrocms_schema::{validate_schema, Migrator, SchemaRegistry, SchemaVersion};
use semver::Version;
use serde_json::Value;

use crate::entities::{ContentType, ContentTypeSchemaSnapshot, ContentTypeStatus};
use crate::repository::ContentTypeRepository;

/// Classification of a schema change, driving the semver bump a content
/// type's `Update` applies (§4.2: "patch for ui-only, minor for
/// backward-compatible additions, major for breaking").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaChange {
    None,
    Patch,
    Minor,
    Major,
}

/// Compares two JSON-Schema-like documents' `properties`/`required` sets
/// and classifies the change. A removed property or a type change on a
/// retained property is breaking; a newly-required field is breaking; a
/// new optional property, or relaxing a required field to optional, is
/// additive; anything else (ui-only fields such as `ui_schema` content,
/// titles, descriptions) is a patch.
pub fn classify_schema_change(old: &Value, new: &Value) -> SchemaChange {
    let old_props = old.get("properties").and_then(|p| p.as_object());
    let new_props = new.get("properties").and_then(|p| p.as_object());
    let (old_props, new_props) = match (old_props, new_props) {
        (Some(o), Some(n)) => (o, n),
        _ => return SchemaChange::Patch,
    };

    let old_required: std::collections::HashSet<&str> = old
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();
    let new_required: std::collections::HashSet<&str> = new
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    for key in old_props.keys() {
        if !new_props.contains_key(key) {
            return SchemaChange::Major;
        }
        let old_type = old_props[key].get("type");
        let new_type = new_props.get(key).and_then(|p| p.get("type"));
        if old_type != new_type {
            return SchemaChange::Major;
        }
    }
    for field in &new_required {
        if !old_required.contains(field) {
            return SchemaChange::Major;
        }
    }

    let mut change = SchemaChange::Patch;
    if new_props.len() > old_props.len() {
        change = SchemaChange::Minor;
    }
    for field in &old_required {
        if !new_required.contains(field) {
            change = SchemaChange::Minor;
        }
    }
    change
}

fn bump(version: &Version, change: SchemaChange) -> Version {
    match change {
        SchemaChange::None | SchemaChange::Patch => {
            Version::new(version.major, version.minor, version.patch + 1)
        }
        SchemaChange::Minor => Version::new(version.major, version.minor + 1, 0),
        SchemaChange::Major => Version::new(version.major + 1, 0, 0),
    }
}

fn stamp_schema_version(schema: &mut Value, version: &SchemaVersion) {
    if let Some(obj) = schema.as_object_mut() {
        let metadata = obj
            .entry("metadata")
            .or_insert_with(|| Value::Object(Default::default()));
        if let Some(metadata) = metadata.as_object_mut() {
            metadata.insert("schema_version".to_string(), Value::String(version.to_string()));
        }
    }
}

fn derive_slug(explicit: Option<&str>, schema: &Value, name: &str) -> Result<String> {
    if let Some(slug) = explicit {
        return normalize_slug(slug);
    }
    if let Some(slug) = schema.get("metadata").and_then(|m| m.get("slug")).and_then(|s| s.as_str()) {
        return normalize_slug(slug);
    }
    normalize_slug(name)
}

pub struct ContentTypeService {
    repository: Arc<dyn ContentTypeRepository>,
    schema_registry: Arc<SchemaRegistry<Value>>,
    migrator: Arc<Migrator>,
    activity: Arc<ActivityEmitter>,
    environments: Arc<EnvironmentService>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl ContentTypeService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn ContentTypeRepository>,
        schema_registry: Arc<SchemaRegistry<Value>>,
        migrator: Arc<Migrator>,
        activity: Arc<ActivityEmitter>,
        environments: Arc<EnvironmentService>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Self {
        Self {
            repository,
            schema_registry,
            migrator,
            activity,
            environments,
            clock,
            config,
        }
    }

    pub fn register_migration(
        &self,
        slug: impl Into<String>,
        from: Version,
        to: Version,
        apply: ferrocms_schema::MigrationFn,
    ) {
        self.migrator.register(slug, from, to, apply);
    }

    /// Creates a draft content type. The slug is resolved from, in order,
    /// the explicit `slug` argument, `schema.metadata.slug`, or the
    /// normalized `name`. The schema is self-validated, registered at
    /// `v1.0.0` (or whatever version it already carries), and the initial
    /// history snapshot is stamped.
    pub async fn create(
        &self,
        environment_id: EnvironmentId,
        slug: Option<&str>,
        name: &str,
        mut schema: Value,
        ui_schema: Value,
    ) -> Result<ContentType> {
        self.environments.require_active(environment_id).await?;
        let slug = derive_slug(slug, &schema, name)?;
        validate_schema(&schema)?;

        if self.repository.find_by_slug(environment_id, &slug).await?.is_some() {
            return Err(Error::SlugExists {
                entity_type: "content_type".to_string(),
                slug,
            });
        }

        let version = self.schema_registry.register(&slug, &mut schema, schema.clone())?;
        let now = self.clock.now();

        let content_type = self
            .repository
            .create(ContentType {
                id: ContentTypeId::new(),
                environment_id,
                slug: slug.clone(),
                name: name.to_string(),
                schema: schema.clone(),
                ui_schema: ui_schema.clone(),
                status: ContentTypeStatus::Draft,
                schema_version: version.to_string(),
                schema_history: vec![ContentTypeSchemaSnapshot {
                    version: version.to_string(),
                    schema,
                    ui_schema,
                    recorded_at: now,
                }],
                deleted_at: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.activity
            .emit(
                Activity::new(ActivityVerb::Create, ObjectType::ContentType, *content_type.id.as_uuid())
                    .with_channel("content_type")
                    .with_metadata("status", "draft")
                    .with_metadata("slug", content_type.slug.clone()),
            )
            .await;

        Ok(content_type)
    }

    pub async fn get(&self, id: ContentTypeId) -> Result<ContentType> {
        self.repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Error::not_found("content_type", id.to_string()))
    }

    pub async fn get_by_slug(&self, environment_id: EnvironmentId, slug: &str) -> Result<ContentType> {
        self.repository
            .find_by_slug(environment_id, slug)
            .await?
            .ok_or_else(|| Error::not_found("content_type", slug.to_string()))
    }

    pub async fn list(
        &self,
        environment_id: EnvironmentId,
        params: &ListParams,
    ) -> Result<ListResult<ContentType>> {
        self.repository.list_by_environment(environment_id, params).await
    }

    pub async fn search(
        &self,
        environment_id: EnvironmentId,
        query: &str,
        params: &ListParams,
    ) -> Result<ListResult<ContentType>> {
        self.repository
            .search_by_environment(environment_id, query, params)
            .await
    }

    /// Mutates name/schema/ui_schema/status. A schema or ui_schema change
    /// bumps semver according to [`classify_schema_change`]; a `Major`
    /// bump against an `active` type is rejected unless
    /// `allow_breaking_changes` is set. `active -> draft` is always
    /// rejected.
    pub async fn update(
        &self,
        id: ContentTypeId,
        name: Option<&str>,
        schema: Option<Value>,
        ui_schema: Option<Value>,
        status: Option<ContentTypeStatus>,
    ) -> Result<ContentType> {
        let mut content_type = self.get(id).await?;
        self.environments.require_active(content_type.environment_id).await?;

        if let Some(status) = status {
            if content_type.status == ContentTypeStatus::Active && status == ContentTypeStatus::Draft {
                return Err(Error::ContentTypeStatusChange);
            }
        }

        if let Some(name) = name {
            content_type.name = name.to_string();
        }

        let mut became_active = false;
        if let Some(mut new_schema) = schema {
            validate_schema(&new_schema)?;
            let change = classify_schema_change(&content_type.schema, &new_schema);
            if content_type.status == ContentTypeStatus::Active
                && change == SchemaChange::Major
                && !self.config.allow_breaking_changes
            {
                return Err(Error::ContentTypeSchemaBreaking);
            }

            let current: SchemaVersion = content_type
                .schema_version
                .parse()
                .unwrap_or_else(|_| SchemaVersion::initial(&content_type.slug));
            let next = SchemaVersion::new(content_type.slug.clone(), bump(&current.version, change));
            stamp_schema_version(&mut new_schema, &next);
            self.schema_registry
                .register(&content_type.slug, &mut new_schema, new_schema.clone())?;

            let now = self.clock.now();
            content_type.schema = new_schema.clone();
            content_type.schema_version = next.to_string();
            content_type.schema_history.push(ContentTypeSchemaSnapshot {
                version: next.to_string(),
                schema: new_schema,
                ui_schema: ui_schema.clone().unwrap_or_else(|| content_type.ui_schema.clone()),
                recorded_at: now,
            });
        }

        if let Some(ui_schema) = ui_schema {
            content_type.ui_schema = ui_schema;
        }

        if let Some(status) = status {
            became_active = content_type.status == ContentTypeStatus::Draft && status == ContentTypeStatus::Active;
            content_type.status = status;
        }

        content_type.updated_at = self.clock.now();
        let content_type = self.repository.update(content_type).await?;

        let verb = if became_active { ActivityVerb::Publish } else { ActivityVerb::Update };
        self.activity
            .emit(
                Activity::new(verb, ObjectType::ContentType, *content_type.id.as_uuid())
                    .with_channel("content_type")
                    .with_metadata("status", format!("{:?}", content_type.status).to_lowercase())
                    .with_metadata("slug", content_type.slug.clone()),
            )
            .await;

        Ok(content_type)
    }

    /// `hard=false` soft-deletes: the slug is unhooked from lookups but
    /// the row remains for historical content versions to reference.
    /// `hard=true` removes the row outright; referential integrity
    /// against live content is the storage layer's concern.
    pub async fn delete(&self, id: ContentTypeId, hard: bool) -> Result<()> {
        let mut content_type = self.get(id).await?;
        self.environments.require_active(content_type.environment_id).await?;
        let slug = content_type.slug.clone();

        if hard {
            self.repository.delete(&id).await?;
        } else {
            content_type.deleted_at = Some(self.clock.now());
            content_type.updated_at = self.clock.now();
            self.repository.update(content_type).await?;
        }

        self.activity
            .emit(
                Activity::new(ActivityVerb::Delete, ObjectType::ContentType, *id.as_uuid())
                    .with_channel("content_type")
                    .with_metadata("slug", slug),
            )
            .await;

        Ok(())
    }
}

#[async_trait]
impl Service for ContentTypeService {
    fn name(&self) -> &str {
        "content-type-service"
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryContentTypeRepository;
    use ferrocms_core::SystemClock;
    use serde_json::json;

    fn service() -> (ContentTypeService, Arc<EnvironmentService>) {
        let environments = Arc::new(EnvironmentService::new(
            Arc::new(ferrocms_directory::memory::InMemoryEnvironmentRepository::new()),
            Arc::new(SystemClock),
        ));
        let svc = ContentTypeService::new(
            Arc::new(InMemoryContentTypeRepository::new()),
            Arc::new(SchemaRegistry::new()),
            Arc::new(Migrator::new()),
            Arc::new(ActivityEmitter::new()),
            environments.clone(),
            Arc::new(SystemClock),
            EngineConfig::default(),
        );
        (svc, environments)
    }

    fn article_schema() -> Value {
        json!({
            "type": "object",
            "required": ["title"],
            "properties": { "title": { "type": "string" } },
        })
    }

    #[tokio::test]
    async fn create_derives_slug_from_name_when_not_given() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let ct = svc
            .create(env, None, "Blog Article", article_schema(), json!({}))
            .await
            .unwrap();
        assert_eq!(ct.slug, "blog-article");
        assert_eq!(ct.status, ContentTypeStatus::Draft);
        assert_eq!(ct.schema_history.len(), 1);
    }

    #[tokio::test]
    async fn adding_a_required_field_is_a_breaking_change_once_active() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let ct = svc
            .create(env, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();
        let ct = svc
            .update(ct.id, None, None, None, Some(ContentTypeStatus::Active))
            .await
            .unwrap();
        assert_eq!(ct.status, ContentTypeStatus::Active);

        let mut breaking = article_schema();
        breaking["required"] = json!(["title", "body"]);
        breaking["properties"]["body"] = json!({ "type": "string" });

        let err = svc.update(ct.id, None, Some(breaking), None, None).await.unwrap_err();
        assert!(matches!(err, Error::ContentTypeSchemaBreaking));
    }

    #[tokio::test]
    async fn active_to_draft_transition_is_rejected() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let ct = svc
            .create(env, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();
        let ct = svc
            .update(ct.id, None, None, None, Some(ContentTypeStatus::Active))
            .await
            .unwrap();

        let err = svc
            .update(ct.id, None, None, None, Some(ContentTypeStatus::Draft))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContentTypeStatusChange));
    }

    #[tokio::test]
    async fn soft_delete_unhooks_the_slug_for_reuse() {
        let (svc, environments) = service();
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let ct = svc
            .create(env, Some("article"), "Article", article_schema(), json!({}))
            .await
            .unwrap();
        svc.delete(ct.id, false).await.unwrap();

        assert!(svc.get_by_slug(env, "article").await.is_err());
        let recreated = svc
            .create(env, Some("article"), "Article Again", article_schema(), json!({}))
            .await
            .unwrap();
        assert_ne!(recreated.id, ct.id);
    }
}
