//! The embedded-blocks bridge (§4.3): dual-writes a content/page payload's
//! inline `blocks` array into first-class [`BlockInstance`] mirrors, merges
//! mirrors back on read when the stored payload carries none, and migrates
//! inline block bodies to their definition's current schema on
//! preview/publish.

use std::sync::Arc;

use ferrocms_core::{EnvironmentId, Error, Result, ValidationErrors};
use ferrocms_schema::{SchemaVersion, ValidationMode};
use serde_json::Value;

use crate::entities::EmbeddedBlock;
use crate::service::BlockService;

pub struct EmbeddedBlocksBridge {
    blocks: Arc<BlockService>,
}

impl EmbeddedBlocksBridge {
    pub fn new(blocks: Arc<BlockService>) -> Self {
        Self { blocks }
    }

    /// Parses the reserved `blocks` array out of a content/page payload.
    /// Malformed entries (missing `_type`/`_schema_version`) are dropped
    /// rather than failing extraction; `sync` validates what remains.
    pub fn extract(payload: &Value) -> Vec<EmbeddedBlock> {
        payload
            .get("blocks")
            .and_then(|v| v.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Validates each embedded block against its definition's current
    /// schema (draft or strict per `mode`) and mirrors it into a
    /// [`BlockInstance`] keyed by `owner_key` plus type+position. Mirrors
    /// for positions no longer present in `payload` are deleted.
    pub async fn sync(
        &self,
        environment_id: EnvironmentId,
        owner_key: &str,
        payload: &Value,
        mode: ValidationMode,
    ) -> Result<()> {
        let blocks = Self::extract(payload);
        let mut live_keys = Vec::with_capacity(blocks.len());

        for (position, block) in blocks.iter().enumerate() {
            let mirror_key = format!(
                "{owner_key}:{}",
                EmbeddedBlock::mirror_key(&block.block_type, position)
            );
            live_keys.push(mirror_key.clone());
            self.blocks
                .sync_mirror(
                    environment_id,
                    &block.block_type,
                    &mirror_key,
                    block.body.clone(),
                    mode,
                )
                .await?;
        }

        let owner_prefix = format!("{owner_key}:");
        for existing in self.blocks.list_instances_by_mirror_prefix(&owner_prefix).await? {
            if let Some(key) = &existing.mirror_key {
                if !live_keys.contains(key) {
                    self.blocks.delete_mirror(key).await?;
                }
            }
        }

        Ok(())
    }

    /// Merges mirrored instances back into `payload["blocks"]` when the
    /// stored payload itself carries no inline blocks.
    pub async fn merge_on_read(&self, owner_key: &str, payload: &mut Value) -> Result<()> {
        let has_inline = payload
            .get("blocks")
            .and_then(|v| v.as_array())
            .is_some_and(|a| !a.is_empty());
        if has_inline {
            return Ok(());
        }

        let owner_prefix = format!("{owner_key}:");
        let mut mirrors = self.blocks.list_instances_by_mirror_prefix(&owner_prefix).await?;
        if mirrors.is_empty() {
            return Ok(());
        }
        mirrors.sort_by_key(|m| m.position);

        let mut merged = Vec::with_capacity(mirrors.len());
        for mirror in mirrors {
            let definition = self.blocks.get_definition(mirror.definition_id).await?;
            let mut body = mirror.configuration.clone();
            if let Some(obj) = body.as_object_mut() {
                obj.insert("_type".to_string(), Value::String(definition.slug));
                obj.insert(
                    "_schema_version".to_string(),
                    Value::String(definition.schema_version),
                );
            }
            merged.push(body);
        }

        if let Some(obj) = payload.as_object_mut() {
            obj.insert("blocks".to_string(), Value::Array(merged));
        }
        Ok(())
    }

    /// Walks every entry in `payload["blocks"]`, migrating each to its
    /// definition's current schema version and writing the migrated body
    /// back in place. Run on preview/publish, never on a plain read.
    pub async fn migrate_to_latest(
        &self,
        environment_id: EnvironmentId,
        payload: &mut Value,
    ) -> Result<()> {
        let Some(entries) = payload.get_mut("blocks").and_then(|v| v.as_array_mut()) else {
            return Ok(());
        };

        for entry in entries.iter_mut() {
            let block_type = entry
                .get("_type")
                .and_then(|v| v.as_str())
                .ok_or_else(missing_block_type)?
                .to_string();

            let definition = self
                .blocks
                .get_definition_by_slug(environment_id, &block_type)
                .await?;
            let target: SchemaVersion = definition.schema_version.parse()?;

            let current_label = entry
                .get("_schema_version")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            if current_label == definition.schema_version {
                continue;
            }
            let from: SchemaVersion = if current_label.is_empty() {
                SchemaVersion::initial(&block_type)
            } else {
                current_label.parse()?
            };

            let mut body = entry.take();
            if let Some(obj) = body.as_object_mut() {
                obj.remove("_type");
                obj.remove("_schema_version");
            }

            let mut migrated = self
                .blocks
                .migrate_payload(&block_type, &from.version, &target.version, body)
                .await?;
            if let Some(obj) = migrated.as_object_mut() {
                obj.insert("_type".to_string(), Value::String(block_type));
                obj.insert(
                    "_schema_version".to_string(),
                    Value::String(target.to_string()),
                );
            }
            *entry = migrated;
        }

        Ok(())
    }
}

fn missing_block_type() -> Error {
    let mut errors = ValidationErrors::new();
    errors.add("blocks[]._type", "missing embedded block type");
    Error::Validation(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{
        InMemoryBlockDefinitionRepository, InMemoryBlockInstanceRepository,
        InMemoryBlockTranslationRepository, InMemoryBlockVersionRepository,
    };
    use ferrocms_core::{EngineConfig, HookRegistry, SystemClock};
    use ferrocms_directory::memory::InMemoryEnvironmentRepository;
    use ferrocms_directory::EnvironmentService;
    use ferrocms_schema::{Migrator, SchemaRegistry};
    use serde_json::json;
    use std::sync::Arc as StdArc;

    async fn bridge() -> (EmbeddedBlocksBridge, Arc<BlockService>, EnvironmentId) {
        let environments = StdArc::new(EnvironmentService::new(
            StdArc::new(InMemoryEnvironmentRepository::new()),
            StdArc::new(SystemClock),
        ));
        let env = environments.create("default", "Default", true).await.unwrap().id;
        let service = Arc::new(BlockService::new(
            StdArc::new(InMemoryBlockDefinitionRepository::new()),
            StdArc::new(InMemoryBlockInstanceRepository::new()),
            StdArc::new(InMemoryBlockTranslationRepository::new()),
            StdArc::new(InMemoryBlockVersionRepository::new()),
            environments,
            StdArc::new(SchemaRegistry::new()),
            StdArc::new(Migrator::new()),
            StdArc::new(HookRegistry::new()),
            StdArc::new(SystemClock),
            EngineConfig::default(),
        ));
        (EmbeddedBlocksBridge::new(service.clone()), service, env)
    }

    fn hero_schema() -> Value {
        json!({
            "type": "object",
            "required": ["headline"],
            "properties": { "headline": { "type": "string" } },
        })
    }

    #[tokio::test]
    async fn sync_mirrors_each_inline_block_and_prunes_removed_ones() {
        let (bridge, service, env) = bridge().await;
        service
            .register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();

        let payload = json!({
            "blocks": [
                { "_type": "hero", "_schema_version": "hero@v1.0.0", "headline": "Hi" }
            ]
        });
        bridge.sync(env, "content:1", &payload, ValidationMode::Partial).await.unwrap();

        let mirrors = service.list_instances_by_mirror_prefix("content:1:").await.unwrap();
        assert_eq!(mirrors.len(), 1);
        assert_eq!(mirrors[0].configuration["headline"], "Hi");

        // Removing the block from the payload prunes its mirror.
        bridge
            .sync(env, "content:1", &json!({ "blocks": [] }), ValidationMode::Partial)
            .await
            .unwrap();
        let mirrors = service.list_instances_by_mirror_prefix("content:1:").await.unwrap();
        assert!(mirrors.is_empty());
    }

    #[tokio::test]
    async fn merge_on_read_reconstitutes_blocks_from_mirrors() {
        let (bridge, service, env) = bridge().await;
        service
            .register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();

        let payload = json!({
            "blocks": [
                { "_type": "hero", "_schema_version": "hero@v1.0.0", "headline": "Hi" }
            ]
        });
        bridge.sync(env, "content:1", &payload, ValidationMode::Partial).await.unwrap();

        let mut bare = json!({});
        bridge.merge_on_read("content:1", &mut bare).await.unwrap();
        assert_eq!(bare["blocks"][0]["_type"], "hero");
        assert_eq!(bare["blocks"][0]["headline"], "Hi");
    }

    #[tokio::test]
    async fn merge_on_read_leaves_payload_untouched_when_inline_blocks_present() {
        let (bridge, _service, _env) = bridge().await;
        let mut payload = json!({ "blocks": [{ "_type": "hero", "_schema_version": "hero@v1.0.0" }] });
        let before = payload.clone();
        bridge.merge_on_read("content:1", &mut payload).await.unwrap();
        assert_eq!(payload, before);
    }

    #[tokio::test]
    async fn migrate_to_latest_rewrites_each_entry_through_the_registered_chain() {
        let (bridge, service, env) = bridge().await;

        let mut v2 = hero_schema();
        v2["properties"] = json!({ "title": { "type": "string" } });
        v2["required"] = json!(["title"]);
        v2["metadata"] = json!({ "schema_version": "hero@v2.0.0" });

        service
            .register_definition(env, "hero", "Hero", hero_schema(), json!({}))
            .await
            .unwrap();
        service
            .register_definition(env, "hero", "Hero", v2, json!({}))
            .await
            .unwrap();

        service.register_migration(
            "hero",
            semver::Version::new(1, 0, 0),
            semver::Version::new(2, 0, 0),
            std::sync::Arc::new(|mut v: Value| {
                if let Some(headline) = v.get("headline").cloned() {
                    v["title"] = headline;
                    v.as_object_mut().unwrap().remove("headline");
                }
                Ok(v)
            }),
        );

        let mut payload = json!({
            "blocks": [
                { "_type": "hero", "_schema_version": "hero@v1.0.0", "headline": "Hi" }
            ]
        });
        bridge.migrate_to_latest(env, &mut payload).await.unwrap();

        assert_eq!(payload["blocks"][0]["_schema_version"], "hero@v2.0.0");
        assert_eq!(payload["blocks"][0]["title"], "Hi");
        assert!(payload["blocks"][0].get("headline").is_none());
    }
}
