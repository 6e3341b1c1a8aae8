//! In-process migration DAG shared by content, page, and block schemas
//! (§4.6: `Migrator.Register` / `Migrate`).

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use ferrocms_core::{Error, Result};
use semver::Version;
use serde_json::Value;

use crate::version::SchemaVersion;

/// A single migration step: takes the payload at `from` and returns the
/// payload shaped for `to`.
pub type MigrationFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;

#[derive(Clone)]
struct Step {
    to: Version,
    apply: MigrationFn,
}

/// Registry of single-step migrations, keyed by `(slug, from)`. `Migrate`
/// walks the chain one step at a time until it reaches the target version,
/// detecting cycles and unreachable targets along the way.
#[derive(Default)]
pub struct Migrator {
    steps: DashMap<(String, Version), Step>,
}

impl Migrator {
    pub fn new() -> Self {
        Self {
            steps: DashMap::new(),
        }
    }

    /// Registers the step `slug@from -> slug@to`, replacing any step
    /// previously registered for the same `(slug, from)` pair.
    pub fn register(
        &self,
        slug: impl Into<String>,
        from: Version,
        to: Version,
        apply: MigrationFn,
    ) {
        self.steps.insert((slug.into(), from), Step { to, apply });
    }

    /// Applies registered steps in sequence until `payload` reaches
    /// `target`, or fails if no step is registered, or if following steps
    /// would cycle without ever reaching it.
    pub fn migrate(
        &self,
        slug: &str,
        from: &Version,
        target: &Version,
        payload: Value,
    ) -> Result<Value> {
        if from == target {
            return Ok(payload);
        }

        let mut current = from.clone();
        let mut value = payload;
        let mut visited: HashMap<Version, ()> = HashMap::new();
        visited.insert(current.clone(), ());

        loop {
            let step = self
                .steps
                .get(&(slug.to_string(), current.clone()))
                .ok_or_else(|| Error::SchemaMigrationRequired {
                    slug: slug.to_string(),
                    from: current.to_string(),
                    to: target.to_string(),
                })?
                .clone();

            value = (step.apply)(value)?;
            current = step.to;

            if &current == target {
                return Ok(value);
            }

            if visited.insert(current.clone(), ()).is_some() {
                return Err(Error::SchemaMigrationRequired {
                    slug: slug.to_string(),
                    from: from.to_string(),
                    to: target.to_string(),
                });
            }
        }
    }

    /// Convenience wrapper over [`Migrator::migrate`] accepting parsed
    /// `SchemaVersion` labels instead of bare slug/version pairs.
    pub fn migrate_versions(
        &self,
        from: &SchemaVersion,
        to: &SchemaVersion,
        payload: Value,
    ) -> Result<Value> {
        if from.slug != to.slug {
            return Err(Error::SchemaMigrationRequired {
                slug: from.slug.clone(),
                from: from.version.to_string(),
                to: to.version.to_string(),
            });
        }
        self.migrate(&from.slug, &from.version, &to.version, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn migrates_through_a_chain_of_steps() {
        let migrator = Migrator::new();
        migrator.register(
            "article",
            Version::new(1, 0, 0),
            Version::new(1, 1, 0),
            Arc::new(|mut v| {
                v["body"] = json!(v["content"].clone());
                Ok(v)
            }),
        );
        migrator.register(
            "article",
            Version::new(1, 1, 0),
            Version::new(2, 0, 0),
            Arc::new(|mut v| {
                v.as_object_mut().unwrap().remove("content");
                Ok(v)
            }),
        );

        let result = migrator
            .migrate(
                "article",
                &Version::new(1, 0, 0),
                &Version::new(2, 0, 0),
                json!({ "content": "hello" }),
            )
            .unwrap();

        assert_eq!(result["body"], "hello");
        assert!(result.get("content").is_none());
    }

    #[test]
    fn missing_step_surfaces_migration_required() {
        let migrator = Migrator::new();
        let err = migrator
            .migrate(
                "article",
                &Version::new(1, 0, 0),
                &Version::new(2, 0, 0),
                json!({}),
            )
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMigrationRequired { .. }));
    }

    #[test]
    fn same_version_is_a_no_op() {
        let migrator = Migrator::new();
        let payload = json!({ "a": 1 });
        let result = migrator
            .migrate(
                "article",
                &Version::new(1, 0, 0),
                &Version::new(1, 0, 0),
                payload.clone(),
            )
            .unwrap();
        assert_eq!(result, payload);
    }

    #[test]
    fn cycles_are_rejected() {
        let migrator = Migrator::new();
        migrator.register(
            "article",
            Version::new(1, 0, 0),
            Version::new(1, 1, 0),
            Arc::new(Ok),
        );
        migrator.register(
            "article",
            Version::new(1, 1, 0),
            Version::new(1, 0, 0),
            Arc::new(Ok),
        );

        let err = migrator
            .migrate(
                "article",
                &Version::new(1, 0, 0),
                &Version::new(2, 0, 0),
                json!({}),
            )
            .unwrap_err();
        assert!(matches!(err, Error::SchemaMigrationRequired { .. }));
    }
}
