//! In-process schema registry shared by the block and content-type
//! definition services (§4.5: "Definitions are versioned through an
//! in-process registry").

use dashmap::DashMap;
use ferrocms_core::Result;
use semver::Version;
use serde_json::Value;

use crate::version::{ensure_schema_version, SchemaVersion};

/// Stores one definition per `(slug, version)`, tracking the highest
/// registered semver per slug as "latest".
pub struct SchemaRegistry<T> {
    versions: DashMap<String, DashMap<Version, T>>,
    latest: DashMap<String, Version>,
}

impl<T: Clone> SchemaRegistry<T> {
    pub fn new() -> Self {
        Self {
            versions: DashMap::new(),
            latest: DashMap::new(),
        }
    }

    /// Normalizes `slug`, calls [`ensure_schema_version`] on `schema`, and
    /// stores `definition` under the resolved version. Returns the
    /// resolved version; the slug's "latest" pointer advances only if this
    /// version is newer than the current latest.
    pub fn register(&self, slug: &str, schema: &mut Value, definition: T) -> Result<SchemaVersion> {
        let version = ensure_schema_version(schema, slug)?;

        self.versions
            .entry(slug.to_string())
            .or_default()
            .insert(version.version.clone(), definition);

        self.latest
            .entry(slug.to_string())
            .and_modify(|current| {
                if version.version > *current {
                    *current = version.version.clone();
                }
            })
            .or_insert_with(|| version.version.clone());

        Ok(version)
    }

    pub fn get(&self, slug: &str, version: &Version) -> Option<T> {
        self.versions.get(slug)?.get(version).map(|v| v.clone())
    }

    pub fn latest_version(&self, slug: &str) -> Option<Version> {
        self.latest.get(slug).map(|v| v.clone())
    }

    pub fn latest(&self, slug: &str) -> Option<T> {
        let version = self.latest_version(slug)?;
        self.get(slug, &version)
    }
}

impl<T: Clone> Default for SchemaRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn latest_tracks_the_highest_registered_version() {
        let registry: SchemaRegistry<&'static str> = SchemaRegistry::new();

        let mut v1 = json!({ "type": "object" });
        registry.register("article", &mut v1, "v1 definition").unwrap();

        let mut v2 = json!({ "metadata": { "schema_version": "article@v1.1.0" }, "type": "object" });
        registry.register("article", &mut v2, "v1.1 definition").unwrap();

        assert_eq!(registry.latest_version("article"), Some(Version::new(1, 1, 0)));
        assert_eq!(registry.latest("article"), Some("v1.1 definition"));
        assert_eq!(
            registry.get("article", &Version::new(1, 0, 0)),
            Some("v1 definition")
        );
    }

    #[test]
    fn registering_an_older_version_does_not_move_latest_back() {
        let registry: SchemaRegistry<i32> = SchemaRegistry::new();

        let mut v2 = json!({ "metadata": { "schema_version": "widget@v2.0.0" }, "type": "object" });
        registry.register("widget", &mut v2, 2).unwrap();

        let mut v1 = json!({ "metadata": { "schema_version": "widget@v1.0.0" }, "type": "object" });
        registry.register("widget", &mut v1, 1).unwrap();

        assert_eq!(registry.latest_version("widget"), Some(Version::new(2, 0, 0)));
    }
}
