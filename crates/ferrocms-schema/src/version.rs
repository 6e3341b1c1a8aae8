//! The `slug@vMAJOR.MINOR.PATCH` schema-version label (§4.6, §9 glossary).

use std::fmt;
use std::str::FromStr;

use ferrocms_core::{Error, Result};
use semver::Version;
use serde_json::Value;

/// A parsed schema version: the owning slug plus a semver triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
    pub slug: String,
    pub version: Version,
}

impl SchemaVersion {
    pub fn new(slug: impl Into<String>, version: Version) -> Self {
        Self {
            slug: slug.into(),
            version,
        }
    }

    pub fn initial(slug: impl Into<String>) -> Self {
        Self::new(slug, Version::new(1, 0, 0))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{}", self.slug, self.version)
    }
}

impl FromStr for SchemaVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (slug, version) = s.split_once("@v").ok_or_else(|| Error::SchemaInvalid {
            slug: s.to_string(),
            version: String::new(),
            detail: "expected owner@vMAJOR.MINOR.PATCH".to_string(),
        })?;
        let version = Version::parse(version).map_err(|e| Error::SchemaInvalid {
            slug: slug.to_string(),
            version: version.to_string(),
            detail: e.to_string(),
        })?;
        Ok(Self::new(slug, version))
    }
}

/// Reads `metadata.schema_version` off a schema document; assigns
/// `slug@v1.0.0` if absent, otherwise validates the embedded label matches
/// `slug` (§4.6: `EnsureSchemaVersion`).
pub fn ensure_schema_version(schema: &mut Value, slug: &str) -> Result<SchemaVersion> {
    let existing = schema
        .get("metadata")
        .and_then(|m| m.get("schema_version"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let resolved = match existing {
        None => SchemaVersion::initial(slug),
        Some(label) => {
            let parsed: SchemaVersion = label.parse()?;
            if parsed.slug != slug {
                return Err(Error::SchemaInvalid {
                    slug: slug.to_string(),
                    version: label,
                    detail: format!("schema_version slug {:?} does not match {slug:?}", parsed.slug),
                });
            }
            parsed
        }
    };

    let metadata = schema
        .as_object_mut()
        .ok_or_else(|| Error::SchemaInvalid {
            slug: slug.to_string(),
            version: resolved.version.to_string(),
            detail: "schema document must be a JSON object".to_string(),
        })?
        .entry("metadata")
        .or_insert_with(|| Value::Object(Default::default()));

    metadata
        .as_object_mut()
        .ok_or_else(|| Error::SchemaInvalid {
            slug: slug.to_string(),
            version: resolved.version.to_string(),
            detail: "metadata must be a JSON object".to_string(),
        })?
        .insert(
            "schema_version".to_string(),
            Value::String(resolved.to_string()),
        );

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assigns_initial_version_when_absent() {
        let mut schema = json!({ "type": "object" });
        let version = ensure_schema_version(&mut schema, "article").unwrap();
        assert_eq!(version.to_string(), "article@v1.0.0");
        assert_eq!(schema["metadata"]["schema_version"], "article@v1.0.0");
    }

    #[test]
    fn validates_existing_label_against_slug() {
        let mut schema = json!({ "metadata": { "schema_version": "other@v2.1.0" } });
        let err = ensure_schema_version(&mut schema, "article").unwrap_err();
        assert!(matches!(err, Error::SchemaInvalid { .. }));
    }

    #[test]
    fn round_trips_display_and_parse() {
        let version: SchemaVersion = "article@v2.3.1".parse().unwrap();
        assert_eq!(version.slug, "article");
        assert_eq!(version.to_string(), "article@v2.3.1");
    }
}
