//! Engine-wide configuration.
//!
//! Global feature-gate singletons are expressed here as an explicit,
//! process-wide configuration record with enumerated recognized fields
//! (design note §9) — no runtime mutation outside constructing a new
//! [`EngineConfig`]. Individual operation DTOs may still override a subset
//! of these per-call (see `RequireTranslations` on `Content::Create`).

use serde::{Deserialize, Serialize};

/// Feature gates and tunables shared by the content, page, and block
/// services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gates `CreateDraft`/`PublishDraft`/`ListVersions`/`RestoreVersion`.
    pub versioning_enabled: bool,
    /// Gates `Schedule`.
    pub scheduling_enabled: bool,
    /// Gates translation management entirely.
    pub translations_enabled: bool,
    /// `Create` requires a non-empty translation list unless the request
    /// sets `allow_missing_translations`.
    pub require_translations: bool,
    /// `Create` requires the configured default locale to be present.
    pub default_locale_required: bool,
    /// The locale code treated as default for `default_locale_required`.
    pub default_locale: String,
    /// Allow a request to opt out of `require_translations` for that call.
    pub allow_missing_translations: bool,
    /// Allow a content-type update with a major schema bump while
    /// `status=active`.
    pub allow_breaking_changes: bool,
    /// Pages must resolve their template against a `ThemeService`.
    pub themes_enabled: bool,
    /// Maximum number of versions retained per content/page/block instance
    /// before `CreateDraft` fails with `VersionRetentionExceeded`. `None`
    /// disables the limit.
    pub version_retention: Option<u32>,
    /// Maximum disambiguation suffix attempted by `Page::Duplicate` before
    /// giving up with `PageDuplicateSlug`.
    pub duplicate_slug_max_suffix: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            versioning_enabled: true,
            scheduling_enabled: true,
            translations_enabled: true,
            require_translations: false,
            default_locale_required: false,
            default_locale: "en".to_string(),
            allow_missing_translations: false,
            allow_breaking_changes: false,
            themes_enabled: false,
            version_retention: None,
            duplicate_slug_max_suffix: 20,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }
}

/// Explicit builder — "dynamic option structs collapse to an explicit
/// configuration record" (design note §9); this is that record's
/// constructor surface, not a variadic options pattern.
#[derive(Debug, Clone, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn versioning_enabled(mut self, value: bool) -> Self {
        self.config.versioning_enabled = value;
        self
    }

    pub fn scheduling_enabled(mut self, value: bool) -> Self {
        self.config.scheduling_enabled = value;
        self
    }

    pub fn translations_enabled(mut self, value: bool) -> Self {
        self.config.translations_enabled = value;
        self
    }

    pub fn require_translations(mut self, value: bool) -> Self {
        self.config.require_translations = value;
        self
    }

    pub fn default_locale_required(mut self, value: bool) -> Self {
        self.config.default_locale_required = value;
        self
    }

    pub fn default_locale(mut self, code: impl Into<String>) -> Self {
        self.config.default_locale = code.into();
        self
    }

    pub fn allow_breaking_changes(mut self, value: bool) -> Self {
        self.config.allow_breaking_changes = value;
        self
    }

    pub fn themes_enabled(mut self, value: bool) -> Self {
        self.config.themes_enabled = value;
        self
    }

    pub fn version_retention(mut self, value: Option<u32>) -> Self {
        self.config.version_retention = value;
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_the_core_feature_set() {
        let config = EngineConfig::default();
        assert!(config.versioning_enabled);
        assert!(config.scheduling_enabled);
        assert!(!config.require_translations);
    }

    #[test]
    fn builder_overrides_selected_fields() {
        let config = EngineConfig::builder()
            .versioning_enabled(false)
            .default_locale("es")
            .default_locale_required(true)
            .build();

        assert!(!config.versioning_enabled);
        assert_eq!(config.default_locale, "es");
        assert!(config.default_locale_required);
        assert!(config.scheduling_enabled);
    }
}
