//! Environment and Locale records (§3 data model).

use chrono::{DateTime, Utc};
use ferrocms_core::EnvironmentId;
use ferrocms_core::LocaleId;
use serde::{Deserialize, Serialize};

/// A tenant-scoping environment. Externally provisioned; this engine only
/// resolves keys to ids and gates mutations on `active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub key: String,
    pub name: String,
    pub active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A resolvable locale (`en`, `es`, …). `code` is stored case-folded for
/// lookup; `display` keeps the caller-supplied form for presentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locale {
    pub id: LocaleId,
    pub code: String,
    pub display: String,
    pub active: bool,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Locale {
    /// Case-folds a locale code the way lookups and uniqueness checks do.
    pub fn fold_code(code: &str) -> String {
        code.trim().to_lowercase()
    }
}
