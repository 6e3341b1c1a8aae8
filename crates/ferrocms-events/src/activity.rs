//! The activity boundary (§6): the structured record emitted on every
//! successful mutation, fanned out to whatever external listener
//! (search indexer, audit log, webhook) subscribes to its channel.

use std::any::Any;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The action that produced the activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityVerb {
    Create,
    Update,
    Delete,
    Publish,
    Schedule,
    Move,
    Duplicate,
}

impl std::fmt::Display for ActivityVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Publish => "publish",
            Self::Schedule => "schedule",
            Self::Move => "move",
            Self::Duplicate => "duplicate",
        };
        write!(f, "{s}")
    }
}

/// The kind of entity the activity concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Content,
    ContentTranslation,
    ContentType,
    Page,
    PageTranslation,
    BlockInstance,
    BlockTranslation,
    Menu,
    Widget,
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Content => "content",
            Self::ContentTranslation => "content_translation",
            Self::ContentType => "content_type",
            Self::Page => "page",
            Self::PageTranslation => "page_translation",
            Self::BlockInstance => "block_instance",
            Self::BlockTranslation => "block_translation",
            Self::Menu => "menu",
            Self::Widget => "widget",
        };
        write!(f, "{s}")
    }
}

/// A single emitted activity record (§6 Activity boundary). `metadata`
/// always carries `env_id` (when applicable), `slug`, `status`, and
/// `locales`, per the boundary contract — callers are expected to set
/// those via [`Activity::with_metadata`] before emitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub verb: ActivityVerb,
    pub actor_id: Option<Uuid>,
    pub object_type: ObjectType,
    pub object_id: Uuid,
    pub channel: String,
    pub metadata: HashMap<String, Value>,
    pub occurred_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(verb: ActivityVerb, object_type: ObjectType, object_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            verb,
            actor_id: None,
            object_type,
            object_id,
            channel: object_type.to_string(),
            metadata: HashMap::new(),
            occurred_at: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// For trait objects that need to downcast a generic payload back to
    /// a concrete [`Activity`] (mirrors the base-trait shape other engine
    /// record kinds use).
    pub fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_actor_and_metadata() {
        let object_id = Uuid::new_v4();
        let actor_id = Uuid::new_v4();
        let activity = Activity::new(ActivityVerb::Publish, ObjectType::Content, object_id)
            .with_actor(actor_id)
            .with_metadata("slug", "hello-world")
            .with_metadata("status", "published");

        assert_eq!(activity.object_id, object_id);
        assert_eq!(activity.actor_id, Some(actor_id));
        assert_eq!(activity.metadata["slug"], "hello-world");
        assert_eq!(activity.channel, "content");
    }

    #[test]
    fn default_channel_matches_object_type() {
        let activity = Activity::new(ActivityVerb::Create, ObjectType::PageTranslation, Uuid::new_v4());
        assert_eq!(activity.channel, "page_translation");
    }
}
