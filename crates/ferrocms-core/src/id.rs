//! Opaque 128-bit identifiers, newtyped per entity kind.
//!
//! A bare [`uuid::Uuid`] carries no information about which repository it
//! indexes into; passing raw `Uuid`s across service boundaries is how a
//! `page_id` ends up in a `content_id` field. Every entity gets its own id
//! type instead, all built on the same macro.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            pub fn into_uuid(self) -> Uuid {
                self.0
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(EnvironmentId);
entity_id!(LocaleId);
entity_id!(ContentTypeId);
entity_id!(ContentId);
entity_id!(ContentTranslationId);
entity_id!(ContentVersionId);
entity_id!(PageId);
entity_id!(PageTranslationId);
entity_id!(PageVersionId);
entity_id!(TemplateId);
entity_id!(BlockDefinitionId);
entity_id!(BlockInstanceId);
entity_id!(BlockTranslationId);
entity_id!(BlockVersionId);
entity_id!(ActorId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_display_and_parse() {
        let id = ContentId::new();
        let text = id.to_string();
        let parsed: ContentId = text.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_entity_id_types_do_not_unify() {
        let content_id = ContentId::new();
        let page_id = PageId::from_uuid(content_id.into_uuid());
        // Same underlying uuid, but distinct types - this compiles only
        // because the conversion is explicit.
        assert_eq!(content_id.into_uuid(), page_id.into_uuid());
    }
}
