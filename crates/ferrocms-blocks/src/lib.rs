//! Block definitions, instances, translations, versioning, and the
//! embedded-blocks bridge consumed by the content and page services
//! (§3, §4.3, §4.5).

pub mod bridge;
pub mod entities;
pub mod memory;
pub mod repository;
pub mod service;

pub use bridge::EmbeddedBlocksBridge;
pub use entities::{
    BlockDefinition, BlockInstance, BlockSnapshot, BlockStatus, BlockTranslation, BlockVersion,
    EmbeddedBlock, MediaBinding,
};
pub use memory::{
    InMemoryBlockDefinitionRepository, InMemoryBlockInstanceRepository,
    InMemoryBlockTranslationRepository, InMemoryBlockVersionRepository,
};
pub use repository::{
    BlockDefinitionRepository, BlockInstanceRepository, BlockTranslationRepository,
    BlockVersionRepository,
};
pub use service::BlockService;
