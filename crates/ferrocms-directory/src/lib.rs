//! Environment and locale resolution (§2): the two weakly-referenced
//! directory entities every content, page, and block operation is scoped
//! by.

pub mod entities;
pub mod memory;
pub mod repository;
pub mod service;

pub use entities::{Environment, Locale};
pub use memory::{InMemoryEnvironmentRepository, InMemoryLocaleRepository};
pub use repository::{EnvironmentRepository, LocaleRepository};
pub use service::{EnvironmentService, LocaleService};
