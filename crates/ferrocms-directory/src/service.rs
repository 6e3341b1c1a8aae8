//! Environment and locale resolution services (§2).

use std::sync::Arc;

use async_trait::async_trait;
use ferrocms_core::{Clock, EnvironmentId, Error, LocaleId, Result, Service, ServiceHealth};

use crate::entities::{Environment, Locale};
use crate::repository::{EnvironmentRepository, LocaleRepository};

/// Resolves an environment key to an id and active flag; every mutating
/// service method elsewhere gates itself by calling [`EnvironmentService::require_active`].
pub struct EnvironmentService {
    repository: Arc<dyn EnvironmentRepository>,
    clock: Arc<dyn Clock>,
}

impl EnvironmentService {
    pub fn new(repository: Arc<dyn EnvironmentRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn create(&self, key: &str, name: &str, is_default: bool) -> Result<Environment> {
        let key = key.trim().to_lowercase();
        if key.is_empty() {
            return Err(Error::SlugRequired);
        }
        if self.repository.find_by_key(&key).await?.is_some() {
            return Err(Error::SlugExists {
                entity_type: "environment".to_string(),
                slug: key,
            });
        }

        if is_default {
            self.clear_default().await?;
        }

        let now = self.clock.now();
        self.repository
            .create(Environment {
                id: EnvironmentId::new(),
                key,
                name: name.to_string(),
                active: true,
                is_default,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn get(&self, id: EnvironmentId) -> Result<Environment> {
        self.repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity_type: "environment".to_string(),
                id: id.to_string(),
            })
    }

    pub async fn resolve_key(&self, key: &str) -> Result<Environment> {
        self.repository
            .find_by_key(&key.trim().to_lowercase())
            .await?
            .ok_or_else(|| Error::EnvironmentNotFound {
                key: key.to_string(),
            })
    }

    /// Fails with [`Error::EnvironmentInactive`] unless the environment is
    /// active; called at the top of every mutating content/page/block
    /// operation.
    pub async fn require_active(&self, id: EnvironmentId) -> Result<Environment> {
        let environment = self.get(id).await?;
        if !environment.active {
            return Err(Error::EnvironmentInactive {
                key: environment.key,
            });
        }
        Ok(environment)
    }

    pub async fn set_active(&self, id: EnvironmentId, active: bool) -> Result<Environment> {
        let mut environment = self.get(id).await?;
        environment.active = active;
        environment.updated_at = self.clock.now();
        self.repository.update(environment).await
    }

    async fn clear_default(&self) -> Result<()> {
        if let Some(mut current) = self.repository.find_default().await? {
            current.is_default = false;
            current.updated_at = self.clock.now();
            self.repository.update(current).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Service for EnvironmentService {
    fn name(&self) -> &str {
        "environment-service"
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

/// Resolves locale codes to stable ids; enumerates active locales for
/// translation-completeness checks in the content/page services.
pub struct LocaleService {
    repository: Arc<dyn LocaleRepository>,
    clock: Arc<dyn Clock>,
}

impl LocaleService {
    pub fn new(repository: Arc<dyn LocaleRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    pub async fn create(&self, code: &str, display: &str, is_default: bool) -> Result<Locale> {
        let code = Locale::fold_code(code);
        if code.is_empty() {
            return Err(Error::SlugRequired);
        }
        if self.repository.find_by_code(&code).await?.is_some() {
            return Err(Error::SlugExists {
                entity_type: "locale".to_string(),
                slug: code,
            });
        }

        if is_default {
            self.clear_default().await?;
        }

        let now = self.clock.now();
        self.repository
            .create(Locale {
                id: LocaleId::new(),
                code,
                display: display.to_string(),
                active: true,
                is_default,
                created_at: now,
                updated_at: now,
            })
            .await
    }

    pub async fn get(&self, id: LocaleId) -> Result<Locale> {
        self.repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| Error::NotFound {
                entity_type: "locale".to_string(),
                id: id.to_string(),
            })
    }

    /// Resolves a locale code, failing with [`Error::UnknownLocale`] (not
    /// `NotFound`) since callers pass raw user input here.
    pub async fn resolve_code(&self, code: &str) -> Result<Locale> {
        self.repository
            .find_by_code(code)
            .await?
            .ok_or_else(|| Error::UnknownLocale {
                code: code.to_string(),
            })
    }

    pub async fn list_active(&self) -> Result<Vec<Locale>> {
        self.repository.list_active().await
    }

    pub async fn default_locale(&self) -> Result<Option<Locale>> {
        self.repository.find_default().await
    }

    async fn clear_default(&self) -> Result<()> {
        if let Some(mut current) = self.repository.find_default().await? {
            current.is_default = false;
            current.updated_at = self.clock.now();
            self.repository.update(current).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Service for LocaleService {
    fn name(&self) -> &str {
        "locale-service"
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryEnvironmentRepository, InMemoryLocaleRepository};
    use ferrocms_core::SystemClock;

    fn environment_service() -> EnvironmentService {
        EnvironmentService::new(
            Arc::new(InMemoryEnvironmentRepository::new()),
            Arc::new(SystemClock),
        )
    }

    fn locale_service() -> LocaleService {
        LocaleService::new(
            Arc::new(InMemoryLocaleRepository::new()),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn resolves_a_known_environment_key() {
        let service = environment_service();
        let created = service.create("prod", "Production", true).await.unwrap();
        let resolved = service.resolve_key("prod").await.unwrap();
        assert_eq!(resolved.id, created.id);
    }

    #[tokio::test]
    async fn unknown_environment_key_is_not_found() {
        let service = environment_service();
        let err = service.resolve_key("missing").await.unwrap_err();
        assert!(matches!(err, Error::EnvironmentNotFound { .. }));
    }

    #[tokio::test]
    async fn inactive_environment_is_rejected_by_require_active() {
        let service = environment_service();
        let created = service.create("stage", "Staging", false).await.unwrap();
        service.set_active(created.id, false).await.unwrap();
        let err = service.require_active(created.id).await.unwrap_err();
        assert!(matches!(err, Error::EnvironmentInactive { .. }));
    }

    #[tokio::test]
    async fn only_one_environment_is_default_at_a_time() {
        let service = environment_service();
        let first = service.create("a", "A", true).await.unwrap();
        let second = service.create("b", "B", true).await.unwrap();

        let first_reloaded = service.get(first.id).await.unwrap();
        let second_reloaded = service.get(second.id).await.unwrap();
        assert!(!first_reloaded.is_default);
        assert!(second_reloaded.is_default);
    }

    #[tokio::test]
    async fn locale_codes_resolve_case_insensitively() {
        let service = locale_service();
        service.create("EN", "English", true).await.unwrap();
        let resolved = service.resolve_code("en").await.unwrap();
        assert_eq!(resolved.code, "en");
    }

    #[tokio::test]
    async fn only_one_locale_is_default_at_a_time() {
        let service = locale_service();
        let en = service.create("en", "English", true).await.unwrap();
        let es = service.create("es", "Spanish", true).await.unwrap();

        let en_reloaded = service.get(en.id).await.unwrap();
        let es_reloaded = service.get(es.id).await.unwrap();
        assert!(!en_reloaded.is_default);
        assert!(es_reloaded.is_default);
    }
}
