//! In-memory repository implementations, the default test double and the
//! reference behavior the persistent implementations must match.

use async_trait::async_trait;
use dashmap::DashMap;
use ferrocms_core::{
    EnvironmentId, Error, LocaleId, ListParams, ListResult, QueryableRepository, Repository, Result,
};
use parking_lot::RwLock;

use crate::entities::{Environment, Locale};
use crate::repository::{EnvironmentRepository, LocaleRepository};

fn paginate<T: Clone>(mut items: Vec<T>, params: &ListParams) -> ListResult<T> {
    let total = items.len() as u64;
    let start = params.offset() as usize;
    let end = (start + params.per_page as usize).min(items.len());
    let page = if start < items.len() {
        items.drain(start..end).collect()
    } else {
        Vec::new()
    };
    ListResult::new(page, total, params)
}

/// In-memory [`EnvironmentRepository`] keyed by id, with a secondary index
/// on `key` for `find_by_key`.
#[derive(Default)]
pub struct InMemoryEnvironmentRepository {
    rows: DashMap<EnvironmentId, Environment>,
    by_key: RwLock<std::collections::HashMap<String, EnvironmentId>>,
}

impl InMemoryEnvironmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<Environment, EnvironmentId> for InMemoryEnvironmentRepository {
    async fn create(&self, entity: Environment) -> Result<Environment> {
        self.by_key
            .write()
            .insert(entity.key.clone(), entity.id);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &EnvironmentId) -> Result<Option<Environment>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: Environment) -> Result<Environment> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::NotFound {
                entity_type: "environment".to_string(),
                id: entity.id.to_string(),
            });
        }
        self.by_key
            .write()
            .insert(entity.key.clone(), entity.id);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &EnvironmentId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            self.by_key.write().remove(&entity.key);
        }
        Ok(())
    }

    async fn exists(&self, id: &EnvironmentId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl QueryableRepository<Environment, EnvironmentId> for InMemoryEnvironmentRepository {
    async fn list(&self, params: &ListParams) -> Result<ListResult<Environment>> {
        let items: Vec<Environment> = self.rows.iter().map(|r| r.clone()).collect();
        Ok(paginate(items, params))
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<Environment>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| match field {
                "key" => r.key == value,
                "name" => r.name == value,
                "active" => r.active.to_string() == value,
                _ => false,
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<Environment>> {
        Ok(self.find_by_field(field, value).await?.into_iter().next())
    }

    async fn search(&self, query: &str, params: &ListParams) -> Result<ListResult<Environment>> {
        let needle = query.to_lowercase();
        let items: Vec<Environment> = self
            .rows
            .iter()
            .filter(|r| {
                r.key.to_lowercase().contains(&needle) || r.name.to_lowercase().contains(&needle)
            })
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

#[async_trait]
impl EnvironmentRepository for InMemoryEnvironmentRepository {
    async fn find_by_key(&self, key: &str) -> Result<Option<Environment>> {
        let id = self.by_key.read().get(key).copied();
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn find_default(&self) -> Result<Option<Environment>> {
        Ok(self.rows.iter().find(|r| r.is_default).map(|r| r.clone()))
    }
}

/// In-memory [`LocaleRepository`] keyed by id, with a secondary index on
/// the case-folded `code` for `find_by_code`.
#[derive(Default)]
pub struct InMemoryLocaleRepository {
    rows: DashMap<LocaleId, Locale>,
    by_code: RwLock<std::collections::HashMap<String, LocaleId>>,
}

impl InMemoryLocaleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<Locale, LocaleId> for InMemoryLocaleRepository {
    async fn create(&self, entity: Locale) -> Result<Locale> {
        self.by_code
            .write()
            .insert(Locale::fold_code(&entity.code), entity.id);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn find_by_id(&self, id: &LocaleId) -> Result<Option<Locale>> {
        Ok(self.rows.get(id).map(|r| r.clone()))
    }

    async fn update(&self, entity: Locale) -> Result<Locale> {
        if !self.rows.contains_key(&entity.id) {
            return Err(Error::NotFound {
                entity_type: "locale".to_string(),
                id: entity.id.to_string(),
            });
        }
        self.by_code
            .write()
            .insert(Locale::fold_code(&entity.code), entity.id);
        self.rows.insert(entity.id, entity.clone());
        Ok(entity)
    }

    async fn delete(&self, id: &LocaleId) -> Result<()> {
        if let Some((_, entity)) = self.rows.remove(id) {
            self.by_code.write().remove(&Locale::fold_code(&entity.code));
        }
        Ok(())
    }

    async fn exists(&self, id: &LocaleId) -> Result<bool> {
        Ok(self.rows.contains_key(id))
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.rows.len() as u64)
    }
}

#[async_trait]
impl QueryableRepository<Locale, LocaleId> for InMemoryLocaleRepository {
    async fn list(&self, params: &ListParams) -> Result<ListResult<Locale>> {
        let items: Vec<Locale> = self.rows.iter().map(|r| r.clone()).collect();
        Ok(paginate(items, params))
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Vec<Locale>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| match field {
                "code" => r.code == value,
                "display" => r.display == value,
                "active" => r.active.to_string() == value,
                _ => false,
            })
            .map(|r| r.clone())
            .collect())
    }

    async fn find_one_by_field(&self, field: &str, value: &str) -> Result<Option<Locale>> {
        Ok(self.find_by_field(field, value).await?.into_iter().next())
    }

    async fn search(&self, query: &str, params: &ListParams) -> Result<ListResult<Locale>> {
        let needle = query.to_lowercase();
        let items: Vec<Locale> = self
            .rows
            .iter()
            .filter(|r| {
                r.code.to_lowercase().contains(&needle) || r.display.to_lowercase().contains(&needle)
            })
            .map(|r| r.clone())
            .collect();
        Ok(paginate(items, params))
    }
}

#[async_trait]
impl LocaleRepository for InMemoryLocaleRepository {
    async fn find_by_code(&self, code: &str) -> Result<Option<Locale>> {
        let id = self.by_code.read().get(&Locale::fold_code(code)).copied();
        match id {
            Some(id) => self.find_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn find_default(&self) -> Result<Option<Locale>> {
        Ok(self.rows.iter().find(|r| r.is_default).map(|r| r.clone()))
    }

    async fn list_active(&self) -> Result<Vec<Locale>> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.active)
            .map(|r| r.clone())
            .collect())
    }
}
