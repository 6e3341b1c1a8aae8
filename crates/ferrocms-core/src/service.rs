//! Service layer traits and abstractions shared by the content, page, and
//! block services: health reporting and the pagination envelope used by
//! every `list`/`search` operation.

use crate::error::Result;
use async_trait::async_trait;

/// Base trait for all services
#[async_trait]
pub trait Service: Send + Sync {
    /// Service name for logging and identification
    fn name(&self) -> &str;

    /// Initialize the service
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    /// Shutdown the service gracefully
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Health check for this service
    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy(self.name()))
    }
}

/// Health status of a service
#[derive(Debug, Clone)]
pub struct ServiceHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub latency_ms: Option<u64>,
}

impl ServiceHealth {
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: None,
            latency_ms: None,
        }
    }

    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            latency_ms: None,
        }
    }

    pub fn degraded(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            latency_ms: None,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Parameters for listing entities
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub page: u32,
    pub per_page: u32,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub search: Option<String>,
}

impl ListParams {
    pub fn new() -> Self {
        Self {
            page: 1,
            per_page: 20,
            sort_by: None,
            sort_order: SortOrder::Desc,
            search: None,
        }
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>) -> Self {
        self.sort_by = Some(field.into());
        self
    }

    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = order;
        self
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn offset(&self) -> u32 {
        (self.page.saturating_sub(1)) * self.per_page
    }
}

/// Sort order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Result of a list operation
#[derive(Debug, Clone)]
pub struct ListResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: u32,
}

impl<T> ListResult<T> {
    pub fn new(items: Vec<T>, total: u64, params: &ListParams) -> Self {
        let total_pages = (total as f64 / params.per_page as f64).ceil() as u32;
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            total_pages,
        }
    }

    pub fn empty(params: &ListParams) -> Self {
        Self {
            items: Vec::new(),
            total: 0,
            page: params.page,
            per_page: params.per_page,
            total_pages: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> ListResult<U> {
        ListResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_params() {
        let params = ListParams::new()
            .page(2)
            .per_page(10)
            .sort_by("created_at")
            .sort_order(SortOrder::Asc);

        assert_eq!(params.page, 2);
        assert_eq!(params.per_page, 10);
        assert_eq!(params.offset(), 10);
    }

    #[test]
    fn test_list_result() {
        let params = ListParams::new().page(1).per_page(10);
        let result: ListResult<i32> = ListResult::new(vec![1, 2, 3], 25, &params);

        assert_eq!(result.total_pages, 3);
        assert!(result.has_next());
        assert!(!result.has_prev());
    }
}
