//! Widget resolution (§3.1): turns the opaque [`WidgetPlacement`] records a
//! page snapshot carries per area into fully resolved [`ResolvedWidget`]
//! payloads. Optional; the default implementation is a no-op returning no
//! widgets, matching "optional; no-op when absent" (§4.4).

use async_trait::async_trait;
use ferrocms_core::{EnvironmentId, Result};

use crate::entities::{ResolvedWidget, WidgetPlacement};

#[async_trait]
pub trait WidgetService: Send + Sync {
    async fn resolve(&self, environment_id: EnvironmentId, placements: &[WidgetPlacement]) -> Result<Vec<ResolvedWidget>>;
}

/// The default no-op widget service: every placement resolves to nothing.
#[derive(Debug, Default)]
pub struct NoopWidgetService;

#[async_trait]
impl WidgetService for NoopWidgetService {
    async fn resolve(&self, _environment_id: EnvironmentId, _placements: &[WidgetPlacement]) -> Result<Vec<ResolvedWidget>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_service_resolves_nothing() {
        let svc = NoopWidgetService;
        let placements = vec![WidgetPlacement {
            area: "sidebar".to_string(),
            widget_ref: "recent-posts".to_string(),
            position: 0,
        }];
        let resolved = svc.resolve(EnvironmentId::new(), &placements).await.unwrap();
        assert!(resolved.is_empty());
    }
}
