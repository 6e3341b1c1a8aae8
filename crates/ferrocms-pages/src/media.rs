//! Media resolution (§3.1): resolves a [`MediaBinding`] to a fully
//! described [`MediaAsset`]. Optional; the default implementation is a
//! no-op passthrough, matching the same "optional; no-op when absent" rule
//! widgets follow.

use async_trait::async_trait;
use ferrocms_blocks::MediaBinding;
use ferrocms_core::{EnvironmentId, Result};
use serde::{Deserialize, Serialize};

/// A resolved media reference. The no-op service simply echoes back the
/// binding's own `id`/`path` with no additional metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
    pub alt_text: Option<String>,
}

#[async_trait]
pub trait MediaService: Send + Sync {
    async fn resolve(&self, environment_id: EnvironmentId, binding: &MediaBinding) -> Result<MediaAsset>;
}

#[derive(Debug, Default)]
pub struct NoopMediaService;

#[async_trait]
impl MediaService for NoopMediaService {
    async fn resolve(&self, _environment_id: EnvironmentId, binding: &MediaBinding) -> Result<MediaAsset> {
        Ok(MediaAsset {
            id: binding.id.clone(),
            path: binding.path.clone(),
            url: None,
            alt_text: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_service_echoes_the_binding() {
        let svc = NoopMediaService;
        let binding = MediaBinding {
            id: Some("asset-1".to_string()),
            path: None,
        };
        let asset = svc.resolve(EnvironmentId::new(), &binding).await.unwrap();
        assert_eq!(asset.id.as_deref(), Some("asset-1"));
        assert!(asset.url.is_none());
    }
}
