//! Activity subscribers and handlers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use ferrocms_core::Result;

use crate::activity::Activity;

/// Activity handler function type.
pub type HandlerFn =
    Arc<dyn Fn(Arc<Activity>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Activity handler trait, for subscribers that want a named type rather
/// than a closure.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    async fn handle(&self, activity: Arc<Activity>) -> Result<()>;

    /// Channels this handler is interested in.
    fn channels(&self) -> Vec<String>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn is_async(&self) -> bool {
        false
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub channels: Vec<String>,
    pub async_handler: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub priority: i32,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            channels: Vec::new(),
            async_handler: false,
            max_retries: 3,
            retry_delay_ms: 1000,
            priority: 0,
        }
    }
}

impl SubscriberConfig {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }

    pub fn async_handler(mut self) -> Self {
        self.async_handler = true;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, delay_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// An activity subscriber: a named handler bound to one or more channels.
pub struct Subscriber {
    pub config: SubscriberConfig,
    pub handler: HandlerFn,
    pub name: String,
}

impl Subscriber {
    pub fn new<F, Fut>(name: impl Into<String>, config: SubscriberConfig, handler: F) -> Self
    where
        F: Fn(Arc<Activity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            config,
            handler: Arc::new(move |activity| Box::pin(handler(activity))),
        }
    }

    pub fn for_channel<F, Fut>(channel: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Arc<Activity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let channel = channel.into();
        let name = format!("subscriber_{channel}");
        let config = SubscriberConfig::new(vec![channel]);
        Self::new(name, config, handler)
    }

    pub fn for_channels<F, Fut>(channels: Vec<String>, handler: F) -> Self
    where
        F: Fn(Arc<Activity>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = format!("subscriber_multi_{}", channels.len());
        let config = SubscriberConfig::new(channels);
        Self::new(name, config, handler)
    }

    /// Handles the activity with retry; logs and gives up after
    /// `max_retries` rather than propagating (emission is best-effort,
    /// §5/§7: activity emission failures are logged, never fatal).
    pub async fn handle(&self, activity: Arc<Activity>) {
        let mut attempts = 0;

        loop {
            match (self.handler)(activity.clone()).await {
                Ok(()) => return,
                Err(e) if attempts < self.config.max_retries => {
                    attempts += 1;
                    tracing::warn!(
                        subscriber = %self.name,
                        channel = %activity.channel,
                        attempt = attempts,
                        error = %e,
                        "activity handler failed, retrying"
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(
                        self.config.retry_delay_ms * attempts as u64,
                    ))
                    .await;
                }
                Err(e) => {
                    tracing::error!(
                        subscriber = %self.name,
                        channel = %activity.channel,
                        attempts = attempts,
                        error = %e,
                        "activity handler failed after max retries, dropping"
                    );
                    return;
                }
            }
        }
    }

    pub fn handles(&self, channel: &str) -> bool {
        self.config.channels.iter().any(|c| c == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityVerb, ObjectType};
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    #[tokio::test]
    async fn subscriber_handles_only_its_channel() {
        let sub = Subscriber::for_channel("content", |_| async { Ok(()) });
        assert!(sub.handles("content"));
        assert!(!sub.handles("page"));
    }

    #[tokio::test]
    async fn handler_runs_on_dispatch() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let sub = Subscriber::for_channel("content", move |_| {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let activity = Arc::new(Activity::new(ActivityVerb::Create, ObjectType::Content, Uuid::new_v4()));
        sub.handle(activity).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_handler_is_dropped_after_retries_exhausted() {
        let sub = Subscriber::new(
            "failing",
            SubscriberConfig::new(vec!["content".to_string()]).with_retries(0, 1),
            |_| async { Err(ferrocms_core::Error::internal("boom")) },
        );

        let activity = Arc::new(Activity::new(ActivityVerb::Create, ObjectType::Content, Uuid::new_v4()));
        sub.handle(activity).await;
    }
}
