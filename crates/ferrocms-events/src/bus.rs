//! The activity emitter: the optional fan-out hook every content, page,
//! and block mutation notifies on success (§2, §5, §6).

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::activity::Activity;
use crate::subscriber::Subscriber;

/// Emitter configuration.
#[derive(Debug, Clone)]
pub struct ActivityEmitterConfig {
    pub max_history: usize,
    pub enable_history: bool,
    pub broadcast_capacity: usize,
}

impl Default for ActivityEmitterConfig {
    fn default() -> Self {
        Self {
            max_history: 1000,
            enable_history: false,
            broadcast_capacity: 1024,
        }
    }
}

/// Fans activities out to channel subscribers and to a broadcast channel
/// for external listeners. Emission is best-effort: a subscriber failure
/// is logged by [`Subscriber::handle`] and never surfaces to the caller —
/// per §7, activity emission failures must never fail the mutation that
/// produced them.
pub struct ActivityEmitter {
    subscribers: DashMap<String, Vec<Arc<Subscriber>>>,
    broadcast_tx: broadcast::Sender<Arc<Activity>>,
    history: Option<RwLock<Vec<Arc<Activity>>>>,
    config: ActivityEmitterConfig,
}

impl ActivityEmitter {
    pub fn new() -> Self {
        Self::with_config(ActivityEmitterConfig::default())
    }

    pub fn with_config(config: ActivityEmitterConfig) -> Self {
        let (broadcast_tx, _) = broadcast::channel(config.broadcast_capacity);
        let history = config.enable_history.then(|| RwLock::new(Vec::new()));

        Self {
            subscribers: DashMap::new(),
            broadcast_tx,
            history,
            config,
        }
    }

    pub fn subscribe(&self, subscriber: Subscriber) -> &Self {
        let subscriber = Arc::new(subscriber);

        for channel in &subscriber.config.channels {
            self.subscribers
                .entry(channel.clone())
                .or_default()
                .push(subscriber.clone());
        }

        for mut entry in self.subscribers.iter_mut() {
            entry
                .value_mut()
                .sort_by(|a, b| b.config.priority.cmp(&a.config.priority));
        }

        self
    }

    pub fn unsubscribe(&self, name: &str) {
        for mut entry in self.subscribers.iter_mut() {
            entry.value_mut().retain(|s| s.name != name);
        }
    }

    /// Emits a single activity. Never returns an error: subscriber
    /// failures are logged and dropped, matching the best-effort emission
    /// policy (§5, §7).
    pub async fn emit(&self, activity: Activity) {
        let activity = Arc::new(activity);

        tracing::debug!(
            channel = %activity.channel,
            verb = %activity.verb,
            object_type = %activity.object_type,
            object_id = %activity.object_id,
            "emitting activity"
        );

        if let Some(history) = &self.history {
            let mut h = history.write();
            h.push(activity.clone());
            if h.len() > self.config.max_history {
                h.remove(0);
            }
        }

        let subscribers = self
            .subscribers
            .get(&activity.channel)
            .map(|s| s.clone())
            .unwrap_or_default();

        for subscriber in subscribers.iter().filter(|s| !s.config.async_handler) {
            subscriber.handle(activity.clone()).await;
        }

        let async_subscribers: Vec<_> = subscribers
            .iter()
            .filter(|s| s.config.async_handler)
            .cloned()
            .collect();

        if !async_subscribers.is_empty() {
            let activity_clone = activity.clone();
            tokio::spawn(async move {
                for subscriber in async_subscribers {
                    subscriber.handle(activity_clone.clone()).await;
                }
            });
        }

        let _ = self.broadcast_tx.send(activity);
    }

    pub async fn emit_all(&self, activities: Vec<Activity>) {
        for activity in activities {
            self.emit(activity).await;
        }
    }

    pub fn subscribe_broadcast(&self) -> broadcast::Receiver<Arc<Activity>> {
        self.broadcast_tx.subscribe()
    }

    pub fn history(&self) -> Vec<Arc<Activity>> {
        self.history
            .as_ref()
            .map(|h| h.read().clone())
            .unwrap_or_default()
    }

    pub fn history_for_channel(&self, channel: &str) -> Vec<Arc<Activity>> {
        self.history()
            .into_iter()
            .filter(|a| a.channel == channel)
            .collect()
    }

    pub fn clear_history(&self) {
        if let Some(history) = &self.history {
            history.write().clear();
        }
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.subscribers.get(channel).map(|s| s.len()).unwrap_or(0)
    }

    pub fn channels(&self) -> Vec<String> {
        self.subscribers.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for ActivityEmitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`ActivityEmitter`].
pub struct ActivityEmitterBuilder {
    config: ActivityEmitterConfig,
    subscribers: Vec<Subscriber>,
}

impl ActivityEmitterBuilder {
    pub fn new() -> Self {
        Self {
            config: ActivityEmitterConfig::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn with_history(mut self, max_size: usize) -> Self {
        self.config.enable_history = true;
        self.config.max_history = max_size;
        self
    }

    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.config.broadcast_capacity = capacity;
        self
    }

    pub fn subscriber(mut self, subscriber: Subscriber) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn build(self) -> ActivityEmitter {
        let emitter = ActivityEmitter::with_config(self.config);
        for subscriber in self.subscribers {
            emitter.subscribe(subscriber);
        }
        emitter
    }
}

impl Default for ActivityEmitterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{ActivityVerb, ObjectType};
    use std::sync::atomic::{AtomicU32, Ordering};
    use uuid::Uuid;

    #[tokio::test]
    async fn subscribers_on_the_matching_channel_are_invoked() {
        let emitter = ActivityEmitter::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        emitter.subscribe(Subscriber::for_channel("content", move |_| {
            let c = counter_clone.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        emitter
            .emit(Activity::new(ActivityVerb::Publish, ObjectType::Content, Uuid::new_v4()))
            .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn history_records_emitted_activities() {
        let emitter = ActivityEmitterBuilder::new().with_history(10).build();

        for _ in 0..5 {
            emitter
                .emit(Activity::new(ActivityVerb::Create, ObjectType::Page, Uuid::new_v4()))
                .await;
        }

        assert_eq!(emitter.history().len(), 5);
    }

    #[tokio::test]
    async fn unsubscribe_stops_future_dispatch() {
        let emitter = ActivityEmitter::new();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        emitter.subscribe(Subscriber::new(
            "content_sub",
            crate::subscriber::SubscriberConfig::new(vec!["content".to_string()]),
            move |_| {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        ));

        emitter
            .emit(Activity::new(ActivityVerb::Create, ObjectType::Content, Uuid::new_v4()))
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        emitter.unsubscribe("content_sub");

        emitter
            .emit(Activity::new(ActivityVerb::Create, ObjectType::Content, Uuid::new_v4()))
            .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn broadcast_receiver_observes_emitted_activities() {
        let emitter = ActivityEmitter::new();
        let mut receiver = emitter.subscribe_broadcast();

        emitter
            .emit(Activity::new(ActivityVerb::Update, ObjectType::Page, Uuid::new_v4()))
            .await;

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.verb, ActivityVerb::Update);
    }
}
