use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use threadline_core::Comment;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, RwLock};

use super::config::DEFAULT_BUFFER_SIZE;
use super::{BusConfig, BusError, Subscription, SubscriptionId};

/// Fans newly created comments out to live listeners, grouped by post.
///
/// Each listener owns a bounded buffer. Publishing never waits on a listener:
/// when a buffer is full the comment is dropped for that listener only.
pub struct CommentBus {
    buffer_size: usize,
    next_subscription_id: AtomicU64,
    state: RwLock<BusState>,
}

impl CommentBus {
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        let buffer_size = if config.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            config.buffer_size
        };
        Self {
            buffer_size,
            next_subscription_id: AtomicU64::new(1),
            state: RwLock::new(BusState {
                topics: HashMap::new(),
                subscription_topic: HashMap::new(),
                watchers: HashMap::new(),
            }),
        }
    }

    /// Registers a listener on `post_id`.
    ///
    /// Every publish that starts after this returns is offered to the new
    /// subscription.
    pub async fn subscribe(&self, post_id: i64) -> Subscription {
        let (subscription, _sender) = self.register(post_id).await;
        subscription
    }

    /// Registers a listener whose lifetime ends when `lifetime` completes.
    ///
    /// A background task waits for `lifetime` (or for the subscription to be
    /// dropped) and then unsubscribes it, which ends the stream. An explicit
    /// [`CommentBus::unsubscribe`] also stops the task, so the stream ends
    /// either way. A lifetime
    /// that has already completed yields a subscription that is closed from
    /// the start.
    pub async fn subscribe_until<F>(self: &Arc<Self>, post_id: i64, lifetime: F) -> Subscription
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut lifetime = Box::pin(lifetime);
        if (&mut lifetime).now_or_never().is_some() {
            let id = self.allocate_id();
            let (_, receiver) = mpsc::channel(1);
            return Subscription::new(id, post_id, receiver);
        }

        let (subscription, sender) = self.register(post_id).await;
        let subscription_id = subscription.id();
        let (detach, detached) = oneshot::channel::<()>();
        self.state
            .write()
            .await
            .watchers
            .insert(subscription_id, detach);

        let bus = Arc::clone(self);
        tokio::spawn(async move {
            tokio::select! {
                () = lifetime => {}
                () = sender.closed() => {}
                _ = detached => {}
            }
            drop(sender);
            let _ = bus.unsubscribe(subscription_id).await;
        });
        subscription
    }

    /// Removes a listener. Its stream ends after any buffered comments and no
    /// later publish reaches it.
    pub async fn unsubscribe(&self, subscription_id: SubscriptionId) -> Result<(), BusError> {
        let mut state = self.state.write().await;
        match state.remove_subscription(subscription_id) {
            Some(post_id) => {
                tracing::debug!(
                    post_id,
                    subscription = subscription_id.0,
                    "comment listener removed"
                );
                Ok(())
            }
            None => Err(BusError::SubscriptionNotFound),
        }
    }

    /// Offers `comment` to every listener of `post_id` and returns how many
    /// accepted it.
    pub async fn publish(&self, post_id: i64, comment: &Comment) -> usize {
        let mut delivered_count = 0;
        let mut dropped_count = 0;
        let mut stale_subscriptions = Vec::new();

        {
            let state = self.state.read().await;
            let Some(listeners) = state.topics.get(&post_id) else {
                return 0;
            };
            for (subscription_id, sender) in listeners {
                match sender.try_send(comment.clone()) {
                    Ok(()) => delivered_count += 1,
                    Err(TrySendError::Full(_)) => dropped_count += 1,
                    Err(TrySendError::Closed(_)) => stale_subscriptions.push(*subscription_id),
                }
            }
        }

        if !stale_subscriptions.is_empty() {
            let mut state = self.state.write().await;
            for subscription_id in stale_subscriptions {
                let _ = state.remove_subscription(subscription_id);
            }
        }

        tracing::debug!(
            post_id,
            comment_id = comment.id,
            delivered = delivered_count,
            dropped = dropped_count,
            "comment published"
        );
        delivered_count
    }

    pub async fn listener_count(&self, post_id: i64) -> usize {
        let state = self.state.read().await;
        state.topics.get(&post_id).map_or(0, HashMap::len)
    }

    pub async fn topic_count(&self) -> usize {
        let state = self.state.read().await;
        state.topics.len()
    }

    async fn register(&self, post_id: i64) -> (Subscription, mpsc::Sender<Comment>) {
        let (sender, receiver) = mpsc::channel(self.buffer_size);
        let subscription_id = self.allocate_id();
        {
            let mut state = self.state.write().await;
            state
                .topics
                .entry(post_id)
                .or_default()
                .insert(subscription_id, sender.clone());
            state.subscription_topic.insert(subscription_id, post_id);
        }
        tracing::debug!(
            post_id,
            subscription = subscription_id.0,
            "comment listener added"
        );
        (Subscription::new(subscription_id, post_id, receiver), sender)
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_subscription_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CommentBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

struct BusState {
    topics: HashMap<i64, HashMap<SubscriptionId, mpsc::Sender<Comment>>>,
    subscription_topic: HashMap<SubscriptionId, i64>,
    /// Teardown tasks of `subscribe_until` listeners; dropping the sender
    /// releases the task's handle on the channel.
    watchers: HashMap<SubscriptionId, oneshot::Sender<()>>,
}

impl BusState {
    /// Drops the listener's sender and prunes its topic when it was the last
    /// one. Returns the post the listener was attached to.
    fn remove_subscription(&mut self, subscription_id: SubscriptionId) -> Option<i64> {
        self.watchers.remove(&subscription_id);
        let post_id = self.subscription_topic.remove(&subscription_id)?;
        if let Some(listeners) = self.topics.get_mut(&post_id) {
            listeners.remove(&subscription_id);
            if listeners.is_empty() {
                self.topics.remove(&post_id);
            }
        }
        Some(post_id)
    }
}
