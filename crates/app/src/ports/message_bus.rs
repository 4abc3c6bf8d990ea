//! Message bus port — the bridge to the hardware's publish/subscribe bus.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

/// One inbound bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMessage {
    /// Exact topic the message arrived on.
    pub topic: String,
    /// Decoded payload.
    pub payload: String,
}

/// Async callback registered for a topic.
///
/// Callbacks for the same message run concurrently; a failing callback is
/// logged by the bus and never affects its peers or the connection.
pub type TopicCallback = Arc<dyn Fn(TopicMessage) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Multiplexes one physical bus connection into many topic subscriptions.
///
/// Matching is by exact topic at this layer — drivers subscribe to each
/// concrete topic they care about. Several drivers may subscribe to the same
/// topic; all of them see every message, in no particular relative order.
pub trait MessageBus: Send + Sync {
    /// Register a callback for an exact topic. Insertion order per topic is
    /// preserved.
    fn subscribe(&self, topic: &str, callback: TopicCallback);

    /// Forward an outgoing command to the hardware bus.
    fn publish(&self, topic: &str, payload: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: MessageBus> MessageBus for Arc<T> {
    fn subscribe(&self, topic: &str, callback: TopicCallback) {
        (**self).subscribe(topic, callback);
    }

    fn publish(&self, topic: &str, payload: &str) -> impl Future<Output = anyhow::Result<()>> + Send {
        (**self).publish(topic, payload)
    }
}
