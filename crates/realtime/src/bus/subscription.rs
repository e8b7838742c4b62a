use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use threadline_core::Comment;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

/// Receiving end of one live listener on a post.
///
/// The stream ends once the subscription is removed from the bus. Comments
/// already buffered at that point are still yielded.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    post_id: i64,
    receiver: mpsc::Receiver<Comment>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, post_id: i64, receiver: mpsc::Receiver<Comment>) -> Self {
        Self {
            id,
            post_id,
            receiver,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn post_id(&self) -> i64 {
        self.post_id
    }

    /// Waits for the next comment, `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Comment> {
        self.receiver.recv().await
    }

    /// Returns a buffered comment without waiting.
    pub fn try_recv(&mut self) -> Option<Comment> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Comment;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
