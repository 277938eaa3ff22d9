use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{channel::mpsc, FutureExt, Stream, StreamExt};

use crate::api::{CommentId, SortKey};

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ThreadEvent {
    /// The thread was (re)loaded from the store
    Refreshed,

    /// A single comment changed locally, or got confirmed or rolled back
    CommentChanged(CommentId),

    /// Someone asked for the reply/edit editor of this comment to be opened
    OpenEditor(CommentId),

    FetchFailed {
        sort: SortKey,
        term: Option<String>,
    },
}

/// Notifications scoped to one thread view.
///
/// Subscribers are dropped from the bus on the first publish after they unsubscribed, and all
/// subscriptions end when the bus itself is dropped with its view.
#[derive(Debug, Default)]
pub struct ThreadBus {
    subscribers: Vec<mpsc::UnboundedSender<ThreadEvent>>,
}

impl ThreadBus {
    pub fn new() -> ThreadBus {
        ThreadBus::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = mpsc::unbounded();
        self.subscribers.push(sender);
        Subscription { receiver }
    }

    pub fn publish(&mut self, e: ThreadEvent) {
        tracing::trace!(evt = ?e, "publishing thread event");
        self.subscribers
            .retain(|s| matches!(s.unbounded_send(e.clone()), Ok(())));
    }

    pub fn num_subscribers(&self) -> usize {
        self.subscribers.iter().filter(|s| !s.is_closed()).count()
    }
}

#[derive(Debug)]
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<ThreadEvent>,
}

impl Subscription {
    /// Next already-published event, if any
    pub fn try_next(&mut self) -> Option<ThreadEvent> {
        self.receiver.next().now_or_never().flatten()
    }

    /// Drains every already-published event
    pub fn drain(&mut self) -> Vec<ThreadEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }

    pub fn unsubscribe(mut self) {
        self.receiver.close();
    }
}

impl Stream for Subscription {
    type Item = ThreadEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<ThreadEvent>> {
        self.receiver.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_gets_every_event() {
        let mut bus = ThreadBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(ThreadEvent::Refreshed);
        bus.publish(ThreadEvent::OpenEditor(CommentId::from("1")));
        let expected = vec![
            ThreadEvent::Refreshed,
            ThreadEvent::OpenEditor(CommentId::from("1")),
        ];
        assert_eq!(a.drain(), expected);
        assert_eq!(b.drain(), expected);
        assert_eq!(a.try_next(), None);
    }

    #[test]
    fn unsubscribed_receivers_are_forgotten() {
        let mut bus = ThreadBus::new();
        let a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.num_subscribers(), 2);
        a.unsubscribe();
        assert_eq!(bus.num_subscribers(), 1);
        bus.publish(ThreadEvent::Refreshed);
        assert_eq!(bus.subscribers.len(), 1);
        assert_eq!(b.drain(), vec![ThreadEvent::Refreshed]);
    }

    #[test]
    fn dropping_the_bus_ends_streams() {
        let mut bus = ThreadBus::new();
        let mut a = bus.subscribe();
        bus.publish(ThreadEvent::Refreshed);
        drop(bus);
        let events = futures::executor::block_on(async move {
            let mut events = Vec::new();
            while let Some(e) = a.next().await {
                events.push(e);
            }
            events
        });
        assert_eq!(events, vec![ThreadEvent::Refreshed]);
    }
}
