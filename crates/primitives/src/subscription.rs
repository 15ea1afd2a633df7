//! This module contains the core [`Subscription`] type that consumers use to observe events, and
//! the [`EventBus`] that feeds them.
use std::{
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use tokio::sync::mpsc;

/// A generic subscription type for event streams. It wraps an unbounded channel receiver
/// and implements [`futures::Stream`] for consuming events asynchronously.
#[derive(Debug)]
pub struct Subscription<T> {
    receiver: mpsc::UnboundedReceiver<T>,
}

impl<T> Subscription<T> {
    /// Creates a new subscription from an unbounded receiver.
    pub const fn from_receiver(receiver: mpsc::UnboundedReceiver<T>) -> Subscription<T> {
        Subscription { receiver }
    }

    /// Returns the number of messages in the backlog for this subscription.
    pub fn backlog(&self) -> usize {
        self.receiver.len()
    }

    /// Waits for the next event. Returns `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }
}

impl<T> futures::Stream for Subscription<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

/// A typed fan-out publisher.
///
/// Every published event is cloned to each live subscriber. Subscribers whose [`Subscription`]
/// has been dropped are pruned on the next publish. Publishing never blocks.
#[derive(Debug)]
pub struct EventBus<T> {
    subs: Arc<Mutex<Vec<mpsc::UnboundedSender<T>>>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            subs: self.subs.clone(),
        }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            subs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> EventBus<T> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Subscription<T> {
        let (send, recv) = mpsc::unbounded_channel();
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(send);

        Subscription::from_receiver(recv)
    }

    /// Sends `event` to every live subscriber.
    pub fn publish(&self, event: T) {
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|sub| sub.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last publish.
    pub fn num_subscribers(&self) -> usize {
        self.subs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_every_event_in_order() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(1);
        bus.publish(2);

        assert_eq!(a.backlog(), 2);
        assert_eq!(a.next().await, Some(1));
        assert_eq!(a.next().await, Some(2));
        assert_eq!(b.recv().await, Some(1));
        assert_eq!(b.recv().await, Some(2));
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let bus = EventBus::new();
        let keep = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.num_subscribers(), 2);

        bus.publish("x");
        assert_eq!(bus.num_subscribers(), 1);
        drop(keep);
    }

    #[tokio::test]
    async fn stream_ends_when_bus_is_dropped() {
        let bus = EventBus::<u8>::new();
        let mut sub = bus.subscribe();
        drop(bus);
        assert_eq!(sub.next().await, None);
    }
}
