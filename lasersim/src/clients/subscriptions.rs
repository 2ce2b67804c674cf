use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use crate::traits::SubscriptionSource;

/// Shared subscriber counter. Clones observe the same count.
#[derive(Debug, Clone, Default)]
pub struct Subscriptions {
    count: Arc<AtomicUsize>,
}

impl Subscriptions {
    pub fn new(count: usize) -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(count)),
        }
    }

    /// Returns the number of subscribers after subscribing.
    pub fn subscribe(&self) -> usize {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns the number of subscribers after unsubscribing. Never goes
    /// below zero.
    pub fn unsubscribe(&self) -> usize {
        let prev = self
            .count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                Some(n.saturating_sub(1))
            })
            .unwrap_or_default();
        prev.saturating_sub(1)
    }

    pub fn set(&self, count: usize) {
        self.count.store(count, Ordering::SeqCst);
    }
}

impl SubscriptionSource for Subscriptions {
    fn subscriber_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_unsubscribe() {
        let subs = Subscriptions::default();
        assert!(!subs.is_subscribed());
        let handle = subs.clone();
        assert_eq!(handle.subscribe(), 1);
        assert_eq!(handle.subscribe(), 2);
        assert!(subs.is_subscribed());
        assert_eq!(subs.unsubscribe(), 1);
        assert_eq!(subs.unsubscribe(), 0);
        assert_eq!(subs.unsubscribe(), 0);
        assert_eq!(subs.subscriber_count(), 0);
        subs.set(3);
        assert_eq!(handle.subscriber_count(), 3);
    }
}
