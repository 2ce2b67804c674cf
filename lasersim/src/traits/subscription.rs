use auto_impl::auto_impl;

#[auto_impl(&, Box, Arc)]
pub trait SubscriptionSource {
    fn subscriber_count(&self) -> usize;

    fn is_subscribed(&self) -> bool {
        self.subscriber_count() > 0
    }
}
