//! Subscriptions and subscription sets.
//!
//! A [`Subscription`] is the handle to one live registration. A
//! [`SubscriptionSet`] owns a group of them so that a whole rule group can be
//! switched off in one step without leaking a single registration.

use lumen_domain::id::SubscriptionId;

type Release = Box<dyn FnOnce()>;

/// Handle to one live registration on a state stream.
///
/// Releasing runs the registered cleanup exactly once. Dropping an
/// unreleased subscription releases it.
pub struct Subscription {
    id: SubscriptionId,
    release: Vec<Release>,
}

impl Subscription {
    /// Wrap a registration; `release` undoes it.
    pub fn new(id: SubscriptionId, release: impl FnOnce() + 'static) -> Self {
        Self {
            id,
            release: vec![Box::new(release)],
        }
    }

    /// A subscription with nothing to release.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            id: SubscriptionId::new(),
            release: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Attach extra cleanup, run after the registration itself is undone.
    #[must_use]
    pub fn on_release(mut self, cleanup: impl FnOnce() + 'static) -> Self {
        self.release.push(Box::new(cleanup));
        self
    }

    /// Undo the registration now.
    pub fn release(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        for release in std::mem::take(&mut self.release) {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &!self.release.is_empty())
            .finish()
    }
}

/// Owns zero or more subscriptions and releases them all at once.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    subscriptions: Vec<Subscription>,
    disposed: bool,
}

impl SubscriptionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a subscription.
    ///
    /// A disposed set does not accept new members: the subscription is
    /// released right away.
    pub fn add(&mut self, subscription: Subscription) {
        if self.disposed {
            subscription.release();
        } else {
            self.subscriptions.push(subscription);
        }
    }

    /// Release every owned subscription. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        for subscription in self.subscriptions.drain(..) {
            subscription.release();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Extend<Subscription> for SubscriptionSet {
    fn extend<T: IntoIterator<Item = Subscription>>(&mut self, iter: T) {
        for subscription in iter {
            self.add(subscription);
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counted(counter: &Rc<Cell<u32>>) -> Subscription {
        let counter = Rc::clone(counter);
        Subscription::new(SubscriptionId::new(), move || counter.set(counter.get() + 1))
    }

    #[test]
    fn should_release_once_when_released_explicitly() {
        let released = Rc::new(Cell::new(0));
        counted(&released).release();
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn should_release_when_dropped() {
        let released = Rc::new(Cell::new(0));
        drop(counted(&released));
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn should_run_extra_cleanup_after_release() {
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));
        let first = Rc::clone(&order);
        let second = Rc::clone(&order);
        Subscription::new(SubscriptionId::new(), move || first.borrow_mut().push("unsubscribe"))
            .on_release(move || second.borrow_mut().push("cleanup"))
            .release();
        assert_eq!(*order.borrow(), vec!["unsubscribe", "cleanup"]);
    }

    #[test]
    fn should_release_every_member_when_disposed() {
        let released = Rc::new(Cell::new(0));
        let mut set = SubscriptionSet::new();
        set.add(counted(&released));
        set.add(counted(&released));
        set.add(counted(&released));
        assert_eq!(set.len(), 3);

        set.dispose();

        assert_eq!(released.get(), 3);
        assert!(set.is_empty());
        assert!(set.is_disposed());
    }

    #[test]
    fn should_have_no_additional_effect_when_disposed_twice() {
        let released = Rc::new(Cell::new(0));
        let mut set = SubscriptionSet::new();
        set.add(counted(&released));
        set.dispose();
        set.dispose();
        assert_eq!(released.get(), 1);
    }

    #[test]
    fn should_release_immediately_when_adding_to_disposed_set() {
        let released = Rc::new(Cell::new(0));
        let mut set = SubscriptionSet::new();
        set.dispose();
        set.add(counted(&released));
        assert_eq!(released.get(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn should_dispose_when_dropped() {
        let released = Rc::new(Cell::new(0));
        {
            let mut set = SubscriptionSet::new();
            set.extend([counted(&released), counted(&released)]);
        }
        assert_eq!(released.get(), 2);
    }
}
