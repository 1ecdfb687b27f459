#![forbid(unsafe_code)]

//! Lazily-activated subscriber lists with RAII unsubscription.
//!
//! # Design
//!
//! A [`Publisher<E>`] keeps an ordered list of callbacks. A type that owns
//! one implements [`LazySource`] to get activation hooks:
//!
//! - `on_activate` runs when the subscriber count goes from 0 to 1.
//! - `on_deactivate` runs when it returns to 0.
//! - `on_subscribed` runs for every new subscriber, after activation, and
//!   may deliver an initial event to that subscriber only.
//!
//! [`subscribe`] returns a [`Subscription`] guard. The guard keeps its source
//! alive and detaches the callback when dropped.
//!
//! # Failure Modes
//!
//! - **Reentrant subscribe/unsubscribe**: allowed. `publish()` snapshots the
//!   list first. A subscriber added during a publish is not called until the
//!   next one. A subscriber removed during a publish is skipped if it has not
//!   been reached yet.
//! - **Panicking callback**: propagates to the caller of `publish()`.
//!   Remaining subscribers are not called for that event.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

/// Identifier of one subscriber within a [`Publisher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback<E> = Rc<dyn Fn(&E)>;

struct Subscriber<E> {
    id: SubscriberId,
    callback: Callback<E>,
}

/// Ordered subscriber list.
pub struct Publisher<E> {
    subscribers: RefCell<Vec<Subscriber<E>>>,
    next_id: Cell<u64>,
}

impl<E> Default for Publisher<E> {
    fn default() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<E> fmt::Debug for Publisher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<E> Publisher<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback. Returns its id and whether it is the first one.
    fn add(&self, callback: Callback<E>) -> (SubscriberId, bool) {
        let id = SubscriberId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.push(Subscriber { id, callback });
        (id, subscribers.len() == 1)
    }

    /// Remove a callback. Returns true if it was removed and the list is now
    /// empty.
    fn remove(&self, id: SubscriberId) -> bool {
        let (removed, now_empty) = {
            let mut subscribers = self.subscribers.borrow_mut();
            match subscribers.iter().position(|s| s.id == id) {
                Some(pos) => (Some(subscribers.remove(pos)), subscribers.is_empty()),
                None => (None, false),
            }
        };
        // Dropped outside the borrow: the closure may own other guards.
        let was_removed = removed.is_some();
        drop(removed);
        was_removed && now_empty
    }

    fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.borrow().iter().any(|s| s.id == id)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.borrow().is_empty()
    }

    /// Call every current subscriber in registration order.
    pub fn publish(&self, event: &E) {
        let snapshot: Vec<Weak<dyn Fn(&E)>> = self
            .subscribers
            .borrow()
            .iter()
            .map(|s| Rc::downgrade(&s.callback))
            .collect();

        for weak in snapshot {
            if let Some(callback) = weak.upgrade() {
                callback(event);
            }
        }
    }
}

/// A source of events with lazy activation.
pub trait LazySource: 'static {
    type Event: 'static;

    fn publisher(&self) -> &Publisher<Self::Event>;

    /// First subscriber arrived.
    fn on_activate(&self) {}

    /// Last subscriber left.
    fn on_deactivate(&self) {}

    /// A subscriber attached. Runs after `on_activate`.
    fn on_subscribed(&self, _callback: &dyn Fn(&Self::Event)) {}
}

trait Detach {
    fn detach(&self, id: SubscriberId);
    fn is_attached(&self, id: SubscriberId) -> bool;
}

impl<S: LazySource> Detach for S {
    fn detach(&self, id: SubscriberId) {
        if self.publisher().remove(id) {
            self.on_deactivate();
        }
    }

    fn is_attached(&self, id: SubscriberId) -> bool {
        self.publisher().contains(id)
    }
}

/// Attach `callback` to `source`, activating it if this is the first
/// subscriber.
pub fn subscribe<S: LazySource>(
    source: &Rc<S>,
    callback: impl Fn(&S::Event) + 'static,
) -> Subscription {
    let callback: Callback<S::Event> = Rc::new(callback);
    let (id, first) = source.publisher().add(Rc::clone(&callback));
    if first {
        source.on_activate();
    }
    source.on_subscribed(&*callback);
    let detach: Rc<dyn Detach> = Rc::clone(source) as Rc<dyn Detach>;
    Subscription {
        source: Some(detach),
        id,
    }
}

/// RAII guard for a subscriber callback.
///
/// Holds its source strongly. Dropping the guard (or calling
/// [`unsubscribe`](Self::unsubscribe)) detaches the callback immediately and
/// deactivates the source if it was the last subscriber.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    source: Option<Rc<dyn Detach>>,
    id: SubscriberId,
}

impl Subscription {
    /// Detach now.
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    /// Whether the callback is still attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.source
            .as_ref()
            .is_some_and(|source| source.is_attached(self.id))
    }

    #[must_use]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    fn detach(&mut self) {
        if let Some(source) = self.source.take() {
            source.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Probe {
        publisher: Publisher<i32>,
        activations: Cell<u32>,
        deactivations: Cell<u32>,
        replay: Option<i32>,
    }

    impl LazySource for Probe {
        type Event = i32;

        fn publisher(&self) -> &Publisher<i32> {
            &self.publisher
        }

        fn on_activate(&self) {
            self.activations.set(self.activations.get() + 1);
        }

        fn on_deactivate(&self) {
            self.deactivations.set(self.deactivations.get() + 1);
        }

        fn on_subscribed(&self, callback: &dyn Fn(&i32)) {
            if let Some(v) = self.replay {
                callback(&v);
            }
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<i32>>>, impl Fn(&i32) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_clone = Rc::clone(&log);
        (log, move |v: &i32| log_clone.borrow_mut().push(*v))
    }

    #[test]
    fn activation_is_reference_counted() {
        let probe = Rc::new(Probe::default());
        let a = subscribe(&probe, |_| {});
        let b = subscribe(&probe, |_| {});
        assert_eq!(probe.activations.get(), 1);

        drop(a);
        assert_eq!(probe.deactivations.get(), 0);
        drop(b);
        assert_eq!(probe.deactivations.get(), 1);

        let _c = subscribe(&probe, |_| {});
        assert_eq!(probe.activations.get(), 2);
    }

    #[test]
    fn publish_in_registration_order() {
        let probe = Rc::new(Probe::default());
        let log = Rc::new(RefCell::new(Vec::new()));
        let subs: Vec<Subscription> = (0..3)
            .map(|i| {
                let log = Rc::clone(&log);
                subscribe(&probe, move |v: &i32| log.borrow_mut().push((i, *v)))
            })
            .collect();

        probe.publisher().publish(&7);
        assert_eq!(*log.borrow(), vec![(0, 7), (1, 7), (2, 7)]);
        drop(subs);
    }

    #[test]
    fn replay_reaches_only_new_subscriber() {
        let probe = Rc::new(Probe {
            replay: Some(5),
            ..Probe::default()
        });
        let (first_log, first) = recorder();
        let _a = subscribe(&probe, first);
        let (second_log, second) = recorder();
        let _b = subscribe(&probe, second);

        assert_eq!(*first_log.borrow(), vec![5]);
        assert_eq!(*second_log.borrow(), vec![5]);
    }

    #[test]
    fn unsubscribe_during_publish_skips_removed_subscriber() {
        let probe = Rc::new(Probe::default());
        let victim_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&victim_slot);
        let _killer = subscribe(&probe, move |_| {
            slot.borrow_mut().take();
        });
        let (victim_log, victim) = recorder();
        *victim_slot.borrow_mut() = Some(subscribe(&probe, victim));

        probe.publisher().publish(&1);
        assert!(victim_log.borrow().is_empty());
        assert_eq!(probe.publisher().subscriber_count(), 1);
    }

    #[test]
    fn subscribe_during_publish_waits_for_next_event() {
        let probe = Rc::new(Probe::default());
        let (late_log, late) = recorder();
        let late = Rc::new(late);
        let held: Rc<RefCell<Vec<Subscription>>> = Rc::new(RefCell::new(Vec::new()));

        let probe_clone = Rc::clone(&probe);
        let held_clone = Rc::clone(&held);
        let _adder = subscribe(&probe, move |_| {
            if held_clone.borrow().is_empty() {
                let late = Rc::clone(&late);
                let sub = subscribe(&probe_clone, move |v: &i32| (*late)(v));
                held_clone.borrow_mut().push(sub);
            }
        });

        probe.publisher().publish(&1);
        assert!(late_log.borrow().is_empty());
        probe.publisher().publish(&2);
        assert_eq!(*late_log.borrow(), vec![2]);
        held.borrow_mut().clear();
    }

    #[test]
    fn explicit_unsubscribe_and_is_active() {
        let probe = Rc::new(Probe::default());
        let sub = subscribe(&probe, |_| {});
        assert!(sub.is_active());
        sub.unsubscribe();
        assert_eq!(probe.deactivations.get(), 1);
        assert!(!probe.publisher().has_subscribers());
    }

    #[test]
    fn subscription_keeps_source_alive() {
        let probe = Rc::new(Probe::default());
        let weak = Rc::downgrade(&probe);
        let sub = subscribe(&probe, |_| {});
        drop(probe);
        assert!(weak.upgrade().is_some());
        drop(sub);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn debug_format() {
        let probe = Rc::new(Probe::default());
        let sub = subscribe(&probe, |_| {});
        let dbg = format!("{sub:?}");
        assert!(dbg.contains("Subscription"));
        assert!(dbg.contains("active: true"));
        assert!(format!("{:?}", probe.publisher()).contains("subscriber_count: 1"));
    }
}
