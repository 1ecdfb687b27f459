#![forbid(unsafe_code)]

//! Per (owner, property) delivery channel.
//!
//! # Delivery algorithm
//!
//! A channel publishes at most one change at a time. A `signal()` that
//! arrives while a change is publishing (a subscriber reacting to the change
//! by setting the property again) is not delivered inline. Instead the
//! publishing change is marked outdated and the new change is queued. Once
//! the top-level delivery returns, the queue drains in arrival order. Every
//! drained change except the final one is marked outdated before delivery.
//!
//! ```text
//! signal(A)            Idle -> Publishing(A)
//!   subscriber: signal(B)   A.outdated = true, queue [B]
//!   subscriber: signal(C)   A.outdated = true, queue [B, C]
//! A returns            Draining
//!   deliver B          B.outdated = true (C still queued)
//!   deliver C          last: not forced outdated
//! queue empty          Idle
//! ```
//!
//! While draining, the change being delivered is the publishing one, so a
//! signal raised from its subscribers outdates it and queues behind it.
//!
//! # Invariants
//!
//! 1. At most one change is publishing at any instant.
//! 2. Changes are delivered in `signal()` order; none is dropped.
//! 3. `outdated` on a change only goes from false to true.
//! 4. Without reentrancy no change is ever marked outdated.
//!
//! # Failure Modes
//!
//! - **Panicking subscriber**: the panic propagates out of `signal()`. The
//!   channel resets to idle and discards queued changes, so later signals
//!   are delivered normally.
//! - **Owner dropped**: `current_value()` returns `None` and `description()`
//!   uses the `(dead)` form. Signals are still delivered.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, trace_span, warn};

use crate::adapter::{
    AdapterSlots, ChangeAdapter, ChangeValueAdapter, ErasedValueAdapter, ValueAdapter,
};
use crate::change::PropertyChange;
use crate::config::ChannelConfig;
use crate::factory::{ChannelFactory, ValueSource};
use crate::observable::{self, LazySource, Publisher, Subscription};
use crate::property::{
    DirectProperty, PropertyKey, PropertyOwner, StyledProperty, StyledValueStore,
};
use crate::value::PropertyValue;

type SharedChange<T> = Rc<PropertyChange<T>>;

struct DeliveryState<T> {
    publishing: Option<SharedChange<T>>,
    pending: Option<VecDeque<SharedChange<T>>>,
}

pub(crate) struct ChannelCore<T> {
    owner: Weak<dyn PropertyOwner>,
    property: PropertyKey,
    source: Box<dyn ValueSource<T>>,
    config: ChannelConfig,
    state: RefCell<DeliveryState<T>>,
    publisher: Publisher<SharedChange<T>>,
    pub(crate) adapters: AdapterSlots<T>,
}

impl<T: 'static> LazySource for ChannelCore<T> {
    type Event = SharedChange<T>;

    fn publisher(&self) -> &Publisher<SharedChange<T>> {
        &self.publisher
    }
}

/// Resets the channel to idle if delivery unwinds.
struct DeliveryGuard<'a, T> {
    state: &'a RefCell<DeliveryState<T>>,
    property: PropertyKey,
}

impl<T> Drop for DeliveryGuard<'_, T> {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if std::thread::panicking() {
            let discarded = state.pending.as_ref().map_or(0, VecDeque::len);
            warn!(
                property = %self.property,
                discarded,
                "subscriber panicked during property delivery; resetting channel"
            );
        }
        state.publishing = None;
        state.pending = None;
    }
}

impl<T: 'static> ChannelCore<T> {
    fn signal(&self, change: SharedChange<T>) {
        {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            if let Some(publishing) = &state.publishing {
                publishing.mark_outdated();
                let capacity = self.config.pending_capacity;
                let pending = state
                    .pending
                    .get_or_insert_with(|| VecDeque::with_capacity(capacity));
                pending.push_back(change);
                debug!(
                    property = %self.property,
                    pending = pending.len(),
                    "queued reentrant property change"
                );
                return;
            }
            state.publishing = Some(Rc::clone(&change));
        }

        let _span = trace_span!("property_signal", property = %self.property).entered();
        let _guard = DeliveryGuard {
            state: &self.state,
            property: self.property,
        };

        self.deliver(&change);
        while let Some(next) = self.next_pending() {
            self.deliver(&next);
        }
    }

    /// Dequeue the next pending change and make it the publishing one, or
    /// return to idle when the queue is exhausted.
    fn next_pending(&self) -> Option<SharedChange<T>> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let next = state.pending.as_mut().and_then(VecDeque::pop_front);
        match next {
            Some(next) => {
                let more = state.pending.as_ref().is_some_and(|q| !q.is_empty());
                if more {
                    next.mark_outdated();
                }
                state.publishing = Some(Rc::clone(&next));
                Some(next)
            }
            None => {
                state.pending = None;
                state.publishing = None;
                None
            }
        }
    }

    fn deliver(&self, change: &SharedChange<T>) {
        if self.config.trace_delivery {
            trace!(
                property = %self.property,
                outdated = change.is_outdated(),
                active = change.is_active_value_change(),
                subscribers = self.publisher.subscriber_count(),
                "delivering property change"
            );
        }
        self.publisher.publish(change);
    }
}

/// Notification hub for one property of one owner.
///
/// Cloning creates a new handle to the **same** channel. The owner is held
/// weakly; the channel never keeps it alive.
pub struct PropertyChannel<T> {
    pub(crate) core: Rc<ChannelCore<T>>,
}

impl<T> Clone for PropertyChannel<T> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static> PropertyChannel<T> {
    pub(crate) fn from_source(
        owner: Weak<dyn PropertyOwner>,
        property: PropertyKey,
        source: Box<dyn ValueSource<T>>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            core: Rc::new(ChannelCore {
                owner,
                property,
                source,
                config,
                state: RefCell::new(DeliveryState {
                    publishing: None,
                    pending: None,
                }),
                publisher: Publisher::new(),
                adapters: AdapterSlots::default(),
            }),
        }
    }

    /// Channel for a styled property, using the process configuration.
    pub fn styled<O: StyledValueStore>(owner: &Rc<O>, property: &StyledProperty<T>) -> Self {
        ChannelFactory::default().styled(owner, property)
    }

    /// Channel for a direct property, using the process configuration.
    pub fn direct<O: PropertyOwner>(owner: &Rc<O>, property: &DirectProperty<O, T>) -> Self {
        ChannelFactory::default().direct(owner, property)
    }

    /// Deliver `change` to every subscriber, or queue it if a delivery is
    /// already in progress on this channel.
    pub fn signal(&self, change: PropertyChange<T>) {
        self.core.signal(Rc::new(change));
    }

    /// Build a change bound to this channel's owner and property.
    #[must_use]
    pub fn new_change(&self, old_value: Option<T>, new_value: PropertyValue<T>) -> PropertyChange<T> {
        PropertyChange::with_owner(
            Some(Weak::clone(&self.core.owner)),
            self.core.property,
            old_value,
            new_value,
        )
    }

    /// Subscribe to every change delivered on this channel.
    ///
    /// Callbacks receive the shared change; see the [`PropertyChange`]
    /// docs for how the outdated flag behaves on it.
    pub fn subscribe(&self, callback: impl Fn(&Rc<PropertyChange<T>>) + 'static) -> Subscription {
        observable::subscribe(&self.core, callback)
    }

    /// The owner's current value of this property.
    ///
    /// Reads the live backing store, not the notification stream. `None`
    /// when the owner is gone or the property has no effective value.
    #[must_use]
    pub fn current_value(&self) -> Option<T> {
        self.core.source.current_value()
    }

    /// `"{OwnerType}.{property}"`, or `"(dead).{property}"` once the owner
    /// is gone.
    #[must_use]
    pub fn description(&self) -> String {
        let name = self.core.property.name();
        match self.core.owner.upgrade() {
            Some(owner) => format!("{}.{}", owner.type_name(), name),
            None => format!("(dead).{name}"),
        }
    }

    #[must_use]
    pub fn property(&self) -> PropertyKey {
        self.core.property
    }

    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.core.config
    }

    #[must_use]
    pub fn is_owner_alive(&self) -> bool {
        self.core.owner.strong_count() > 0
    }

    /// Whether a change is currently being delivered.
    #[must_use]
    pub fn is_publishing(&self) -> bool {
        self.core.state.borrow().publishing.is_some()
    }

    /// Number of queued reentrant changes awaiting delivery.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.core
            .state
            .borrow()
            .pending
            .as_ref()
            .map_or(0, VecDeque::len)
    }

    /// Channel-level subscribers, including active adapters.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.publisher.subscriber_count()
    }

    /// Stream of the owner's effective values.
    #[must_use]
    pub fn value_adapter(&self) -> ValueAdapter<T> {
        ChangeAdapter::memoized(
            self,
            &self.core.adapters.value,
            crate::adapter::transform_value,
            crate::adapter::replay_value,
        )
    }

    /// Stream of tri-state new-value payloads.
    #[must_use]
    pub fn change_value_adapter(&self) -> ChangeValueAdapter<T> {
        ChangeAdapter::memoized(
            self,
            &self.core.adapters.change,
            crate::adapter::transform_change_value,
            PropertyValue::Value,
        )
    }

    /// Stream of type-erased new values.
    #[must_use]
    pub fn erased_value_adapter(&self) -> ErasedValueAdapter<T> {
        ChangeAdapter::memoized(
            self,
            &self.core.adapters.erased,
            crate::adapter::transform_erased_value,
            crate::value::ErasedValue::new,
        )
    }

    /// Whether two handles refer to the same channel.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl<T> fmt::Debug for PropertyChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.borrow();
        f.debug_struct("PropertyChannel")
            .field("property", &self.core.property)
            .field("owner_alive", &(self.core.owner.strong_count() > 0))
            .field("publishing", &state.publishing.is_some())
            .field("pending", &state.pending.as_ref().map_or(0, VecDeque::len))
            .field("subscribers", &self.core.publisher.subscriber_count())
            .finish()
    }
}
