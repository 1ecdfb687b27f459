//! Derived views over a [`PropertyChannel`].
//!
//! Each adapter filters the channel's changes and transforms the survivors:
//!
//! | Adapter                | Emits                                  |
//! |------------------------|----------------------------------------|
//! | [`ValueAdapter`]       | the owner's effective value `T`        |
//! | [`ChangeValueAdapter`] | the tri-state [`PropertyValue<T>`]     |
//! | [`ErasedValueAdapter`] | the tri-state as an [`ErasedValue`]    |
//!
//! A change passes only if it is an active value change and is not outdated
//! at the moment it reaches the adapter. Outdating later does not retract
//! an emission already made.
//!
//! When a change clears the property (`Unset` or `NoValue`), the value
//! adapter reads the owner's live value instead, so subscribers see the
//! default the property falls back to. If the owner has no value either,
//! nothing is emitted.
//!
//! Adapters are hot and reference counted. The first subscriber attaches the
//! adapter to its channel and the last one to leave detaches it. A new
//! subscriber first receives the owner's current value, if there is one.
//!
//! Each channel memoizes its adapters: requesting the same kind twice yields
//! the same instance while anything still holds it. The channel keeps the
//! memo weakly and the adapter keeps the channel strongly, so no cycle forms.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::change::PropertyChange;
use crate::channel::PropertyChannel;
use crate::observable::{self, LazySource, Publisher, Subscription};
use crate::value::{ErasedValue, PropertyValue};

/// Stream of concrete new values.
pub type ValueAdapter<T> = ChangeAdapter<T, T>;
/// Stream of tri-state new-value payloads.
pub type ChangeValueAdapter<T> = ChangeAdapter<T, PropertyValue<T>>;
/// Stream of type-erased new values.
pub type ErasedValueAdapter<T> = ChangeAdapter<T, ErasedValue>;

type Transform<T, U> = fn(&PropertyChannel<T>, &PropertyChange<T>) -> Option<U>;
type Replay<T, U> = fn(T) -> U;

pub(crate) fn transform_value<T: Clone + 'static>(
    channel: &PropertyChannel<T>,
    change: &PropertyChange<T>,
) -> Option<T> {
    match change.new_value() {
        PropertyValue::Value(value) => Some(value.clone()),
        PropertyValue::Unset | PropertyValue::NoValue => channel.current_value(),
    }
}

pub(crate) fn replay_value<T>(value: T) -> T {
    value
}

pub(crate) fn transform_change_value<T: Clone>(
    _channel: &PropertyChannel<T>,
    change: &PropertyChange<T>,
) -> Option<PropertyValue<T>> {
    Some(change.new_value().clone())
}

pub(crate) fn transform_erased_value<T: Clone + 'static>(
    _channel: &PropertyChannel<T>,
    change: &PropertyChange<T>,
) -> Option<ErasedValue> {
    Some(change.new_value().to_erased())
}

/// Weak memo slots, one per adapter kind.
pub(crate) struct AdapterSlots<T> {
    pub(crate) value: RefCell<Weak<AdapterCore<T, T>>>,
    pub(crate) change: RefCell<Weak<AdapterCore<T, PropertyValue<T>>>>,
    pub(crate) erased: RefCell<Weak<AdapterCore<T, ErasedValue>>>,
}

impl<T> Default for AdapterSlots<T> {
    fn default() -> Self {
        Self {
            value: RefCell::new(Weak::new()),
            change: RefCell::new(Weak::new()),
            erased: RefCell::new(Weak::new()),
        }
    }
}

pub(crate) struct AdapterCore<T, U> {
    this: Weak<Self>,
    channel: PropertyChannel<T>,
    transform: Transform<T, U>,
    replay: Replay<T, U>,
    publisher: Publisher<U>,
    upstream: RefCell<Option<Subscription>>,
}

impl<T: Clone + 'static, U: 'static> AdapterCore<T, U> {
    fn forward(&self, change: &PropertyChange<T>) {
        if !change.is_active_value_change() || change.is_outdated() {
            return;
        }
        if let Some(value) = (self.transform)(&self.channel, change) {
            self.publisher.publish(&value);
        }
    }
}

impl<T: Clone + 'static, U: 'static> LazySource for AdapterCore<T, U> {
    type Event = U;

    fn publisher(&self) -> &Publisher<U> {
        &self.publisher
    }

    fn on_activate(&self) {
        let this = Weak::clone(&self.this);
        let upstream = self.channel.subscribe(move |change| {
            if let Some(adapter) = this.upgrade() {
                adapter.forward(change);
            }
        });
        *self.upstream.borrow_mut() = Some(upstream);
    }

    fn on_deactivate(&self) {
        let upstream = self.upstream.borrow_mut().take();
        drop(upstream);
    }

    fn on_subscribed(&self, callback: &dyn Fn(&U)) {
        if !self.channel.config().replay_on_subscribe {
            return;
        }
        if let Some(current) = self.channel.current_value() {
            callback(&(self.replay)(current));
        }
    }
}

/// A filtered, transformed view of a channel's changes.
///
/// Cloning creates a new handle to the **same** adapter.
pub struct ChangeAdapter<T, U> {
    core: Rc<AdapterCore<T, U>>,
}

impl<T, U> Clone for ChangeAdapter<T, U> {
    fn clone(&self) -> Self {
        Self {
            core: Rc::clone(&self.core),
        }
    }
}

impl<T: Clone + 'static, U: 'static> ChangeAdapter<T, U> {
    /// Return the adapter cached in `slot`, creating it if none is alive.
    pub(crate) fn memoized(
        channel: &PropertyChannel<T>,
        slot: &RefCell<Weak<AdapterCore<T, U>>>,
        transform: Transform<T, U>,
        replay: Replay<T, U>,
    ) -> Self {
        if let Some(core) = slot.borrow().upgrade() {
            return Self { core };
        }
        let core = Rc::new_cyclic(|this| AdapterCore {
            this: Weak::clone(this),
            channel: channel.clone(),
            transform,
            replay,
            publisher: Publisher::new(),
            upstream: RefCell::new(None),
        });
        *slot.borrow_mut() = Rc::downgrade(&core);
        Self { core }
    }

    /// Subscribe to this view.
    ///
    /// If the owner currently has a value, `callback` receives it before
    /// this call returns.
    pub fn subscribe(&self, callback: impl Fn(&U) + 'static) -> Subscription {
        observable::subscribe(&self.core, callback)
    }

    /// The channel this adapter reads from.
    #[must_use]
    pub fn channel(&self) -> &PropertyChannel<T> {
        &self.core.channel
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.core.publisher.subscriber_count()
    }

    /// Whether the adapter is currently attached to its channel.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.core.upstream.borrow().is_some()
    }

    /// Whether two handles refer to the same adapter.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl<T: Clone + 'static, U: 'static> fmt::Debug for ChangeAdapter<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeAdapter")
            .field("property", &self.core.channel.property())
            .field("subscribers", &self.core.publisher.subscriber_count())
            .field("active", &self.core.upstream.borrow().is_some())
            .finish()
    }
}
