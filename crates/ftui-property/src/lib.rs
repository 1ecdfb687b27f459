#![forbid(unsafe_code)]

//! Property change notification for FrankenTUI.
//!
//! # Role in FrankenTUI
//! `ftui-property` is the delivery layer under observable widget properties.
//! When the property store changes a value it calls
//! [`PropertyChannel::signal`]. The channel fans the change out
//! synchronously to its listeners and to three derived views.
//!
//! # Primary responsibilities
//! - **[`PropertyChannel`]**: one per (owner, property). Serializes reentrant
//!   signals through a pending queue and marks superseded changes outdated.
//! - **[`PropertyChange`]**: the change record, shared by `Rc` with every
//!   subscriber.
//! - **Adapters**: [`ValueAdapter`], [`ChangeValueAdapter`] and
//!   [`ErasedValueAdapter`]. Lazily activated views that drop transient and
//!   outdated changes and replay the current value to new subscribers.
//! - **[`ChannelFactory`] / [`ChannelCache`]**: styled and direct channel
//!   flavors, and per-owner reuse.
//!
//! # Threading
//! Everything is single-threaded (`Rc`, `RefCell`). "Concurrency" here means
//! nested synchronous calls from inside subscriber callbacks.
//!
//! # Example
//!
//! ```
//! use std::cell::{Cell, RefCell};
//! use std::rc::Rc;
//! use ftui_property::{DirectProperty, PropertyChannel, PropertyOwner, PropertyValue};
//!
//! struct Counter {
//!     count: Cell<i32>,
//! }
//! impl PropertyOwner for Counter {}
//!
//! let count = DirectProperty::<Counter, i32>::new("Count", |c| c.count.get());
//! let counter = Rc::new(Counter { count: Cell::new(5) });
//! let channel = PropertyChannel::direct(&counter, &count);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let seen_c = Rc::clone(&seen);
//! let _sub = channel
//!     .value_adapter()
//!     .subscribe(move |v: &i32| seen_c.borrow_mut().push(*v));
//!
//! counter.count.set(7);
//! channel.signal(channel.new_change(Some(5), PropertyValue::Value(7)));
//!
//! assert_eq!(*seen.borrow(), vec![5, 7]);
//! ```

pub mod adapter;
pub mod change;
pub mod channel;
pub mod config;
pub mod error;
pub mod factory;
pub mod observable;
pub mod property;
pub mod value;

pub use adapter::{ChangeAdapter, ChangeValueAdapter, ErasedValueAdapter, ValueAdapter};
pub use change::PropertyChange;
pub use channel::PropertyChannel;
pub use config::ChannelConfig;
pub use error::PropertyError;
pub use factory::{ChannelCache, ChannelFactory};
pub use observable::{LazySource, Publisher, SubscriberId, Subscription, subscribe};
pub use property::{
    DirectProperty, PropertyKey, PropertyOwner, StyledProperty, StyledValueStore,
};
pub use value::{BindingPriority, ErasedValue, PropertyValue};
