//! The change record delivered by a [`PropertyChannel`].
//!
//! # Shared outdated flag
//!
//! A channel wraps each record in one `Rc` and hands that same `Rc` to every
//! subscriber. When a later change supersedes a record before its delivery
//! unwinds, the channel sets the record's outdated flag on the shared
//! instance. Any subscriber still holding the `Rc` observes the flip, even if
//! it already acted on the value. The flag only ever goes from `false` to
//! `true`.
//!
//! [`PropertyChannel`]: crate::PropertyChannel

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::property::{PropertyKey, PropertyOwner};
use crate::value::{BindingPriority, PropertyValue};

/// One property transition.
pub struct PropertyChange<T> {
    owner: Option<Weak<dyn PropertyOwner>>,
    property: PropertyKey,
    old_value: Option<T>,
    new_value: PropertyValue<T>,
    priority: BindingPriority,
    is_active_value_change: bool,
    outdated: Cell<bool>,
}

impl<T> PropertyChange<T> {
    /// Create a change for `owner`. The owner is held weakly.
    pub fn new<O: PropertyOwner>(
        owner: &Rc<O>,
        property: PropertyKey,
        old_value: Option<T>,
        new_value: PropertyValue<T>,
    ) -> Self {
        let owner: Weak<O> = Rc::downgrade(owner);
        let owner: Weak<dyn PropertyOwner> = owner;
        Self::with_owner(Some(owner), property, old_value, new_value)
    }

    /// Create a change with no owner attached.
    pub fn detached(
        property: PropertyKey,
        old_value: Option<T>,
        new_value: PropertyValue<T>,
    ) -> Self {
        Self::with_owner(None, property, old_value, new_value)
    }

    pub(crate) fn with_owner(
        owner: Option<Weak<dyn PropertyOwner>>,
        property: PropertyKey,
        old_value: Option<T>,
        new_value: PropertyValue<T>,
    ) -> Self {
        Self {
            owner,
            property,
            old_value,
            new_value,
            priority: BindingPriority::default(),
            is_active_value_change: true,
            outdated: Cell::new(false),
        }
    }

    /// Set the originating priority.
    #[must_use]
    pub fn with_priority(mut self, priority: BindingPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Mark whether this change reflects the owner's effective value.
    #[must_use]
    pub fn with_active_value_change(mut self, active: bool) -> Self {
        self.is_active_value_change = active;
        self
    }

    /// The owner, if it is still alive.
    #[must_use]
    pub fn owner(&self) -> Option<Rc<dyn PropertyOwner>> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }

    #[must_use]
    pub fn is_owner_alive(&self) -> bool {
        self.owner.as_ref().is_some_and(|w| w.strong_count() > 0)
    }

    #[must_use]
    pub fn property(&self) -> PropertyKey {
        self.property
    }

    #[must_use]
    pub fn old_value(&self) -> Option<&T> {
        self.old_value.as_ref()
    }

    #[must_use]
    pub fn new_value(&self) -> &PropertyValue<T> {
        &self.new_value
    }

    #[must_use]
    pub fn priority(&self) -> BindingPriority {
        self.priority
    }

    /// Whether this change reflects the owner's currently effective value
    /// rather than a transient one.
    #[must_use]
    pub fn is_active_value_change(&self) -> bool {
        self.is_active_value_change
    }

    /// Whether a later change superseded this one before its delivery
    /// finished.
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        self.outdated.get()
    }

    pub(crate) fn mark_outdated(&self) {
        self.outdated.set(true);
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertyChange<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyChange")
            .field("property", &self.property)
            .field("old_value", &self.old_value)
            .field("new_value", &self.new_value)
            .field("priority", &self.priority)
            .field("is_active_value_change", &self.is_active_value_change)
            .field("outdated", &self.outdated.get())
            .field("owner_alive", &self.is_owner_alive())
            .finish()
    }
}
