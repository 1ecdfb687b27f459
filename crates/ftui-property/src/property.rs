//! Property identities and the owner-side capabilities the channel consumes.
//!
//! Registration metadata (defaults, coercion, inheritance) lives in the host
//! property system. This module only carries what notification needs: a
//! stable identity with a name, and a way to read the owner's current value.
//!
//! Two property kinds exist:
//!
//! | Kind                 | Value comes from                               |
//! |----------------------|------------------------------------------------|
//! | [`StyledProperty`]   | the owner's value store ([`StyledValueStore`]) |
//! | [`DirectProperty`]   | a plain getter over an owner field             |

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::PropertyError;

static NEXT_PROPERTY_ID: AtomicU32 = AtomicU32::new(1);

/// Identity of a registered property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    id: u32,
    name: &'static str,
}

impl PropertyKey {
    fn register(name: &'static str) -> Result<Self, PropertyError> {
        if name.is_empty() {
            return Err(PropertyError::EmptyPropertyName);
        }
        Ok(Self {
            id: NEXT_PROPERTY_ID.fetch_add(1, Ordering::Relaxed),
            name,
        })
    }

    /// Process-unique registration id.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Property name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// An object that owns properties.
///
/// Channels hold owners weakly through this trait, so it must stay object
/// safe.
pub trait PropertyOwner: 'static {
    /// Short type name used in diagnostics.
    fn type_name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Owner capability to resolve a styled property's effective value.
///
/// Resolution may cascade through styles or animations; that machinery is
/// the implementor's concern. Returns `None` when the property currently has
/// no effective value.
pub trait StyledValueStore: PropertyOwner {
    fn styled_value<T: Clone + 'static>(&self, property: &StyledProperty<T>) -> Option<T>;
}

/// A property whose value is computed by the owner's value store.
pub struct StyledProperty<T> {
    key: PropertyKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StyledProperty<T> {
    /// Register a styled property.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        match Self::try_new(name) {
            Ok(property) => property,
            Err(err) => panic!("cannot register styled property: {err}"),
        }
    }

    /// Register a styled property, rejecting an empty name.
    pub fn try_new(name: &'static str) -> Result<Self, PropertyError> {
        Ok(Self {
            key: PropertyKey::register(name)?,
            _marker: PhantomData,
        })
    }

    #[must_use]
    pub const fn key(&self) -> PropertyKey {
        self.key
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.key.name
    }
}

// Manual impls: `T` need not be Clone/Debug for the descriptor to be.
impl<T> Clone for StyledProperty<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StyledProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StyledProperty")
            .field("key", &self.key)
            .finish()
    }
}

/// A property backed by a plain field on the owner, read through `getter`.
pub struct DirectProperty<O, T> {
    key: PropertyKey,
    getter: fn(&O) -> T,
}

impl<O, T> DirectProperty<O, T> {
    /// Register a direct property.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    #[must_use]
    pub fn new(name: &'static str, getter: fn(&O) -> T) -> Self {
        match Self::try_new(name, getter) {
            Ok(property) => property,
            Err(err) => panic!("cannot register direct property: {err}"),
        }
    }

    /// Register a direct property, rejecting an empty name.
    pub fn try_new(name: &'static str, getter: fn(&O) -> T) -> Result<Self, PropertyError> {
        Ok(Self {
            key: PropertyKey::register(name)?,
            getter,
        })
    }

    #[must_use]
    pub const fn key(&self) -> PropertyKey {
        self.key
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.key.name
    }

    /// Read the field from `owner`.
    pub fn get(&self, owner: &O) -> T {
        (self.getter)(owner)
    }
}

impl<O, T> Clone for DirectProperty<O, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            getter: self.getter,
        }
    }
}

impl<O, T> fmt::Debug for DirectProperty<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectProperty")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Strip the module path from a `std::any::type_name` string, keeping any
/// generic arguments intact.
fn short_type_name(full: &'static str) -> &'static str {
    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
