//! Channel construction and per-owner caching.
//!
//! The two channel flavors share the whole delivery algorithm and differ
//! only in how [`PropertyChannel::current_value`] reads the owner:
//!
//! - **styled**: through the owner's [`StyledValueStore`], which may resolve
//!   styles or animations and may report no effective value;
//! - **direct**: through the [`DirectProperty`] getter, a plain field read.
//!
//! [`ChannelCache`] keeps one channel per property for an owner so the
//! storage layer can create channels on first need and reuse them after.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::channel::PropertyChannel;
use crate::config::ChannelConfig;
use crate::error::PropertyError;
use crate::property::{
    DirectProperty, PropertyKey, PropertyOwner, StyledProperty, StyledValueStore,
};

/// How a channel reads the owner's current value.
pub(crate) trait ValueSource<T> {
    fn current_value(&self) -> Option<T>;
}

struct StyledSource<O, T> {
    owner: Weak<O>,
    property: StyledProperty<T>,
}

impl<O: StyledValueStore, T: Clone + 'static> ValueSource<T> for StyledSource<O, T> {
    fn current_value(&self) -> Option<T> {
        self.owner.upgrade()?.styled_value(&self.property)
    }
}

struct DirectSource<O, T> {
    owner: Weak<O>,
    property: DirectProperty<O, T>,
}

impl<O: PropertyOwner, T: 'static> ValueSource<T> for DirectSource<O, T> {
    fn current_value(&self) -> Option<T> {
        let owner = self.owner.upgrade()?;
        Some(self.property.get(&owner))
    }
}

/// Builds channels with a shared configuration.
///
/// The default factory uses [`ChannelConfig::process_default`], so the
/// `FTUI_PROPERTY_*` environment overrides apply to it.
#[derive(Debug, Clone)]
pub struct ChannelFactory {
    config: ChannelConfig,
}

impl Default for ChannelFactory {
    fn default() -> Self {
        Self::new(ChannelConfig::process_default().clone())
    }
}

impl ChannelFactory {
    #[must_use]
    pub fn new(config: ChannelConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Channel for a styled property of `owner`.
    pub fn styled<O, T>(&self, owner: &Rc<O>, property: &StyledProperty<T>) -> PropertyChannel<T>
    where
        O: StyledValueStore,
        T: Clone + 'static,
    {
        let weak = Rc::downgrade(owner);
        let source = StyledSource {
            owner: Weak::clone(&weak),
            property: property.clone(),
        };
        PropertyChannel::from_source(weak, property.key(), Box::new(source), self.config.clone())
    }

    /// Channel for a direct property of `owner`.
    pub fn direct<O, T>(&self, owner: &Rc<O>, property: &DirectProperty<O, T>) -> PropertyChannel<T>
    where
        O: PropertyOwner,
        T: Clone + 'static,
    {
        let weak = Rc::downgrade(owner);
        let source = DirectSource {
            owner: Weak::clone(&weak),
            property: property.clone(),
        };
        PropertyChannel::from_source(weak, property.key(), Box::new(source), self.config.clone())
    }

    /// Like [`styled`](Self::styled), failing if the owner is already gone.
    pub fn try_styled<O, T>(
        &self,
        owner: &Weak<O>,
        property: &StyledProperty<T>,
    ) -> Result<PropertyChannel<T>, PropertyError>
    where
        O: StyledValueStore,
        T: Clone + 'static,
    {
        let owner = owner.upgrade().ok_or(PropertyError::OwnerDropped {
            property: property.name(),
        })?;
        Ok(self.styled(&owner, property))
    }

    /// Like [`direct`](Self::direct), failing if the owner is already gone.
    pub fn try_direct<O, T>(
        &self,
        owner: &Weak<O>,
        property: &DirectProperty<O, T>,
    ) -> Result<PropertyChannel<T>, PropertyError>
    where
        O: PropertyOwner,
        T: Clone + 'static,
    {
        let owner = owner.upgrade().ok_or(PropertyError::OwnerDropped {
            property: property.name(),
        })?;
        Ok(self.direct(&owner, property))
    }
}

/// One channel per property for a single owner, created on first request.
///
/// Channels are stored type-erased and keyed by [`PropertyKey`]. Typically
/// embedded in the owner itself; channels only hold the owner weakly, so
/// this forms no cycle.
#[derive(Default)]
pub struct ChannelCache {
    factory: ChannelFactory,
    channels: RefCell<HashMap<PropertyKey, Box<dyn Any>>>,
}

impl ChannelCache {
    #[must_use]
    pub fn new(factory: ChannelFactory) -> Self {
        Self {
            factory,
            channels: RefCell::new(HashMap::new()),
        }
    }

    /// The cached channel for `property`, creating it if needed.
    pub fn get_or_create_styled<O, T>(
        &self,
        owner: &Rc<O>,
        property: &StyledProperty<T>,
    ) -> Result<PropertyChannel<T>, PropertyError>
    where
        O: StyledValueStore,
        T: Clone + 'static,
    {
        self.get_or_insert_with(property.key(), || self.factory.styled(owner, property))
    }

    /// The cached channel for `property`, creating it if needed.
    pub fn get_or_create_direct<O, T>(
        &self,
        owner: &Rc<O>,
        property: &DirectProperty<O, T>,
    ) -> Result<PropertyChannel<T>, PropertyError>
    where
        O: PropertyOwner,
        T: Clone + 'static,
    {
        self.get_or_insert_with(property.key(), || self.factory.direct(owner, property))
    }

    /// The cached channel for `key`, if one exists.
    ///
    /// Fails with [`PropertyError::TypeMismatch`] if it exists with a value
    /// type other than `T`.
    pub fn get<T: 'static>(&self, key: PropertyKey) -> Result<Option<PropertyChannel<T>>, PropertyError> {
        match self.channels.borrow().get(&key) {
            None => Ok(None),
            Some(entry) => entry
                .downcast_ref::<PropertyChannel<T>>()
                .cloned()
                .map(Some)
                .ok_or(PropertyError::TypeMismatch {
                    property: key.name(),
                }),
        }
    }

    /// Forget the channel for `key`. Existing handles keep working.
    pub fn remove(&self, key: PropertyKey) -> bool {
        let removed = self.channels.borrow_mut().remove(&key);
        removed.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.borrow().is_empty()
    }

    pub fn clear(&self) {
        let drained: Vec<Box<dyn Any>> = self.channels.borrow_mut().drain().map(|(_, v)| v).collect();
        drop(drained);
    }

    fn get_or_insert_with<T: 'static>(
        &self,
        key: PropertyKey,
        create: impl FnOnce() -> PropertyChannel<T>,
    ) -> Result<PropertyChannel<T>, PropertyError> {
        if let Some(existing) = self.get::<T>(key)? {
            return Ok(existing);
        }
        let channel = create();
        self.channels
            .borrow_mut()
            .insert(key, Box::new(channel.clone()));
        tracing::debug!(property = %key, "created property channel");
        Ok(channel)
    }
}

impl fmt::Debug for ChannelCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelCache")
            .field("config", self.factory.config())
            .field("channels", &self.len())
            .finish()
    }
}
