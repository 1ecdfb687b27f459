#![forbid(unsafe_code)]

//! Value payloads carried by property change notifications.
//!
//! - [`PropertyValue`]: the tri-state "new value" of a change (a concrete
//!   value, an explicit unset, or no effective value at all).
//! - [`ErasedValue`]: the same tri-state with the concrete value type-erased
//!   behind `Rc<dyn Any>`.
//! - [`BindingPriority`]: the priority a change originated from. Carried for
//!   diagnostics only.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The new value of a property transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue<T> {
    /// A concrete value.
    Value(T),
    /// The value was explicitly cleared.
    Unset,
    /// The property has no effective value.
    NoValue,
}

impl<T> PropertyValue<T> {
    /// Borrow the concrete value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unset | Self::NoValue => None,
        }
    }

    /// Take the concrete value, if any.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Unset | Self::NoValue => None,
        }
    }

    /// Whether this holds a concrete value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Map the concrete value, preserving `Unset` / `NoValue`.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> PropertyValue<U> {
        match self {
            Self::Value(v) => PropertyValue::Value(f(v)),
            Self::Unset => PropertyValue::Unset,
            Self::NoValue => PropertyValue::NoValue,
        }
    }
}

impl<T: Clone + 'static> PropertyValue<T> {
    /// Convert to the type-erased representation.
    #[must_use]
    pub fn to_erased(&self) -> ErasedValue {
        match self {
            Self::Value(v) => ErasedValue::Value(Rc::new(v.clone())),
            Self::Unset => ErasedValue::Unset,
            Self::NoValue => ErasedValue::NoValue,
        }
    }
}

impl<T> From<Option<T>> for PropertyValue<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Value(v),
            None => Self::NoValue,
        }
    }
}

/// A type-erased [`PropertyValue`].
///
/// Cloning shares the underlying `Rc`.
#[derive(Clone)]
pub enum ErasedValue {
    /// A concrete value of some `'static` type.
    Value(Rc<dyn Any>),
    /// The value was explicitly cleared.
    Unset,
    /// The property has no effective value.
    NoValue,
}

impl ErasedValue {
    /// Wrap a concrete value.
    #[must_use]
    pub fn new<T: 'static>(value: T) -> Self {
        Self::Value(Rc::new(value))
    }

    /// Borrow the concrete value as `T`, if present and of that type.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Self::Value(v) => v.downcast_ref::<T>(),
            Self::Unset | Self::NoValue => None,
        }
    }

    /// Whether this holds a concrete value.
    #[must_use]
    pub fn has_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Whether this is the explicit-unset sentinel.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Whether this is the no-effective-value sentinel.
    #[must_use]
    pub fn is_no_value(&self) -> bool {
        matches!(self, Self::NoValue)
    }
}

impl fmt::Debug for ErasedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("ErasedValue::Value(..)"),
            Self::Unset => f.write_str("ErasedValue::Unset"),
            Self::NoValue => f.write_str("ErasedValue::NoValue"),
        }
    }
}

/// Priority a value change originated from.
///
/// Lower variants take precedence. The notification core only carries this
/// through; it never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum BindingPriority {
    Animation,
    #[default]
    LocalValue,
    StyleTrigger,
    Template,
    Style,
    Inherited,
    Unset,
}

impl fmt::Display for BindingPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Animation => "animation",
            Self::LocalValue => "local",
            Self::StyleTrigger => "style-trigger",
            Self::Template => "template",
            Self::Style => "style",
            Self::Inherited => "inherited",
            Self::Unset => "unset",
        };
        f.write_str(name)
    }
}
