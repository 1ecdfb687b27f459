//! Errors from property registration and channel construction.
//!
//! Only construction can fail. Delivery itself never returns an error: a dead
//! owner is reported as absence by [`PropertyChannel::current_value`].
//!
//! [`PropertyChannel::current_value`]: crate::PropertyChannel::current_value

/// Errors from property operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// A property was registered with an empty name.
    EmptyPropertyName,
    /// A channel was requested for an owner that has already been dropped.
    OwnerDropped { property: &'static str },
    /// A cached channel exists for the property but with a different value type.
    TypeMismatch { property: &'static str },
}

impl std::fmt::Display for PropertyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPropertyName => write!(f, "property name must not be empty"),
            Self::OwnerDropped { property } => {
                write!(f, "owner of property '{property}' is no longer alive")
            }
            Self::TypeMismatch { property } => {
                write!(f, "channel for property '{property}' has a different value type")
            }
        }
    }
}

impl std::error::Error for PropertyError {}
