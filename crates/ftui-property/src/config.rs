//! Channel configuration.
//!
//! Defaults suit interactive UIs. Environment overrides are read once per
//! process by [`ChannelConfig::process_default`], which backs the default
//! [`ChannelFactory`](crate::ChannelFactory) and therefore
//! [`PropertyChannel::styled`](crate::PropertyChannel::styled) and
//! [`PropertyChannel::direct`](crate::PropertyChannel::direct):
//!
//! | Variable               | Effect                                     |
//! |------------------------|--------------------------------------------|
//! | `FTUI_PROPERTY_TRACE`  | emit a `trace!` event per delivered change |
//! | `FTUI_PROPERTY_REPLAY` | toggle replay of the current value on subscribe |
//!
//! A factory built from an explicit config ignores the environment.

use std::sync::OnceLock;

/// Configuration shared by channels created from one factory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Initial capacity of the pending queue allocated on the first
    /// reentrant signal.
    pub pending_capacity: usize,
    /// Deliver the owner's current value to each new adapter subscriber.
    pub replay_on_subscribe: bool,
    /// Emit a `trace!` event for every delivered change.
    pub trace_delivery: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            pending_capacity: 4,
            replay_on_subscribe: true,
            trace_delivery: false,
        }
    }
}

impl ChannelConfig {
    /// Set the initial pending queue capacity.
    #[must_use]
    pub fn with_pending_capacity(mut self, capacity: usize) -> Self {
        self.pending_capacity = capacity;
        self
    }

    /// Enable or disable replay on subscribe.
    #[must_use]
    pub fn with_replay_on_subscribe(mut self, replay: bool) -> Self {
        self.replay_on_subscribe = replay;
        self
    }

    /// Enable or disable per-delivery trace events.
    #[must_use]
    pub fn with_trace_delivery(mut self, trace: bool) -> Self {
        self.trace_delivery = trace;
        self
    }

    /// Cached [`from_env`](Self::from_env) result, read on first use.
    #[must_use]
    pub fn process_default() -> &'static Self {
        static PROCESS_DEFAULT: OnceLock<ChannelConfig> = OnceLock::new();
        PROCESS_DEFAULT.get_or_init(Self::from_env)
    }

    /// Defaults overridden from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through a custom environment lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = get_env("FTUI_PROPERTY_TRACE") {
            config.trace_delivery = env_flag(&value);
        }
        if let Some(value) = get_env("FTUI_PROPERTY_REPLAY") {
            config.replay_on_subscribe = env_flag(&value);
        }
        config
    }
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
