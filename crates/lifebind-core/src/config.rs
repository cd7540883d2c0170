#![forbid(unsafe_code)]

//! How contract violations surface.
//!
//! By default a violation comes back as `Err(BindError)`. Apps that prefer
//! fail-fast behavior during development can switch to
//! [`ViolationPolicy::Panic`], in code or with `LIFEBIND_STRICT=1`.

use crate::error::{BindError, Result};

/// Environment variable read by [`ViolationPolicy::from_env`].
pub const STRICT_ENV: &str = "LIFEBIND_STRICT";

/// What a container does with a contract violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ViolationPolicy {
    /// Return the error to the caller.
    #[default]
    Return,
    /// Panic with the error message.
    Panic,
}

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl ViolationPolicy {
    /// Read the policy from `LIFEBIND_STRICT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Read the policy using a custom environment lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match get_env(STRICT_ENV) {
            Some(value) if env_flag(&value) => Self::Panic,
            _ => Self::Return,
        }
    }

    /// Log `err` and apply the policy.
    ///
    /// # Panics
    ///
    /// Panics under [`ViolationPolicy::Panic`].
    pub fn enforce<T>(self, context: &str, err: BindError) -> Result<T> {
        tracing::warn!(container = context, error = %err, "contract violation");
        match self {
            Self::Return => Err(err),
            Self::Panic => panic!("{context}: {err}"),
        }
    }
}
