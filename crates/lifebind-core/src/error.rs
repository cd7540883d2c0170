#![forbid(unsafe_code)]

//! Contract violations reported by observable containers.
//!
//! Every variant describes a caller mistake, not a transient condition:
//! registering an observer twice, dispatching to an initiator that was never
//! registered, or touching a `SingleEvent` after it fired. Whether these come
//! back as `Err` or abort the caller is decided by
//! [`ViolationPolicy`](crate::ViolationPolicy).

use crate::observer::ObserverId;

/// Result alias used across lifebind.
pub type Result<T, E = BindError> = std::result::Result<T, E>;

/// Errors from observe/remove/dispatch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindError {
    /// The observer identity is already registered on this container.
    AlreadyRegistered { observer: ObserverId },
    /// The observer identity is not registered (or its owner was destroyed).
    NotRegistered { observer: ObserverId },
    /// The single event already fired.
    AlreadyTriggered,
}

impl BindError {
    /// The observer the error refers to, if any.
    #[must_use]
    pub fn observer(&self) -> Option<ObserverId> {
        match self {
            Self::AlreadyRegistered { observer } | Self::NotRegistered { observer } => {
                Some(*observer)
            }
            Self::AlreadyTriggered => None,
        }
    }
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRegistered { observer } => {
                write!(f, "observer {observer} is already registered")
            }
            Self::NotRegistered { observer } => {
                write!(f, "observer {observer} was never registered for observation")
            }
            Self::AlreadyTriggered => write!(f, "single event was already triggered"),
        }
    }
}

impl std::error::Error for BindError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_observer() {
        let id = ObserverId::from_raw(7);
        let msg = BindError::AlreadyRegistered { observer: id }.to_string();
        assert_eq!(msg, "observer obs#7 is already registered");

        let msg = BindError::NotRegistered { observer: id }.to_string();
        assert!(msg.contains("obs#7"));
        assert!(msg.contains("never registered"));
    }

    #[test]
    fn observer_accessor() {
        let id = ObserverId::from_raw(3);
        assert_eq!(BindError::NotRegistered { observer: id }.observer(), Some(id));
        assert_eq!(BindError::AlreadyTriggered.observer(), None);
    }

    #[test]
    fn is_std_error() {
        fn takes_error(_: &dyn std::error::Error) {}
        takes_error(&BindError::AlreadyTriggered);
    }
}
