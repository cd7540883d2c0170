#![forbid(unsafe_code)]

//! Observers paired with an optional owner lifecycle.
//!
//! A [`LifecycleBoundObserver`] is the unit every container stores. Without an
//! owner it is active forever; with one, its state follows the owner's
//! [`LifecycleToken`]. It also remembers the last data version delivered to
//! it, which is what gives `LiveData` its at-most-once delivery.

use std::fmt;

use crate::lifecycle::{HookId, LifecycleState, LifecycleToken};
use crate::observer::{Observer, ObserverId};

/// Data version counter.
pub type Version = u64;

/// Version every observer starts at. Nothing has been delivered yet.
pub const START_VERSION: Version = 0;

/// An [`Observer`] bound to an optional owner.
pub struct LifecycleBoundObserver<T> {
    observer: Observer<T>,
    owner: Option<LifecycleToken>,
    last_version: Version,
    hook: Option<HookId>,
}

impl<T> LifecycleBoundObserver<T> {
    #[must_use]
    pub fn new(observer: Observer<T>, owner: Option<LifecycleToken>) -> Self {
        Self {
            observer,
            owner,
            last_version: START_VERSION,
            hook: None,
        }
    }

    /// Bind without an owner. Stays active until removed.
    #[must_use]
    pub fn forever(observer: Observer<T>) -> Self {
        Self::new(observer, None)
    }

    #[must_use]
    pub fn owned(observer: Observer<T>, owner: LifecycleToken) -> Self {
        Self::new(observer, Some(owner))
    }

    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.observer.id()
    }

    #[must_use]
    pub fn observer(&self) -> &Observer<T> {
        &self.observer
    }

    #[must_use]
    pub fn owner(&self) -> Option<&LifecycleToken> {
        self.owner.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.owner
            .as_ref()
            .map_or(LifecycleState::Active, LifecycleToken::state)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    #[must_use]
    pub fn last_version(&self) -> Version {
        self.last_version
    }

    /// Active and behind `version`.
    #[must_use]
    pub fn is_stale(&self, version: Version) -> bool {
        self.last_version < version && self.is_active()
    }

    /// Record `version` as delivered if it is stale. Returns whether it was.
    pub fn mark_delivered(&mut self, version: Version) -> bool {
        if !self.is_stale(version) {
            return false;
        }
        self.last_version = version;
        true
    }

    pub fn set_hook(&mut self, hook: Option<HookId>) {
        self.hook = hook;
    }

    pub fn take_hook(&mut self) -> Option<HookId> {
        self.hook.take()
    }
}

impl<T> fmt::Debug for LifecycleBoundObserver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBoundObserver")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("owner", &self.owner)
            .field("last_version", &self.last_version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Lifecycle;

    fn observer() -> Observer<u32> {
        Observer::new(|_| {})
    }

    #[test]
    fn forever_is_always_active() {
        let bound = LifecycleBoundObserver::forever(observer());
        assert_eq!(bound.state(), LifecycleState::Active);
        assert!(bound.owner().is_none());
    }

    #[test]
    fn owned_follows_owner() {
        let owner = Lifecycle::new();
        let bound = LifecycleBoundObserver::owned(observer(), owner.token());
        assert!(bound.is_active());
        owner.destroy();
        assert_eq!(bound.state(), LifecycleState::Destroyed);
    }

    #[test]
    fn dropped_owner_means_destroyed() {
        let owner = Lifecycle::new();
        let bound = LifecycleBoundObserver::owned(observer(), owner.token());
        drop(owner);
        assert!(!bound.is_active());
    }

    #[test]
    fn mark_delivered_is_at_most_once() {
        let mut bound = LifecycleBoundObserver::forever(observer());
        assert_eq!(bound.last_version(), START_VERSION);
        assert!(!bound.mark_delivered(START_VERSION));
        assert!(bound.mark_delivered(1));
        assert!(!bound.mark_delivered(1));
        assert!(bound.mark_delivered(3));
        assert!(!bound.mark_delivered(2));
        assert_eq!(bound.last_version(), 3);
    }

    #[test]
    fn destroyed_observer_is_never_stale() {
        let owner = Lifecycle::new();
        let mut bound = LifecycleBoundObserver::owned(observer(), owner.token());
        owner.destroy();
        assert!(!bound.is_stale(10));
        assert!(!bound.mark_delivered(10));
        assert_eq!(bound.last_version(), START_VERSION);
    }

    #[test]
    fn id_is_observer_id() {
        let obs = observer();
        let id = obs.id();
        let bound = LifecycleBoundObserver::forever(obs);
        assert_eq!(bound.id(), id);
        assert_eq!(bound.observer().id(), id);
    }
}
