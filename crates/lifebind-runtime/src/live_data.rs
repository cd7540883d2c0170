#![forbid(unsafe_code)]

//! Versioned, lifecycle-aware value holder.
//!
//! # Design
//!
//! [`LiveData<T>`] keeps its value as an `Arc<T>` next to a version counter
//! and a [`Registry`] of bound observers. Every `set` bumps the version and
//! dispatches. An observer is only called when its last delivered version is
//! behind the container's, so repeated `dispatch` calls never deliver the same
//! version twice.
//!
//! ```text
//! set("a")   version 2 ──► obs1 (last 1 → 2)   obs2 (last 1 → 2)
//! dispatch() version 2 ──► nothing, both at 2
//! observe(obs3)          obs3 (last 0)
//! dispatch() version 2 ──► obs3 (last 0 → 2)
//! ```
//!
//! # Invariants
//!
//! 1. The version never decreases, and `set` increments it by exactly 1.
//! 2. An observer's last version is recorded before its callback runs.
//! 3. Observers are notified in registration order, with the state lock
//!    released, so callbacks may call back into the container. The value
//!    passed is the one current when the observer's turn comes.
//! 4. Registering does not dispatch. Call [`LiveData::dispatch`] or
//!    [`LiveData::dispatch_to`] to push the current value to newcomers.
//!
//! # Failure Modes
//!
//! - **Re-entrant set**: a callback may `set` the same container. The nested
//!   dispatch runs to completion first; the outer one then skips every
//!   observer the nested one already brought up to date, so no observer ends
//!   on a stale value.
//! - **Owner destroyed mid-dispatch**: each observer is checked for staleness
//!   and activity right before its callback, so a registration whose owner a
//!   previous callback destroyed is skipped.
//! - **Non-atomic update**: [`LiveData::update`] edits a clone outside the
//!   gate, so a concurrent `set` between the read and the write is lost.

use std::fmt;
use std::sync::Arc;

use lifebind_core::{
    BindError, LifecycleBoundObserver, LifecycleOwner, Observer, ObserverId, Result,
    START_VERSION, StateValue, Version,
};

use crate::config::ContainerOptions;
use crate::observable::Observable;
use crate::registry::{Core, Registered, Registry};

pub(crate) struct LiveState<T> {
    value: Arc<T>,
    version: Version,
    registry: Registry<T>,
}

impl<T> Registered for LiveState<T> {
    type Item = T;

    fn registry(&self) -> &Registry<T> {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry<T> {
        &mut self.registry
    }
}

/// A shared, versioned value that dispatches changes to its observers.
///
/// Cloning creates another handle to the **same** value and observers.
pub struct LiveData<T> {
    pub(crate) core: Arc<Core<LiveState<T>>>,
}

/// `LiveData` whose value may be absent.
pub type LiveOptionalData<T> = LiveData<Option<T>>;

/// `LiveData` carrying a success value or an error.
pub type LiveStateData<V, E> = LiveData<StateValue<V, E>>;

/// `LiveData` carrying an optional success value or an error.
pub type LiveOptionalStateData<V, E> = LiveData<Option<StateValue<V, E>>>;

impl<T> Clone for LiveData<T> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<T: Send + Sync + 'static> LiveData<T> {
    /// Hold `value` as version 1, so a first `dispatch` delivers it.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_options(value, ContainerOptions::default())
    }

    #[must_use]
    pub fn with_options(value: T, options: ContainerOptions) -> Self {
        Self::build(value, START_VERSION + 1, options)
    }

    fn build(value: T, version: Version, options: ContainerOptions) -> Self {
        Self {
            core: Arc::new(Core::new(
                "LiveData",
                options,
                LiveState {
                    value: Arc::new(value),
                    version,
                    registry: Registry::new(),
                },
            )),
        }
    }

    /// Shared pointer to the current value.
    #[must_use]
    pub fn snapshot(&self) -> Arc<T> {
        Arc::clone(&self.core.state.lock().value)
    }

    /// Access the current value by reference without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.snapshot())
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.core.state.lock().version
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.core.label
    }

    /// Whether both handles share the same state.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    /// Replace the value, bump the version and dispatch to every observer.
    ///
    /// Returns the number of observers notified.
    pub fn set(&self, value: T) -> usize {
        self.core.run(move |core| {
            let previous = {
                let mut state = core.state.lock();
                state.version += 1;
                std::mem::replace(&mut state.value, Arc::new(value))
            };
            drop(previous);
            deliver_all(core)
        })
    }

    /// Deliver the current value to every active observer that lacks it.
    ///
    /// Returns the number of observers notified.
    pub fn dispatch(&self) -> usize {
        self.core.run(|core| deliver_all(core))
    }

    /// Deliver the current value to `initiator` only, if it lacks it.
    ///
    /// # Errors
    ///
    /// [`BindError::NotRegistered`] if `initiator` is not registered.
    pub fn dispatch_to(&self, initiator: &Observer<T>) -> Result<usize> {
        let id = initiator.id();
        self.core.run(move |core| deliver_to(core, id))
    }
}

impl<T: Clone + Send + Sync + 'static> LiveData<T> {
    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        (*self.snapshot()).clone()
    }

    /// Edit a clone of the value in place, then [`set`](Self::set) it.
    pub fn update(&self, f: impl FnOnce(&mut T)) -> usize {
        let mut next = self.get();
        f(&mut next);
        self.set(next)
    }
}

impl<T: PartialEq + Send + Sync + 'static> LiveData<T> {
    /// [`set`](Self::set) unless `value` equals the current value.
    ///
    /// Returns whether the value changed.
    pub fn set_if_changed(&self, value: T) -> bool {
        self.core.run(move |core| {
            let previous = {
                let mut state = core.state.lock();
                if *state.value == value {
                    None
                } else {
                    state.version += 1;
                    Some(std::mem::replace(&mut state.value, Arc::new(value)))
                }
            };
            match previous {
                Some(previous) => {
                    drop(previous);
                    deliver_all(core);
                    true
                }
                None => false,
            }
        })
    }
}

impl<T: Send + Sync + 'static> LiveData<Option<T>> {
    /// Start without a value and at version 0: nothing to dispatch until the
    /// first `set`.
    #[must_use]
    pub fn empty() -> Self {
        Self::empty_with_options(ContainerOptions::default())
    }

    #[must_use]
    pub fn empty_with_options(options: ContainerOptions) -> Self {
        Self::build(None, START_VERSION, options)
    }
}

impl<T: Send + Sync + 'static> Default for LiveData<Option<T>> {
    fn default() -> Self {
        Self::empty()
    }
}

fn deliver_all<T>(core: &Core<LiveState<T>>) -> usize {
    let ids = {
        let mut state = core.state.lock();
        let purged = state.registry.purge_destroyed();
        let ids = state.registry.ids();
        drop(state);
        log_purged(core, purged);
        ids
    };
    ids.into_iter()
        .filter(|&id| consider_notify(core, id) == Some(true))
        .count()
}

fn deliver_to<T>(core: &Core<LiveState<T>>, id: ObserverId) -> Result<usize> {
    let purged = core.state.lock().registry.purge_destroyed();
    log_purged(core, purged);
    match consider_notify(core, id) {
        Some(delivered) => Ok(usize::from(delivered)),
        None => core.violation(BindError::NotRegistered { observer: id }),
    }
}

/// Deliver the value current at this moment to `id` if it is still active
/// and behind. `None` if `id` is not registered.
fn consider_notify<T>(core: &Core<LiveState<T>>, id: ObserverId) -> Option<bool> {
    let target = {
        let mut guard = core.state.lock();
        let state = &mut *guard;
        let version = state.version;
        let entry = state.registry.get_mut(id)?;
        entry
            .mark_delivered(version)
            .then(|| (entry.observer().clone(), Arc::clone(&state.value)))
    };
    let Some((observer, value)) = target else {
        return Some(false);
    };
    tracing::trace!(container = %core.label, observer = %id, "delivering value");
    observer.update(&value);
    Some(true)
}

fn log_purged<T>(core: &Core<LiveState<T>>, purged: Vec<LifecycleBoundObserver<T>>) {
    if !purged.is_empty() {
        tracing::debug!(container = %core.label, purged = purged.len(), "purged destroyed observers");
    }
    drop(purged);
}

impl<T: Send + Sync + 'static> Observable for LiveData<T> {
    type Item = T;

    fn observe_with<O>(&self, owner: &O, observer: Observer<T>) -> Result<()>
    where
        O: LifecycleOwner + ?Sized,
    {
        self.core
            .observe(observer, Some(owner.lifecycle().token()))
    }

    fn observe_forever_with(&self, observer: Observer<T>) -> Result<()> {
        self.core.observe(observer, None)
    }

    fn remove(&self, observer: &Observer<T>) -> bool {
        self.core.remove(observer.id())
    }

    fn contains(&self, observer: &Observer<T>) -> bool {
        self.core.contains(observer.id())
    }

    fn observer_count(&self) -> usize {
        self.core.observer_count()
    }
}

impl<T: fmt::Debug> fmt::Debug for LiveData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("LiveData")
            .field("label", &self.core.label)
            .field("value", &state.value)
            .field("version", &state.version)
            .field("observers", &state.registry.active_len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
