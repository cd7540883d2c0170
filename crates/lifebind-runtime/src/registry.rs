#![forbid(unsafe_code)]

//! Observer registrations shared by every container.
//!
//! [`Registry<T>`] is the ordered list of [`LifecycleBoundObserver`]s;
//! [`Core<S>`] wraps a container's state with its label, violation policy
//! and [`Gate`], and implements the registration protocol once for all
//! containers.
//!
//! # Invariants
//!
//! 1. At most one entry per [`ObserverId`].
//! 2. Entries keep registration order.
//! 3. Entries are never dropped while the state lock is held. Dropping an
//!    observer may drop the last handle to an owner, whose destroy hooks lock
//!    the state again.
//! 4. An owned entry carries the id of the destroy hook that removes it;
//!    explicit removal cancels that hook.
//! 5. Every registry mutation runs inside the container's [`Gate`],
//!    including the removal triggered by an owner's destroy hook. With
//!    [`Marshal::Queue`](crate::Marshal::Queue) that removal runs on the
//!    queue thread, so destroying an owner from a thread the queue is
//!    itself waiting on deadlocks.

use std::sync::Arc;

use lifebind_core::{
    BindError, LifecycleBoundObserver, LifecycleToken, Observer, ObserverId, Result,
    ViolationPolicy,
};
use parking_lot::Mutex;

use crate::config::ContainerOptions;
use crate::gate::Gate;

/// Ordered, identity-unique set of bound observers.
pub(crate) struct Registry<T> {
    entries: Vec<LifecycleBoundObserver<T>>,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn position(&self, id: ObserverId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id() == id)
    }

    /// Append `entry`. Hands it back if its identity is already present.
    pub(crate) fn insert(
        &mut self,
        entry: LifecycleBoundObserver<T>,
    ) -> std::result::Result<(), LifecycleBoundObserver<T>> {
        if self.position(entry.id()).is_some() {
            return Err(entry);
        }
        self.entries.push(entry);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: ObserverId) -> Option<LifecycleBoundObserver<T>> {
        self.position(id).map(|idx| self.entries.remove(idx))
    }

    /// Remove `id` only if it is bound to the owner behind `token`.
    pub(crate) fn remove_owned_by(
        &mut self,
        id: ObserverId,
        token: &LifecycleToken,
    ) -> Option<LifecycleBoundObserver<T>> {
        let idx = self.entries.iter().position(|entry| {
            entry.id() == id && entry.owner().is_some_and(|owner| owner.same_owner(token))
        })?;
        Some(self.entries.remove(idx))
    }

    /// Take every entry whose owner is destroyed.
    pub(crate) fn purge_destroyed(&mut self) -> Vec<LifecycleBoundObserver<T>> {
        if self.entries.iter().all(LifecycleBoundObserver::is_active) {
            return Vec::new();
        }
        let (kept, purged) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(LifecycleBoundObserver::is_active);
        self.entries = kept;
        purged
    }

    /// Take every entry.
    pub(crate) fn drain(&mut self) -> Vec<LifecycleBoundObserver<T>> {
        std::mem::take(&mut self.entries)
    }

    /// Registered and active.
    pub(crate) fn contains(&self, id: ObserverId) -> bool {
        self.position(id)
            .is_some_and(|idx| self.entries[idx].is_active())
    }

    pub(crate) fn active_len(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_active()).count()
    }

    pub(crate) fn get_mut(&mut self, id: ObserverId) -> Option<&mut LifecycleBoundObserver<T>> {
        self.entries.iter_mut().find(|entry| entry.id() == id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &LifecycleBoundObserver<T>> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut LifecycleBoundObserver<T>> {
        self.entries.iter_mut()
    }

    /// Identities of every entry, in registration order.
    pub(crate) fn ids(&self) -> Vec<ObserverId> {
        self.entries.iter().map(LifecycleBoundObserver::id).collect()
    }

    /// Clone of `id`'s observer if it is registered and active.
    pub(crate) fn active_observer(&self, id: ObserverId) -> Option<Observer<T>> {
        self.position(id)
            .map(|idx| &self.entries[idx])
            .filter(|entry| entry.is_active())
            .map(|entry| entry.observer().clone())
    }
}

/// Container state that owns a [`Registry`].
pub(crate) trait Registered {
    type Item;

    fn registry(&self) -> &Registry<Self::Item>;

    fn registry_mut(&mut self) -> &mut Registry<Self::Item>;

    /// Refuse new registrations. `SingleEvent` does after firing.
    fn refuse_observe(&self) -> Option<BindError> {
        None
    }
}

/// Cancel the destroy hook of each removed entry, then drop them.
pub(crate) fn release<T>(entries: impl IntoIterator<Item = LifecycleBoundObserver<T>>) {
    for mut entry in entries {
        if let (Some(hook), Some(owner)) = (entry.take_hook(), entry.owner()) {
            owner.cancel(hook);
        }
    }
}

/// Shared interior of a container.
pub(crate) struct Core<S> {
    pub(crate) label: String,
    pub(crate) policy: ViolationPolicy,
    pub(crate) gate: Gate,
    pub(crate) state: Mutex<S>,
}

impl<S> Core<S> {
    pub(crate) fn new(kind: &'static str, options: ContainerOptions, state: S) -> Self {
        Self {
            label: options.label.unwrap_or_else(|| kind.to_string()),
            policy: options.policy,
            gate: Gate::new(options.marshal),
            state: Mutex::new(state),
        }
    }

    pub(crate) fn violation<R>(&self, err: BindError) -> Result<R> {
        self.policy.enforce(&self.label, err)
    }
}

impl<S> Core<S>
where
    S: Registered + Send + 'static,
    S::Item: 'static,
{
    /// Run `f` with this core inside the gate.
    pub(crate) fn run<R, F>(self: &Arc<Self>, f: F) -> R
    where
        F: FnOnce(&Arc<Self>) -> R + Send + 'static,
        R: Send + 'static,
    {
        let core = Arc::clone(self);
        self.gate.run(move || f(&core))
    }

    pub(crate) fn observe(
        self: &Arc<Self>,
        observer: Observer<S::Item>,
        owner: Option<LifecycleToken>,
    ) -> Result<()> {
        self.run(move |core| core.register(LifecycleBoundObserver::new(observer, owner)))
    }

    pub(crate) fn remove(self: &Arc<Self>, id: ObserverId) -> bool {
        self.run(move |core| core.unregister(id))
    }

    pub(crate) fn contains(&self, id: ObserverId) -> bool {
        self.state.lock().registry().contains(id)
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.state.lock().registry().active_len()
    }

    fn register(self: &Arc<Self>, entry: LifecycleBoundObserver<S::Item>) -> Result<()> {
        let id = entry.id();
        let owner = entry.owner().cloned();
        let mut purged = Vec::new();
        let outcome = {
            let mut state = self.state.lock();
            match state.refuse_observe() {
                Some(err) => Err((err, entry)),
                None => {
                    purged = state.registry_mut().purge_destroyed();
                    state
                        .registry_mut()
                        .insert(entry)
                        .map_err(|entry| (BindError::AlreadyRegistered { observer: id }, entry))
                }
            }
        };
        drop(purged);
        if let Err((err, entry)) = outcome {
            drop(entry);
            return self.violation(err);
        }
        tracing::trace!(
            container = %self.label,
            observer = %id,
            owned = owner.is_some(),
            "observer registered"
        );

        if let Some(token) = owner {
            self.attach_destroy_hook(id, token);
        }
        Ok(())
    }

    fn attach_destroy_hook(self: &Arc<Self>, id: ObserverId, token: LifecycleToken) {
        let weak = Arc::downgrade(self);
        let hook_token = token.clone();
        let hook = token.on_destroy(move || {
            if let Some(core) = weak.upgrade() {
                core.run(move |core| core.drop_owned(id, &hook_token));
            }
        });
        let Some(hook) = hook else {
            // Owner already gone; the hook ran and removed the entry.
            return;
        };
        let attached = {
            let mut state = self.state.lock();
            match state.registry_mut().get_mut(id) {
                Some(entry) if entry.owner().is_some_and(|o| o.same_owner(&token)) => {
                    entry.set_hook(Some(hook));
                    true
                }
                _ => false,
            }
        };
        if !attached {
            token.cancel(hook);
        }
    }

    fn drop_owned(&self, id: ObserverId, token: &LifecycleToken) {
        let removed = self.state.lock().registry_mut().remove_owned_by(id, token);
        if removed.is_some() {
            tracing::trace!(container = %self.label, observer = %id, "observer dropped with its owner");
        }
        drop(removed);
    }

    fn unregister(&self, id: ObserverId) -> bool {
        let removed = self.state.lock().registry_mut().remove(id);
        let Some(entry) = removed else {
            return false;
        };
        let was_active = entry.is_active();
        tracing::trace!(container = %self.label, observer = %id, was_active, "observer removed");
        release([entry]);
        was_active
    }
}
