#![forbid(unsafe_code)]

//! Multicast event that can be triggered any number of times.
//!
//! Unlike [`LiveData`](crate::LiveData) there is no stored value and no
//! version: every [`FutureEvent::trigger`] reaches every active observer.
//! Observers registered during a trigger wait for the next one; observers
//! removed, or whose owner is destroyed, during a trigger are skipped.

use std::fmt;
use std::sync::Arc;

use lifebind_core::{LifecycleOwner, Observer, Result};

use crate::config::ContainerOptions;
use crate::observable::Observable;
use crate::registry::{Core, Registered, Registry};

pub(crate) struct EventState<A> {
    registry: Registry<A>,
}

impl<A> Registered for EventState<A> {
    type Item = A;

    fn registry(&self) -> &Registry<A> {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry<A> {
        &mut self.registry
    }
}

/// Event delivering an argument of type `A` to its observers.
///
/// Cloning creates another handle to the same observers.
pub struct FutureEvent<A = ()> {
    core: Arc<Core<EventState<A>>>,
}

impl<A> Clone for FutureEvent<A> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A: Send + Sync + 'static> FutureEvent<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    #[must_use]
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            core: Arc::new(Core::new(
                "FutureEvent",
                options,
                EventState {
                    registry: Registry::new(),
                },
            )),
        }
    }

    /// Call every active observer with `arg`.
    ///
    /// Returns the number of observers called.
    pub fn trigger(&self, arg: A) -> usize {
        self.core.run(move |core| {
            let (ids, purged) = {
                let mut state = core.state.lock();
                let purged = state.registry.purge_destroyed();
                (state.registry.ids(), purged)
            };
            if !purged.is_empty() {
                tracing::debug!(container = %core.label, purged = purged.len(), "purged destroyed observers");
            }
            drop(purged);
            let mut delivered = 0;
            for id in ids {
                // Re-checked per observer: an earlier callback may have
                // removed it or destroyed its owner.
                let observer = core.state.lock().registry.active_observer(id);
                if let Some(observer) = observer {
                    tracing::trace!(container = %core.label, observer = %id, "delivering event");
                    observer.update(&arg);
                    delivered += 1;
                }
            }
            delivered
        })
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.core.label
    }
}

impl FutureEvent<()> {
    /// [`trigger`](Self::trigger) with no argument.
    pub fn fire(&self) -> usize {
        self.trigger(())
    }
}

impl<A: Send + Sync + 'static> Default for FutureEvent<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Send + Sync + 'static> Observable for FutureEvent<A> {
    type Item = A;

    fn observe_with<O>(&self, owner: &O, observer: Observer<A>) -> Result<()>
    where
        O: LifecycleOwner + ?Sized,
    {
        self.core
            .observe(observer, Some(owner.lifecycle().token()))
    }

    fn observe_forever_with(&self, observer: Observer<A>) -> Result<()> {
        self.core.observe(observer, None)
    }

    fn remove(&self, observer: &Observer<A>) -> bool {
        self.core.remove(observer.id())
    }

    fn contains(&self, observer: &Observer<A>) -> bool {
        self.core.contains(observer.id())
    }

    fn observer_count(&self) -> usize {
        self.core.observer_count()
    }
}

impl<A> fmt::Debug for FutureEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.lock();
        let mut list = f.debug_list();
        for entry in state.registry.iter() {
            list.entry(&format_args!(
                "{} {:?} owner={:?}",
                entry.id(),
                entry.state(),
                entry.owner()
            ));
        }
        list.finish()
    }
}
