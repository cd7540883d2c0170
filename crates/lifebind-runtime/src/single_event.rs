#![forbid(unsafe_code)]

//! One-shot multicast event.
//!
//! # Invariants
//!
//! 1. [`SingleEvent::trigger`] succeeds at most once per event.
//! 2. The triggered flag is set before any callback runs: a callback that
//!    triggers again, or observes, gets [`BindError::AlreadyTriggered`].
//! 3. Triggering drains the registry. Every registration is delivered at most
//!    once and none survive the trigger.

use std::fmt;
use std::sync::Arc;

use lifebind_core::{BindError, LifecycleOwner, LifecycleToken, Observer, Result};

use crate::config::ContainerOptions;
use crate::observable::Observable;
use crate::registry::{Core, Registered, Registry, release};

pub(crate) struct SingleState<A> {
    registry: Registry<A>,
    triggered: bool,
}

impl<A> Registered for SingleState<A> {
    type Item = A;

    fn registry(&self) -> &Registry<A> {
        &self.registry
    }

    fn registry_mut(&mut self) -> &mut Registry<A> {
        &mut self.registry
    }

    fn refuse_observe(&self) -> Option<BindError> {
        self.triggered.then_some(BindError::AlreadyTriggered)
    }
}

/// Event that delivers its argument once, then refuses further use.
pub struct SingleEvent<A = ()> {
    core: Arc<Core<SingleState<A>>>,
}

impl<A> Clone for SingleEvent<A> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A: Send + Sync + 'static> SingleEvent<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    #[must_use]
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            core: Arc::new(Core::new(
                "SingleEvent",
                options,
                SingleState {
                    registry: Registry::new(),
                    triggered: false,
                },
            )),
        }
    }

    /// Call every active observer with `arg` and close the event.
    ///
    /// Returns the number of observers called.
    ///
    /// # Errors
    ///
    /// [`BindError::AlreadyTriggered`] on every call after the first.
    pub fn trigger(&self, arg: A) -> Result<usize> {
        self.core.run(move |core| {
            let drained = {
                let mut state = core.state.lock();
                if state.triggered {
                    None
                } else {
                    state.triggered = true;
                    Some(state.registry.drain())
                }
            };
            let Some(entries) = drained else {
                return core.violation(BindError::AlreadyTriggered);
            };
            let targets: Vec<(Observer<A>, Option<LifecycleToken>)> = entries
                .iter()
                .map(|entry| (entry.observer().clone(), entry.owner().cloned()))
                .collect();
            tracing::debug!(container = %core.label, observers = targets.len(), "single event triggered");
            release(entries);
            let mut delivered = 0;
            for (observer, owner) in &targets {
                // An earlier callback may have destroyed this owner.
                if owner.as_ref().is_some_and(|token| !token.is_active()) {
                    continue;
                }
                tracing::trace!(container = %core.label, observer = %observer.id(), "delivering event");
                observer.update(&arg);
                delivered += 1;
            }
            Ok(delivered)
        })
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.core.state.lock().triggered
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.core.label
    }
}

impl SingleEvent<()> {
    /// [`trigger`](Self::trigger) with no argument.
    ///
    /// # Errors
    ///
    /// [`BindError::AlreadyTriggered`] if the event already fired.
    pub fn fire(&self) -> Result<usize> {
        self.trigger(())
    }
}

impl<A: Send + Sync + 'static> Default for SingleEvent<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Send + Sync + 'static> Observable for SingleEvent<A> {
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

impl<A> fmt::Debug for SingleEvent<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("SingleEvent")
            .field("label", &self.core.label)
            .field("triggered", &state.triggered)
            .field("observers", &state.registry.active_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifebind_core::{Lifecycle, ViolationPolicy};
    use parking_lot::Mutex;
    use tracing_test::traced_test;

    fn counter() -> (Arc<Mutex<u32>>, impl Fn(&()) + Send + Sync) {
        let count = Arc::new(Mutex::new(0));
        let c = Arc::clone(&count);
        (count, move |_: &()| *c.lock() += 1)
    }

    #[test]
    fn triggers_once() {
        let event = SingleEvent::<()>::new();
        let (count, f) = counter();
        event.observe_forever(f).unwrap();

        assert_eq!(event.fire(), Ok(1));
        assert!(event.is_triggered());
        assert_eq!(event.fire(), Err(BindError::AlreadyTriggered));
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn late_registration_fails() {
        let event = SingleEvent::<()>::new();
        event.fire().unwrap();
        assert_eq!(
            event.observe_forever(|_| {}).map(|_| ()),
            Err(BindError::AlreadyTriggered)
        );
        assert_eq!(event.observer_count(), 0);
    }

    #[test]
    fn trigger_empties_registry_and_cancels_hooks() {
        let event = SingleEvent::<u8>::new();
        let owner = Lifecycle::new();
        let observer = event.observe(&owner, |_| {}).unwrap();
        assert_eq!(owner.hook_count(), 1);

        assert_eq!(event.trigger(3), Ok(1));
        assert_eq!(owner.hook_count(), 0);
        assert!(!event.contains(&observer));
        assert!(!event.remove(&observer));
    }

    #[test]
    fn destroyed_owner_not_delivered() {
        let event = SingleEvent::<()>::new();
        let owner = Lifecycle::new();
        let (count, f) = counter();
        event.observe(&owner, f).unwrap();
        owner.destroy();
        assert_eq!(event.fire(), Ok(0));
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn owner_destroyed_during_trigger_is_skipped() {
        let event = SingleEvent::<()>::new();
        let owner = Arc::new(Mutex::new(Some(Lifecycle::new())));
        let dropper = Arc::clone(&owner);
        event
            .observe_forever(move |_| {
                let taken = dropper.lock().take();
                drop(taken);
            })
            .unwrap();
        let (count, f) = counter();
        if let Some(lifecycle) = owner.lock().as_ref() {
            event.observe(lifecycle, f).unwrap();
        }

        assert_eq!(event.fire(), Ok(1));
        assert_eq!(*count.lock(), 0);
    }

    #[test]
    fn nested_trigger_from_callback_fails() {
        let event = SingleEvent::<()>::new();
        let handle = event.clone();
        let nested = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&nested);
        event
            .observe_forever(move |_| *slot.lock() = Some(handle.fire()))
            .unwrap();

        assert_eq!(event.fire(), Ok(1));
        assert_eq!(*nested.lock(), Some(Err(BindError::AlreadyTriggered)));
    }

    #[test]
    fn delivers_argument_to_all() {
        let event = SingleEvent::<String>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for _ in 0..3 {
            let sink = Arc::clone(&seen);
            event
                .observe_forever(move |s: &String| sink.lock().push(s.clone()))
                .unwrap();
        }
        assert_eq!(event.trigger("done".into()), Ok(3));
        assert_eq!(seen.lock().len(), 3);
    }

    #[test]
    #[should_panic(expected = "already triggered")]
    fn strict_second_trigger_panics() {
        let event =
            SingleEvent::<()>::with_options(ContainerOptions::new().with_policy(ViolationPolicy::Panic));
        let _ = event.fire();
        let _ = event.fire();
    }

    #[test]
    #[traced_test]
    fn trigger_is_logged() {
        let event = SingleEvent::<()>::new();
        event.fire().unwrap();
        assert!(logs_contain("single event triggered"));
    }
}
