#![forbid(unsafe_code)]

//! The observation API every container implements.

use lifebind_core::{LifecycleOwner, Observer, Result};

/// Register and remove observers.
///
/// Each observer identity may be registered once per container. An observer
/// bound to an owner stops receiving updates once the owner is destroyed and
/// is removed from the container at that point.
pub trait Observable {
    /// Value passed to observers.
    type Item: 'static;

    /// Observe until `owner` is destroyed or the observer is removed.
    fn observe_with<O>(&self, owner: &O, observer: Observer<Self::Item>) -> Result<()>
    where
        O: LifecycleOwner + ?Sized;

    /// Observe until the observer is removed.
    fn observe_forever_with(&self, observer: Observer<Self::Item>) -> Result<()>;

    /// Unregister `observer`. Returns `false` if it was not registered or its
    /// owner is already destroyed.
    fn remove(&self, observer: &Observer<Self::Item>) -> bool;

    /// Registered and its owner (if any) alive.
    fn contains(&self, observer: &Observer<Self::Item>) -> bool;

    /// Number of active registrations.
    fn observer_count(&self) -> usize;

    /// Wrap `on_update` in a new observer bound to `owner` and register it.
    fn observe<O>(
        &self,
        owner: &O,
        on_update: impl Fn(&Self::Item) + Send + Sync + 'static,
    ) -> Result<Observer<Self::Item>>
    where
        O: LifecycleOwner + ?Sized,
    {
        let observer = Observer::new(on_update);
        self.observe_with(owner, observer.clone())?;
        Ok(observer)
    }

    /// Wrap `on_update` in a new observer and register it with no owner.
    fn observe_forever(
        &self,
        on_update: impl Fn(&Self::Item) + Send + Sync + 'static,
    ) -> Result<Observer<Self::Item>> {
        let observer = Observer::new(on_update);
        self.observe_forever_with(observer.clone())?;
        Ok(observer)
    }
}
