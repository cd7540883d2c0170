#![forbid(unsafe_code)]

//! Lifecycle-aware observable values and events.
//!
//! Observers registered on a container can be bound to an owner. Once the
//! owner's [`Lifecycle`] is destroyed (or dropped), its observers stop
//! receiving updates and leave the container.
//!
//! # Example
//!
//! ```
//! use lifebind::prelude::*;
//!
//! let screen = Lifecycle::labeled("profile");
//! let name = LiveData::new(String::from("anonymous"));
//!
//! name.observe(&screen, |n: &String| println!("render {n}")).unwrap();
//! name.set("jan".into());
//!
//! drop(screen);
//! assert_eq!(name.set("petr".into()), 0);
//! ```

pub use lifebind_core::{
    BindError, HookId, Lifecycle, LifecycleBoundObserver, LifecycleOwner, LifecycleState,
    LifecycleToken, Observer, ObserverId, Result, START_VERSION, StateValue, Version,
    ViolationPolicy,
};
pub use lifebind_runtime::{
    ContainerOptions, FutureEvent, LiveData, LiveOptionalData, LiveOptionalStateData,
    LiveStateData, MainQueue, Marshal, MediatorLiveData, Observable, QueueClosed, SingleEvent,
};

#[cfg(feature = "logging")]
pub use lifebind_core::logging;

pub mod prelude {
    pub use lifebind_core::{
        BindError, Lifecycle, LifecycleOwner, Observer, StateValue, ViolationPolicy,
    };
    pub use lifebind_runtime::{
        ContainerOptions, FutureEvent, LiveData, LiveOptionalData, LiveStateData,
        MediatorLiveData, Observable, SingleEvent,
    };
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Profile {
        lifecycle: Lifecycle,
    }

    impl LifecycleOwner for Profile {
        fn lifecycle(&self) -> &Lifecycle {
            &self.lifecycle
        }
    }

    #[test]
    fn prelude_covers_common_flow() {
        let profile = Profile {
            lifecycle: Lifecycle::new(),
        };
        let name = LiveData::new("anonymous".to_string());
        let saved = SingleEvent::<()>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        name.observe(&profile, move |n: &String| sink.lock().push(n.clone()))
            .unwrap();
        let sink = Arc::clone(&seen);
        saved
            .observe(&profile, move |()| sink.lock().push("saved".to_string()))
            .unwrap();

        name.dispatch();
        name.set("jan".into());
        saved.fire().unwrap();
        drop(profile);
        name.set("petr".into());

        assert_eq!(*seen.lock(), vec!["anonymous", "jan", "saved"]);
    }

    #[cfg(feature = "logging")]
    #[test]
    fn logging_init_is_idempotent() {
        let _ = crate::logging::init();
        assert!(!crate::logging::init());
    }
}
