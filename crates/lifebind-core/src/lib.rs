#![forbid(unsafe_code)]

//! Core: observer identity, owner lifecycles, and lifecycle-bound observers.
//!
//! # Role in lifebind
//! `lifebind-core` holds the building blocks every container shares. The
//! containers themselves (`LiveData`, `FutureEvent`, `SingleEvent`) live in
//! `lifebind-runtime` and only ever talk to observers through the types here.
//!
//! # Primary responsibilities
//! - **Observer**: an update callback with a stable identity.
//! - **Lifecycle**: an owner handle whose destruction deactivates observers
//!   bound to it, plus the non-owning [`LifecycleToken`] that observers hold.
//! - **LifecycleBoundObserver**: pairs an observer with an optional owner and
//!   the last version delivered to it.
//! - **BindError / ViolationPolicy**: how contract violations surface.

pub mod bound;
pub mod config;
pub mod error;
pub mod lifecycle;
#[cfg(feature = "logging")]
pub mod logging;
pub mod observer;
pub mod state_value;

pub use bound::{LifecycleBoundObserver, START_VERSION, Version};
pub use config::ViolationPolicy;
pub use error::{BindError, Result};
pub use lifecycle::{HookId, Lifecycle, LifecycleOwner, LifecycleState, LifecycleToken};
pub use observer::{Observer, ObserverId};
pub use state_value::StateValue;
