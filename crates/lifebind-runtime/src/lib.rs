#![forbid(unsafe_code)]

//! Lifecycle-aware observable containers.
//!
//! # Role in lifebind
//! `lifebind-runtime` builds the containers on top of `lifebind-core`:
//!
//! - [`LiveData`]: a versioned value. Each version reaches each observer at
//!   most once.
//! - [`MediatorLiveData`]: a `LiveData` fed by other `LiveData` sources.
//! - [`FutureEvent`]: a multicast event, triggerable any number of times.
//! - [`SingleEvent`]: a multicast event that fires once.
//!
//! All of them register observers through the same registry and run every
//! operation through a gate selected by [`Marshal`]: a re-entrant lock by
//! default, or a dedicated [`MainQueue`] thread.

pub mod config;
pub mod future_event;
pub mod gate;
pub mod live_data;
pub mod mediator;
pub mod observable;
mod registry;
pub mod single_event;

pub use config::ContainerOptions;
pub use future_event::FutureEvent;
pub use gate::{MainQueue, Marshal, QueueClosed};
pub use live_data::{LiveData, LiveOptionalData, LiveOptionalStateData, LiveStateData};
pub use mediator::MediatorLiveData;
pub use observable::Observable;
pub use single_event::SingleEvent;
