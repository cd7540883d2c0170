#![forbid(unsafe_code)]

//! `LiveData` that mirrors other `LiveData` sources.
//!
//! A [`MediatorLiveData`] registers one forwarding observer on each source.
//! Whatever a source delivers is `set` on the mediator, so the mediator's
//! own observers see a merged stream of every source's updates.
//!
//! The forwarding observer holds the mediator weakly; sources never keep a
//! mediator alive. Dropping the mediator unregisters it from every source it
//! still has.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use lifebind_core::{Observer, Result};
use parking_lot::Mutex;

use crate::config::ContainerOptions;
use crate::live_data::LiveData;
use crate::observable::Observable;

/// A [`LiveData`] fed by other `LiveData` sources.
pub struct MediatorLiveData<T: Clone + Send + Sync + 'static> {
    live: LiveData<T>,
    forward: Observer<T>,
    sources: Mutex<Vec<LiveData<T>>>,
}

impl<T: Clone + Send + Sync + 'static> MediatorLiveData<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::with_options(value, ContainerOptions::default())
    }

    #[must_use]
    pub fn with_options(value: T, options: ContainerOptions) -> Self {
        let options = ContainerOptions {
            label: Some(
                options
                    .label
                    .clone()
                    .unwrap_or_else(|| "MediatorLiveData".to_string()),
            ),
            ..options
        };
        let live = LiveData::with_options(value, options);
        let target = Arc::downgrade(&live.core);
        let forward = Observer::new(move |value: &T| {
            if let Some(core) = target.upgrade() {
                LiveData { core }.set(value.clone());
            }
        });
        Self {
            live,
            forward,
            sources: Mutex::new(Vec::new()),
        }
    }

    /// Start mirroring `source`.
    ///
    /// # Errors
    ///
    /// [`BindError::AlreadyRegistered`](lifebind_core::BindError::AlreadyRegistered)
    /// if `source` already feeds this mediator.
    pub fn add_source(&self, source: &LiveData<T>) -> Result<()> {
        source.observe_forever_with(self.forward.clone())?;
        self.sources.lock().push(source.clone());
        tracing::trace!(mediator = %self.live.label(), source = %source.label(), "source added");
        Ok(())
    }

    /// Stop mirroring `source`. Returns whether it was a source.
    pub fn remove_source(&self, source: &LiveData<T>) -> bool {
        let removed = {
            let mut sources = self.sources.lock();
            sources
                .iter()
                .position(|s| s.same_as(source))
                .map(|idx| sources.remove(idx))
        };
        match removed {
            Some(source) => {
                source.remove(&self.forward);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.lock().len()
    }

    /// The underlying `LiveData` handle.
    #[must_use]
    pub fn as_live_data(&self) -> &LiveData<T> {
        &self.live
    }
}

impl<T: Clone + Send + Sync + 'static> Deref for MediatorLiveData<T> {
    type Target = LiveData<T>;

    fn deref(&self) -> &LiveData<T> {
        &self.live
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for MediatorLiveData<T> {
    fn drop(&mut self) {
        let sources = std::mem::take(self.sources.get_mut());
        for source in sources {
            let _ = source.core.remove(self.forward.id());
        }
    }
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> fmt::Debug for MediatorLiveData<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediatorLiveData")
            .field("live", &self.live)
            .field("sources", &self.sources.lock().len())
            .finish()
    }
}
