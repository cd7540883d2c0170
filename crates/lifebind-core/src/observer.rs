#![forbid(unsafe_code)]

//! Identity-bearing update callbacks.
//!
//! An [`Observer<T>`] is a shared `Fn(&T)` plus an [`ObserverId`]. Containers
//! key their registrations by the id, so cloning an observer (or building a
//! new one with [`Observer::with_identity`]) yields something the container
//! treats as the same registration.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, process-unique observer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    /// Allocate a fresh identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a caller-chosen raw identity.
    ///
    /// Raw identities are not checked against allocated ones; mixing the two
    /// is the caller's business.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obs#{}", self.0)
    }
}

type UpdateFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// An update callback with identity.
///
/// Equality and hashing look at the identity only.
pub struct Observer<T> {
    id: ObserverId,
    update: UpdateFn<T>,
}

impl<T> Observer<T> {
    /// Wrap `update` with a freshly allocated identity.
    pub fn new(update: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self::with_identity(ObserverId::next(), update)
    }

    /// Wrap `update` with the given identity.
    pub fn with_identity(id: ObserverId, update: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self {
            id,
            update: Arc::new(update),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Invoke the callback.
    pub fn update(&self, value: &T) {
        (self.update)(value);
    }
}

// Manual Clone: `T` itself need not be Clone.
impl<T> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            update: Arc::clone(&self.update),
        }
    }
}

impl<T> PartialEq for Observer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Observer<T> {}

impl<T> Hash for Observer<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish_non_exhaustive()
    }
}
