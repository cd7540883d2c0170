#![forbid(unsafe_code)]

//! Owner lifecycles.
//!
//! A [`Lifecycle`] is the handle an owner (a view, a view model, a screen)
//! keeps for as long as it is alive. Observers bound to it hold a
//! [`LifecycleToken`], which never keeps the owner alive and reports
//! [`LifecycleState::Destroyed`] once the owner is destroyed or dropped.
//!
//! Tokens can register destroy hooks. Containers use them to drop a
//! registration as soon as its owner goes away instead of waiting for the
//! next dispatch to purge it.
//!
//! # Invariants
//!
//! 1. `destroy()` is idempotent. Hooks run exactly once, in registration
//!    order, on the thread that destroys the owner.
//! 2. Hooks run after the lifecycle's own lock is released, so a hook may
//!    register further hooks (they run immediately) or cancel others.
//! 3. A hook registered on an already destroyed (or dropped) owner runs
//!    immediately and no [`HookId`] is returned.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Lifecycle state of an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// The owner is alive.
    Active,
    /// The owner was destroyed or dropped.
    Destroyed,
}

/// Handle for a registered destroy hook, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

type Hook = Box<dyn FnOnce() + Send>;

struct LifecycleCore {
    destroyed: bool,
    next_hook: u64,
    hooks: Vec<(HookId, Hook)>,
}

struct LifecycleInner {
    label: Option<String>,
    core: Mutex<LifecycleCore>,
}

impl LifecycleInner {
    fn destroy(&self) {
        let hooks = {
            let mut core = self.core.lock();
            if core.destroyed {
                return;
            }
            core.destroyed = true;
            std::mem::take(&mut core.hooks)
        };
        tracing::debug!(
            owner = self.label.as_deref().unwrap_or("<unlabeled>"),
            hooks = hooks.len(),
            "lifecycle destroyed"
        );
        for (_, hook) in hooks {
            hook();
        }
    }

    fn is_destroyed(&self) -> bool {
        self.core.lock().destroyed
    }
}

/// Owner handle. Destroyed explicitly via [`destroy`](Self::destroy) or when
/// dropped.
///
/// Not `Clone`: one owner, one handle. Hand out [`LifecycleToken`]s instead.
pub struct Lifecycle {
    inner: Arc<LifecycleInner>,
}

impl Lifecycle {
    /// Create a live owner handle.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a live owner handle with a label used in logs and `Debug`.
    #[must_use]
    pub fn labeled(label: impl Into<String>) -> Self {
        Self::build(Some(label.into()))
    }

    fn build(label: Option<String>) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                label,
                core: Mutex::new(LifecycleCore {
                    destroyed: false,
                    next_hook: 0,
                    hooks: Vec::new(),
                }),
            }),
        }
    }

    /// A non-owning token observing this lifecycle.
    #[must_use]
    pub fn token(&self) -> LifecycleToken {
        LifecycleToken {
            inner: Arc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        if self.is_destroyed() {
            LifecycleState::Destroyed
        } else {
            LifecycleState::Active
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed()
    }

    /// Mark the owner destroyed and run every pending hook.
    pub fn destroy(&self) {
        self.inner.destroy();
    }

    /// Number of hooks waiting for destruction.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        self.inner.core.lock().hooks.len()
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.inner.destroy();
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("Lifecycle")
            .field("label", &self.inner.label)
            .field("destroyed", &core.destroyed)
            .field("hooks", &core.hooks.len())
            .finish()
    }
}

/// Non-owning reference to a [`Lifecycle`].
#[derive(Clone)]
pub struct LifecycleToken {
    inner: Weak<LifecycleInner>,
}

impl LifecycleToken {
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        match self.inner.upgrade() {
            Some(inner) if !inner.is_destroyed() => LifecycleState::Active,
            _ => LifecycleState::Destroyed,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// Run `hook` when the owner is destroyed.
    ///
    /// Returns `None`, after running `hook` inline, if the owner is already
    /// gone.
    pub fn on_destroy(&self, hook: impl FnOnce() + Send + 'static) -> Option<HookId> {
        let Some(inner) = self.inner.upgrade() else {
            hook();
            return None;
        };
        let mut core = inner.core.lock();
        if core.destroyed {
            drop(core);
            hook();
            return None;
        }
        core.next_hook += 1;
        let id = HookId(core.next_hook);
        core.hooks.push((id, Box::new(hook)));
        Some(id)
    }

    /// Drop a pending hook without running it. Returns whether it was pending.
    pub fn cancel(&self, id: HookId) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut core = inner.core.lock();
        match core.hooks.iter().position(|(hook_id, _)| *hook_id == id) {
            Some(idx) => {
                core.hooks.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether both tokens observe the same owner.
    #[must_use]
    pub fn same_owner(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn label(&self) -> Option<String> {
        self.inner.upgrade().and_then(|inner| inner.label.clone())
    }
}

impl fmt::Debug for LifecycleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleToken")
            .field("owner", &self.label())
            .field("state", &self.state())
            .finish()
    }
}

/// Anything that owns a [`Lifecycle`].
///
/// View models usually embed a `Lifecycle` field and return it here, so they
/// can be passed directly as the owner of an observation.
pub trait LifecycleOwner {
    fn lifecycle(&self) -> &Lifecycle;
}

impl LifecycleOwner for Lifecycle {
    fn lifecycle(&self) -> &Lifecycle {
        self
    }
}

impl<O: LifecycleOwner + ?Sized> LifecycleOwner for &O {
    fn lifecycle(&self) -> &Lifecycle {
        (**self).lifecycle()
    }
}

impl<O: LifecycleOwner + ?Sized> LifecycleOwner for Arc<O> {
    fn lifecycle(&self) -> &Lifecycle {
        (**self).lifecycle()
    }
}
