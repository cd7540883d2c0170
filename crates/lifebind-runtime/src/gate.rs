#![forbid(unsafe_code)]

//! The serialization domain every container operation runs in.
//!
//! Two modes, chosen per container through [`Marshal`]:
//!
//! - **Lock** (default): a re-entrant lock is held for the whole operation,
//!   callback delivery included. The thread already holding it may re-enter
//!   (a callback calling `set` on the same container), other threads wait.
//! - **Queue**: the operation runs on the thread owned by a [`MainQueue`].
//!   Called from that thread it runs inline; from any other thread it is sent
//!   there and the caller blocks until it finishes. Callbacks therefore always
//!   observe the queue thread.
//!
//! # Failure Modes
//!
//! - **Queue gone**: if the queue was shut down the operation runs inline
//!   under the lock and a warning is logged.
//! - **Panicking job**: a panic on the queue thread is caught and resumed on
//!   the calling thread, so the queue keeps serving.
//! - **Cross-thread cycles**: a callback on the queue thread that blocks on a
//!   thread waiting for the queue deadlocks. Same for two threads that each
//!   hold one container's lock and want the other's.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, mpsc};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Mutex, ReentrantMutex};

type Job = Box<dyn FnOnce() + Send>;

/// Where container operations execute.
#[derive(Debug, Clone, Default)]
pub enum Marshal {
    /// Serialize with a re-entrant lock on the calling thread.
    #[default]
    Lock,
    /// Run everything on the queue's thread.
    Queue(MainQueue),
}

/// Returned by [`MainQueue::run_sync`] when the queue no longer accepts work.
/// Carries the closure back so the caller can run it elsewhere.
pub struct QueueClosed<F>(pub F);

impl<F> fmt::Debug for QueueClosed<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueClosed")
    }
}

struct QueueInner {
    name: String,
    thread_id: ThreadId,
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        // Closing the channel ends the worker loop. Not joined: the last
        // handle may be dropped on the worker itself.
        self.sender.get_mut().take();
    }
}

/// A designated thread that runs container operations one at a time.
///
/// Cloning shares the same thread. The thread exits once
/// [`shutdown`](Self::shutdown) is called or every handle is dropped.
#[derive(Clone)]
pub struct MainQueue {
    inner: Arc<QueueInner>,
}

impl MainQueue {
    /// Spawn the queue thread.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Job>();
        let worker_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            tracing::debug!(queue = %worker_name, "main queue started");
            for job in rx {
                job();
            }
            tracing::debug!(queue = %worker_name, "main queue stopped");
        })?;
        let thread_id = handle.thread().id();
        Ok(Self {
            inner: Arc::new(QueueInner {
                name,
                thread_id,
                sender: Mutex::new(Some(tx)),
                handle: Mutex::new(Some(handle)),
            }),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the calling thread is the queue thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    /// Whether the queue still accepts work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.sender.lock().is_some()
    }

    /// Run `f` on the queue thread and wait for its result.
    ///
    /// Runs inline when already on the queue thread.
    ///
    /// # Panics
    ///
    /// Resumes a panic raised by `f` on the queue thread.
    pub fn run_sync<R, F>(&self, f: F) -> Result<R, QueueClosed<F>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_current() {
            return Ok(f());
        }

        let slot = Arc::new(Mutex::new(Some(f)));
        let job_slot = Arc::clone(&slot);
        let (tx, rx) = mpsc::sync_channel(1);
        let job: Job = Box::new(move || {
            let f = job_slot.lock().take();
            if let Some(f) = f {
                let _ = tx.send(panic::catch_unwind(AssertUnwindSafe(f)));
            }
        });

        let sent = match self.inner.sender.lock().as_ref() {
            Some(sender) => sender.send(job).is_ok(),
            None => false,
        };
        if sent {
            match rx.recv() {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(payload)) => panic::resume_unwind(payload),
                // Dropped unrun during shutdown; the closure is still in the slot.
                Err(_) => {}
            }
        }

        let f = slot.lock().take();
        match f {
            Some(f) => Err(QueueClosed(f)),
            None => unreachable!("queue job consumed without reporting a result"),
        }
    }

    /// Stop accepting work and wait for queued jobs to finish.
    ///
    /// Does not wait when called from the queue thread itself.
    pub fn shutdown(&self) {
        self.inner.sender.lock().take();
        if self.is_current() {
            return;
        }
        let handle = self.inner.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainQueue")
            .field("name", &self.inner.name)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Per-container gate built from a [`Marshal`].
pub(crate) struct Gate {
    lock: Arc<ReentrantMutex<()>>,
    queue: Option<MainQueue>,
}

impl Gate {
    pub(crate) fn new(marshal: Marshal) -> Self {
        let queue = match marshal {
            Marshal::Lock => None,
            Marshal::Queue(queue) => Some(queue),
        };
        Self {
            lock: Arc::new(ReentrantMutex::new(())),
            queue,
        }
    }

    /// Run `f` inside the serialization domain.
    pub(crate) fn run<R, F>(&self, f: F) -> R
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let lock = Arc::clone(&self.lock);
        let locked = move || {
            let _guard = lock.lock();
            f()
        };
        match &self.queue {
            Some(queue) => match queue.run_sync(locked) {
                Ok(value) => value,
                Err(QueueClosed(locked)) => {
                    tracing::warn!(queue = queue.name(), "main queue closed, running inline");
                    locked()
                }
            },
            None => locked(),
        }
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate").field("queue", &self.queue).finish()
    }
}
