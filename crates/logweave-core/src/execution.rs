//! How a sink runs its work: inline under a re-entrant lock, or on a private
//! single-worker queue.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::{mpsc, oneshot};

use crate::error::LogResult;

type Job = Box<dyn FnOnce() + Send + 'static>;

enum QueueMessage {
    Run(Job),
    Barrier(oneshot::Sender<()>),
}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: Cell<u64> = const { Cell::new(0) };
    static CURRENT_QUEUE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Small, process-unique number for the calling thread.
pub fn current_thread_number() -> u64 {
    THREAD_ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}

/// Label of the serial queue the caller is running on, empty elsewhere.
pub fn current_queue_label() -> String {
    CURRENT_QUEUE.with(|label| label.borrow().clone().unwrap_or_default())
}

/// Descriptive identity of the calling thread, stored in `LogEntity::thread`.
pub fn current_thread_info() -> String {
    let current = thread::current();
    let name = current.name().unwrap_or_default();
    format!(
        "ThreadInfo: isMain:{}; name:{}; id:{}; queue:{}",
        name == "main",
        name,
        current_thread_number(),
        current_queue_label()
    )
}

struct QueueInner {
    label: String,
    sender: Mutex<Option<mpsc::UnboundedSender<QueueMessage>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl Drop for QueueInner {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.sender.lock().take();

        if let Some(worker) = self.worker.lock().take() {
            if thread::current().id() != self.worker_id {
                let _ = worker.join();
            }
        }
    }
}

/// A strictly ordered queue served by one named worker thread.
///
/// Cloning shares the queue. When the last handle drops, already queued jobs
/// still run and the worker is joined.
#[derive(Clone)]
pub struct SerialQueue {
    inner: Arc<QueueInner>,
}

impl SerialQueue {
    pub fn new(label: impl Into<String>) -> LogResult<Self> {
        let label = label.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<QueueMessage>();
        let worker_label = label.clone();

        let worker = thread::Builder::new()
            .name(label.clone())
            .spawn(move || {
                CURRENT_QUEUE.with(|current| *current.borrow_mut() = Some(worker_label.clone()));

                while let Some(message) = receiver.blocking_recv() {
                    match message {
                        QueueMessage::Run(job) => {
                            if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                                tracing::error!(queue = %worker_label, "Queued log job panicked");
                            }
                        }
                        QueueMessage::Barrier(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })?;

        let worker_id = worker.thread().id();
        Ok(Self {
            inner: Arc::new(QueueInner {
                label,
                sender: Mutex::new(Some(sender)),
                worker: Mutex::new(Some(worker)),
                worker_id,
            }),
        })
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Some(sender) = self.inner.sender.lock().as_ref() {
            if sender.send(QueueMessage::Run(Box::new(job))).is_err() {
                tracing::warn!(queue = %self.inner.label, "Serial queue worker is gone, job dropped");
            }
        }
    }

    /// Block until every job submitted before this call has run.
    ///
    /// Returns immediately when called from the worker itself. Must not be
    /// called from inside an async runtime.
    pub fn wait_until_idle(&self) {
        if thread::current().id() == self.inner.worker_id {
            return;
        }

        let (done, wait) = oneshot::channel();
        let sent = self
            .inner
            .sender
            .lock()
            .as_ref()
            .map(|sender| sender.send(QueueMessage::Barrier(done)).is_ok())
            .unwrap_or(false);

        if sent {
            let _ = wait.blocking_recv();
        }
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.inner.label)
            .finish()
    }
}

/// Execution strategy chosen per sink.
#[derive(Clone)]
pub enum ExecutionMethod {
    /// Run inline under a re-entrant lock. Nested calls from the same thread
    /// do not deadlock.
    Synchronous(Arc<ReentrantMutex<()>>),
    /// Run later, in submission order, on a private worker.
    Asynchronous(SerialQueue),
}

impl ExecutionMethod {
    pub fn synchronous() -> Self {
        ExecutionMethod::Synchronous(Arc::new(ReentrantMutex::new(())))
    }

    pub fn asynchronous(label: impl Into<String>) -> LogResult<Self> {
        Ok(ExecutionMethod::Asynchronous(SerialQueue::new(label)?))
    }

    pub fn perform<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            ExecutionMethod::Synchronous(lock) => {
                let _guard = lock.lock();
                work();
            }
            ExecutionMethod::Asynchronous(queue) => queue.submit(work),
        }
    }

    /// Wait for queued work to finish. A no-op for the synchronous method.
    pub fn wait_until_idle(&self) {
        if let ExecutionMethod::Asynchronous(queue) = self {
            queue.wait_until_idle();
        }
    }
}

impl Default for ExecutionMethod {
    fn default() -> Self {
        Self::synchronous()
    }
}

impl std::fmt::Debug for ExecutionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMethod::Synchronous(_) => f.write_str("Synchronous"),
            ExecutionMethod::Asynchronous(queue) => {
                f.debug_tuple("Asynchronous").field(queue).finish()
            }
        }
    }
}
