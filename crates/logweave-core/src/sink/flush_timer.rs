//! Recurring timer driving periodic flushes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct TimerState {
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

/// Calls `tick` every `interval` on a named thread until stopped or dropped.
pub(crate) struct FlushTimer {
    state: Arc<TimerState>,
    worker: Option<JoinHandle<()>>,
}

impl FlushTimer {
    pub(crate) fn start<F>(name: &str, interval: Duration, tick: F) -> std::io::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let state = Arc::new(TimerState::default());
        let shared = state.clone();

        let worker = thread::Builder::new()
            .name(format!("{name}.flush"))
            .spawn(move || {
                let mut stopped = shared.stopped.lock();
                while !*stopped {
                    let timed_out = shared.wakeup.wait_for(&mut stopped, interval).timed_out();
                    if *stopped {
                        break;
                    }
                    if timed_out {
                        parking_lot::MutexGuard::unlocked(&mut stopped, &tick);
                    }
                }
            })?;

        Ok(Self {
            state,
            worker: Some(worker),
        })
    }

    pub(crate) fn stop(&mut self) {
        *self.state.stopped.lock() = true;
        self.state.wakeup.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
