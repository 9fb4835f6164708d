//! One-shot retransmission timer.
//!
//! Runs on a dedicated background thread parked on a condition variable.
//! A generation counter distinguishes the deadline currently in force
//! from one superseded by a later `arm`/`cancel`, so a wakeup racing a
//! fresh `arm` call cannot fire the stale callback.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

struct State {
    /// `Some(deadline)` while armed, `None` while idle or shut down.
    deadline: Option<Instant>,
    generation: u64,
    shutdown: bool,
}

/// A clonable, thread-safe arm/cancel handle. The retransmit callback
/// receives one of these so it can re-arm the timer for the next
/// deadline itself, without needing a reference back to the owning
/// [`RetransmitTimer`].
#[derive(Clone)]
pub struct TimerHandle {
    state: Arc<Mutex<State>>,
    condvar: Arc<Condvar>,
}

impl TimerHandle {
    /// Arms (or re-arms, atomically replacing any existing deadline) the
    /// timer to fire after `delay`.
    pub fn arm(&self, delay: Duration) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.deadline = Some(Instant::now() + delay);
        state.generation += 1;
        self.condvar.notify_all();
    }

    /// Cancels any pending deadline. A no-op if already idle.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.deadline = None;
        state.generation += 1;
        self.condvar.notify_all();
    }
}

/// A cancellable, re-armable one-shot timer bound to a single callback.
pub struct RetransmitTimer {
    handle: TimerHandle,
    /// Behind a mutex (rather than a plain field) so [`Self::shutdown`]
    /// can take and join the handle through a shared reference — the
    /// owning [`crate::sender::Sender`] is itself shared via `Arc`.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl RetransmitTimer {
    /// Spawns the background thread. `on_fire` is invoked (off the
    /// caller's thread) every time the armed deadline elapses without an
    /// intervening cancel or re-arm; it is passed a [`TimerHandle`] so it
    /// can re-arm the next deadline (the GBN retransmission rule always
    /// does).
    pub fn new<F>(on_fire: F) -> Self
    where
        F: Fn(&TimerHandle) + Send + 'static,
    {
        let state = Arc::new(Mutex::new(State {
            deadline: None,
            generation: 0,
            shutdown: false,
        }));
        let condvar = Arc::new(Condvar::new());
        let handle = TimerHandle { state, condvar };

        let worker_handle = handle.clone();
        let worker = thread::Builder::new()
            .name("rdt-retransmit-timer".into())
            .spawn(move || run(worker_handle, on_fire))
            .expect("failed to spawn retransmit timer thread");

        RetransmitTimer {
            handle,
            worker: Mutex::new(Some(worker)),
        }
    }

    pub fn arm(&self, delay: Duration) {
        self.handle.arm(delay);
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Cancels any pending deadline, stops the background thread, and
    /// joins it. Idempotent: a second call finds the worker already
    /// taken and simply re-notifies a thread that is no longer there.
    pub fn shutdown(&self) {
        {
            let mut state = self.handle.state.lock().unwrap_or_else(|e| e.into_inner());
            state.deadline = None;
            state.shutdown = true;
            state.generation += 1;
        }
        self.handle.condvar.notify_all();
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(worker) = worker {
            let _ = worker.join();
        }
    }
}

impl Drop for RetransmitTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<F>(handle: TimerHandle, on_fire: F)
where
    F: Fn(&TimerHandle),
{
    let mut guard = handle.state.lock().unwrap_or_else(|e| e.into_inner());
    loop {
        if guard.shutdown {
            return;
        }
        match guard.deadline {
            None => {
                guard = handle.condvar.wait(guard).unwrap_or_else(|e| e.into_inner());
            }
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    let fired_generation = guard.generation;
                    drop(guard);
                    on_fire(&handle);
                    guard = handle.state.lock().unwrap_or_else(|e| e.into_inner());
                    // Only clear the deadline if nothing re-armed/cancelled
                    // while the callback ran.
                    if guard.generation == fired_generation {
                        guard.deadline = None;
                    }
                } else {
                    let (g, _timeout_result) = handle
                        .condvar
                        .wait_timeout(guard, deadline - now)
                        .unwrap_or_else(|e| e.into_inner());
                    guard = g;
                }
            }
        }
    }
}
