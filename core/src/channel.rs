//! Instance state channel
//!
//! A single-slot, latest-value-wins pipeline from a state producer to one
//! subscriber, built on `tokio::sync::watch`. A publish overwrites whatever the
//! subscriber has not consumed yet, so a slow subscriber only ever sees the
//! newest value and the producer never blocks or queues.
//!
//! The subscriber side is an explicit [`Subscription`]. Cancelling it is
//! synchronous: once [`Subscription::cancel`] returns, the delivery callback is
//! not running and will never run again. A fresh subscription can be installed
//! on the same producer at any time (for example after a surface rebuild).

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Producer half: holds the current state and publishes updates
#[derive(Debug)]
pub struct StatePublisher<T> {
    tx: watch::Sender<T>,
}

impl<T> StatePublisher<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Replace the current value. Never blocks, never fails.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate the current value in place and notify the subscriber
    pub fn modify<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.tx.send_modify(f);
    }

    /// Mutate the current value; notify only if `f` returns true
    pub fn modify_if<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut T) -> bool,
    {
        self.tx.send_if_modified(f)
    }

    /// Snapshot of the current value
    pub fn current(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Whether a subscription is currently attached
    pub fn has_subscriber(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    /// Install a subscriber. `deliver` is called on a tokio task with the
    /// current value first, then with the latest value after every change.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, mut deliver: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();

        let gate = Arc::new(Mutex::new(true));
        let task_gate = Arc::clone(&gate);
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let value = rx.borrow_and_update().clone();
                let open = task_gate.lock().unwrap_or_else(PoisonError::into_inner);
                if !*open {
                    break;
                }
                // Delivery runs under the gate so cancel() waits for it
                deliver(value);
            }
        });

        Subscription {
            gate,
            task: Some(task),
        }
    }
}

/// Handle to an installed subscriber. Dropping it cancels the subscription.
#[derive(Debug)]
pub struct Subscription {
    gate: Arc<Mutex<bool>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop delivery. Returns after any in-flight delivery has finished.
    pub fn cancel(mut self) {
        self.close();
    }

    pub fn is_cancelled(&self) -> bool {
        !*self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn close(&mut self) {
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = false;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
