// Path: crates/threshold/src/completion.rs
//! The single completion signal of a protocol session.
//!
//! A session finishes from whichever path gets there first: the collector
//! reaching an outcome or the deadline firing. Only the first `finish` is
//! delivered; later ones report `false` and their value is dropped.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct Completion<T> {
    slot: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T: Send + 'static> Completion<T> {
    /// A fresh gate and the receiver its single value is delivered to.
    pub fn new() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                slot: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Delivers `value` if nothing was delivered yet. Returns whether it was.
    pub fn finish(&self, value: T) -> bool {
        match self.slot.lock().take() {
            Some(tx) => {
                // The waiter may have gone away; the session is over either way.
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.slot.lock().is_none()
    }

    /// Finishes the gate with `on_expiry()` once `after` has elapsed, unless
    /// it finished earlier. Abort the returned handle to disarm.
    pub fn arm_deadline<F>(self: &Arc<Self>, after: Duration, on_expiry: F) -> JoinHandle<()>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            gate.finish(on_expiry());
        })
    }
}
