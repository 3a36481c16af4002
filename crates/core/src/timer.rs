//! Cancellable wait timer.
//!
//! The controller owns one `WaitTimer`. Arming it spawns a sleep task that
//! reports back through the controller's signal channel with the epoch it
//! was armed with. Ticks carrying an older epoch are ignored, so a timeout
//! resolves at most once and a cancelled wait never fires.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Identifies a bounded wait: the step it belongs to and what it waits for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitKey {
    pub step_index: usize,
    pub name: String,
}

/// Sent by the sleep task when the budget is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Armed {
    /// A new deadline was set.
    New,
    /// The same wait was already pending; its deadline is unchanged.
    Kept,
}

#[derive(Debug)]
struct Pending {
    key: WaitKey,
    epoch: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

pub struct WaitTimer<S> {
    tx: mpsc::UnboundedSender<S>,
    wrap: fn(Tick) -> S,
    epoch: u64,
    pending: Option<Pending>,
}

impl<S: Send + 'static> WaitTimer<S> {
    pub fn new(tx: mpsc::UnboundedSender<S>, wrap: fn(Tick) -> S) -> Self {
        Self {
            tx,
            wrap,
            epoch: 0,
            pending: None,
        }
    }

    /// Arms the timer for `key`.
    ///
    /// Re-arming with the key of the pending wait keeps its deadline; any
    /// other key cancels the pending wait first.
    pub fn arm(&mut self, key: WaitKey, budget: Duration) -> Armed {
        if self.pending.as_ref().is_some_and(|p| p.key == key) {
            return Armed::Kept;
        }

        self.cancel();

        let epoch = self.epoch;
        let tx = self.tx.clone();
        let signal = (self.wrap)(Tick { epoch });
        let deadline = Instant::now() + budget;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            // the receiver is gone when the controller has shut down
            let _ = tx.send(signal);
        });

        self.pending = Some(Pending {
            key,
            epoch,
            deadline,
            handle,
        });
        Armed::New
    }

    /// Cancels the pending wait, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
        self.epoch += 1;
    }

    /// Consumes a tick. Returns the key of the wait that timed out, or
    /// `None` if the tick is stale.
    pub fn fire(&mut self, tick: Tick) -> Option<WaitKey> {
        match &self.pending {
            Some(pending) if pending.epoch == tick.epoch => {
                let key = pending.key.clone();
                self.pending = None;
                self.epoch += 1;
                Some(key)
            }
            _ => None,
        }
    }

    pub fn pending_key(&self) -> Option<&WaitKey> {
        self.pending.as_ref().map(|p| &p.key)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }
}

impl<S> Drop for WaitTimer<S> {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.abort();
        }
    }
}

/// Sends `signal` after `delay` unless the returned handle is aborted.
pub fn schedule<S: Send + 'static>(
    tx: &mpsc::UnboundedSender<S>,
    delay: Duration,
    signal: S,
) -> JoinHandle<()> {
    let tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(signal);
    })
}
