//! # Background Loop Slots
//!
//! Each background loop (reconnect, progress poller, pending drain) lives in
//! a [`LoopSlot`]. Starting a loop replaces whatever ran in the slot before.
//!
//! ```text
//!  slot.spawn(f) ──► generation += 1 ──► abort previous task ──► spawn f(token)
//!
//!  inside the task:  token.is_current()  == false once the slot moved on
//! ```
//!
//! Abort only takes effect at the task's next `.await`, so a superseded loop
//! may still be running synchronous code. Loops check their token before
//! publishing anything.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

/// Proof of which generation a loop was started under.
#[derive(Debug, Clone)]
pub struct LoopToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl LoopToken {
    /// True while no newer loop has been started (or the slot cancelled).
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Holder for at most one running instance of a named loop.
#[derive(Debug)]
pub struct LoopSlot {
    name: &'static str,
    current: Arc<AtomicU64>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl LoopSlot {
    pub fn new(name: &'static str) -> Self {
        LoopSlot {
            name,
            current: Arc::new(AtomicU64::new(0)),
            handle: Mutex::new(None),
        }
    }

    /// Starts `f` as the slot's loop, aborting the previous one.
    pub fn spawn<F, Fut>(&self, f: F) -> u64
    where
        F: FnOnce(LoopToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());

        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = handle.take() {
            previous.abort();
        }

        let token = LoopToken {
            generation,
            current: Arc::clone(&self.current),
        };
        *handle = Some(tokio::spawn(f(token)));

        debug!(slot = self.name, generation, "Loop started");
        generation
    }

    /// Stops the slot's loop, if any.
    pub fn cancel(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(|e| e.into_inner());
        self.current.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = handle.take() {
            previous.abort();
            debug!(slot = self.name, "Loop cancelled");
        }
    }

    /// True if a loop was started and has not finished.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Drop for LoopSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().ok().and_then(Option::take) {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_spawn_replaces_previous_loop() {
        let slot = LoopSlot::new("poller");
        let ticks = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let ticks = Arc::clone(&ticks);
            slot.spawn(move |_token| async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    ticks.fetch_add(1, Ordering::SeqCst);
                }
            });
        }

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert_eq!(slot.generation(), 2);
        assert!(slot.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_goes_stale() {
        let slot = LoopSlot::new("drain");
        let (tx, rx) = tokio::sync::oneshot::channel();

        slot.spawn(move |token| async move {
            let _ = tx.send(token);
            std::future::pending::<()>().await;
        });
        let token = rx.await.unwrap();
        assert!(token.is_current());

        slot.cancel();
        assert!(!token.is_current());
        tokio::task::yield_now().await;
        assert!(!slot.is_running());
    }

    #[tokio::test]
    async fn test_finished_loop_is_not_running() {
        let slot = LoopSlot::new("once");
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        slot.spawn(move |_| async move {
            let _ = tx.send(());
        });
        rx.await.unwrap();
        tokio::task::yield_now().await;
        // the task may need one more scheduler turn to be reaped
        for _ in 0..10 {
            if !slot.is_running() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(!slot.is_running());
    }
}
