//! Queue of closures that must run on the UI-owning context.
//!
//! Background tasks never touch user-facing state directly; they post a
//! closure through a [`UiHandle`] and the owner runs it from its [`UiLoop`].

use tokio::sync::mpsc;

/// Work posted to the UI-owning context
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Cloneable sender side of the UI queue
#[derive(Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiTask>,
}

impl UiHandle {
    /// Queue `task` for the UI context.
    ///
    /// Returns `false` if the UI loop has been dropped and the task was discarded.
    pub fn post(&self, task: impl FnOnce() + Send + 'static) -> bool {
        self.tx.send(Box::new(task)).is_ok()
    }
}

/// Receiver side of the UI queue, owned by the UI context
pub struct UiLoop {
    rx: mpsc::UnboundedReceiver<UiTask>,
}

impl UiLoop {
    /// Wait for the next posted task and run it.
    ///
    /// Returns `false` once every handle has been dropped and the queue is empty.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run every task already queued without waiting; returns how many ran
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            count += 1;
        }
        count
    }
}

/// Create a connected handle and loop
pub fn ui_channel() -> (UiHandle, UiLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (UiHandle { tx }, UiLoop { rx })
}
