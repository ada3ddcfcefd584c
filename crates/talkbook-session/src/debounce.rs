//! Last-write-wins debouncer.
//!
//! Values pushed within the quiet period replace each other; only the latest
//! reaches the handler. The handler runs on a single worker task, so at most
//! one invocation is in flight and values pushed while it runs coalesce into
//! the next one instead of queueing up.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

enum Command<T> {
    Push(T),
    Flush(oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

/// Debounces values of type `T` into calls of an async handler.
///
/// Dropping the debouncer delivers any pending value before the worker exits.
pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    delay: Duration,
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawn the worker on the current tokio runtime.
    pub fn new<F, Fut>(delay: Duration, handler: F) -> Self
    where
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx, delay, handler));
        Self { tx, delay }
    }

    /// Replace the pending value and restart the quiet period.
    ///
    /// Returns `false` once the debouncer has been closed.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(Command::Push(value)).is_ok()
    }

    /// Deliver the pending value now and wait until the handler has finished.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Flush and stop the worker. Later pushes are rejected.
    pub async fn close(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Close(ack)).is_ok() {
            let _ = done.await;
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

async fn run<T, F, Fut>(mut rx: mpsc::UnboundedReceiver<Command<T>>, delay: Duration, mut handler: F)
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut waiters: Vec<oneshot::Sender<()>> = Vec::new();
    loop {
        // Idle until the first value of the next burst.
        let mut pending = match rx.recv().await {
            Some(Command::Push(value)) => value,
            Some(Command::Flush(ack)) => {
                let _ = ack.send(());
                continue;
            }
            Some(Command::Close(ack)) => {
                rx.close();
                let _ = ack.send(());
                return;
            }
            None => return,
        };

        let mut closing = false;
        let quiet = tokio::time::sleep(delay);
        tokio::pin!(quiet);
        loop {
            tokio::select! {
                _ = &mut quiet => break,
                command = rx.recv() => match command {
                    Some(Command::Push(value)) => {
                        pending = value;
                        quiet.as_mut().reset(Instant::now() + delay);
                    }
                    Some(Command::Flush(ack)) => {
                        waiters.push(ack);
                        break;
                    }
                    Some(Command::Close(ack)) => {
                        waiters.push(ack);
                        closing = true;
                        break;
                    }
                    None => {
                        closing = true;
                        break;
                    }
                },
            }
        }

        if closing {
            rx.close();
        }
        handler(pending).await;
        for ack in waiters.drain(..) {
            let _ = ack.send(());
        }
        if closing {
            return;
        }
    }
}
