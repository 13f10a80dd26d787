//! Context implementation for request-scoped cancellation
//!
//! This module provides the Context type which carries cancellation signals
//! and deadlines across async boundaries.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time;

/// Context carries request-scoped values like cancellation signals and timeouts
/// CRITICAL: Pass this as first parameter to ALL async trait methods
/// This enables proper cancellation and timeout handling
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline: None,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a context that is cancelled after `timeout`, or earlier if
    /// `self` is cancelled first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let child = self.child(Some(deadline));

        let tx = child.inner.done_tx.clone();
        tokio::spawn(async move {
            time::sleep_until(deadline.into()).await;
            let _ = tx.send(true);
        });

        child
    }

    /// Derive a context cancelled together with `self`
    pub fn child_context(&self) -> Self {
        self.child(self.inner.deadline)
    }

    fn child(&self, deadline: Option<Instant>) -> Self {
        let (done_tx, done_rx) = watch::channel(self.is_cancelled());

        let mut parent = self.done();
        let tx = done_tx.clone();
        tokio::spawn(async move {
            loop {
                if *parent.borrow_and_update() {
                    let _ = tx.send(true);
                    return;
                }
                tokio::select! {
                    changed = parent.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = tx.closed() => return,
                }
            }
        });

        Self {
            inner: Arc::new(ContextInner {
                deadline,
                done: done_rx,
                done_tx,
            }),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.done.borrow()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Returns a channel that's closed when work done on behalf of this
    /// context should be cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once the context is cancelled
    pub async fn cancelled(&self) {
        let mut done = self.done();
        // An Err means the sender is gone, which can only happen once every
        // clone of this context was dropped; treat it as never cancelling.
        if done.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Drive `future` to completion unless the context is cancelled first,
    /// in which case the future is dropped and `None` is returned.
    pub async fn run<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            output = future => Some(output),
            _ = self.cancelled() => None,
        }
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
    }

    #[tokio::test]
    async fn child_follows_parent_cancellation() {
        let parent = Context::new();
        let child = parent.child_context();

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .expect("child should observe cancellation");
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn run_returns_output_when_not_cancelled() {
        let ctx = Context::new();
        assert_eq!(ctx.run(async { 42 }).await, Some(42));
    }

    #[test]
    fn run_on_cancelled_context_skips_the_future() {
        let ctx = Context::new();
        ctx.cancel();
        assert_eq!(tokio_test::block_on(ctx.run(std::future::pending::<()>())), None);
    }

    #[tokio::test]
    async fn run_drops_future_on_cancel() {
        let ctx = Context::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let output = ctx.run(sleep(Duration::from_secs(30))).await;
        assert!(output.is_none());
    }
}
