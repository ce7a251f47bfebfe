//! Cancellation-bearing execution context for client calls.
//!
//! A `Context` is a cancellation flag plus an optional deadline. Clones share
//! the flag, so cancelling any clone cancels all of them. `with_cancel`,
//! `with_timeout` and `with_deadline` derive a child with its own flag that
//! also observes every ancestor: cancelling a parent reaches its children,
//! cancelling a child never reaches its parent or siblings.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Context {
    cancel: Arc<watch::Sender<bool>>,
    parent: Option<Arc<Context>>,
    deadline: Option<Instant>,
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl Context {
    /// A context that is never done unless cancelled.
    pub fn background() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            cancel: Arc::new(cancel),
            parent: None,
            deadline: None,
        }
    }

    /// Derive a child that can be cancelled on its own. It keeps this
    /// context's deadline.
    pub fn with_cancel(&self) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            cancel: Arc::new(cancel),
            parent: Some(Arc::new(self.clone())),
            deadline: self.deadline,
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a child ending at `deadline` or at this context's own
    /// deadline, whichever comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            deadline: Some(deadline),
            ..self.with_cancel()
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and everything derived from it.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// `Some` once the context is done, without waiting.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.cancel.borrow() || self.parent.as_ref().is_some_and(|p| p.is_cancelled())
    }

    /// Resolve when the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.cancelled() => ContextError::Canceled,
                _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Resolve once this context or any ancestor is cancelled.
    fn cancelled(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let mut rx = self.cancel.subscribe();
            // The sender lives in `self`, so `wait_for` cannot observe a
            // closed channel while we hold `&self`.
            let own = async move {
                let _ = rx.wait_for(|cancelled| *cancelled).await;
            };
            match &self.parent {
                Some(parent) => tokio::select! {
                    () = own => {},
                    () = parent.cancelled() => {},
                },
                None => own.await,
            }
        })
    }
}
