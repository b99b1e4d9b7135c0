//! Cooperative cancellation for long-running operations.
//!
//! Every paged read, the archive coordinator's per-stream loop, and file
//! writes accept a [`Cancel`] handle and check it at each yield boundary
//! and before each database round trip.

use tokio::sync::watch;

/// A cheaply-cloneable cancellation flag.
///
/// Built on [`tokio::sync::watch`], the same primitive family already
/// pulled in by this crate's dependency on `tokio`'s `sync` feature.
#[derive(Debug, Clone)]
pub struct Cancel {
    receiver: watch::Receiver<bool>,
}

/// The write side of a [`Cancel`] handle.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signals cancellation to every clone of the paired [`Cancel`].
    pub fn cancel(&self) {
        let _ = self.sender.send(true);
    }
}

/// Creates a linked `(CancelHandle, Cancel)` pair, not yet cancelled.
#[must_use]
pub fn new() -> (CancelHandle, Cancel) {
    let (sender, receiver) = watch::channel(false);
    (CancelHandle { sender }, Cancel { receiver })
}

impl Cancel {
    /// A handle that never cancels, for callers with no cancellation
    /// signal of their own.
    #[must_use]
    pub fn never() -> Self {
        new().1
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_cancels() {
        assert!(!Cancel::never().is_cancelled());
    }

    #[test]
    fn cancel_is_observed_by_clones() {
        let (handle, token) = new();
        let clone = token.clone();
        assert!(!token.is_cancelled());

        handle.cancel();

        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }
}
