//! Cooperative cancellation for in-flight requests.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Create a connected cancellation pair.
///
/// The [`CancelHandle`] side stays with whoever may want to abort the call;
/// the [`CancelSignal`] side travels into the request options. Each signal
/// serves a single request.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = oneshot::channel();
    (
        CancelHandle {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        CancelSignal { rx },
    )
}

/// The triggering side of a cancellation pair.
///
/// Cheaply cloneable; clones share the same underlying trigger.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl CancelHandle {
    /// Fire the cancellation signal.
    ///
    /// Returns `true` if the signal was delivered, `false` if it was
    /// already fired or the receiving side is gone.
    pub fn cancel(&self) -> bool {
        if let Some(tx) = self.tx.lock().take() {
            tx.send(()).is_ok()
        } else {
            false
        }
    }

    /// Check whether the signal has not been fired yet.
    pub fn is_pending(&self) -> bool {
        self.tx.lock().is_some()
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// The listening side of a cancellation pair.
#[derive(Debug)]
pub struct CancelSignal {
    rx: oneshot::Receiver<()>,
}

impl CancelSignal {
    /// Resolve when the paired handle fires.
    ///
    /// A handle dropped without firing never resolves; dropping the handle
    /// must not look like an abort.
    pub(crate) async fn fired(self) {
        if self.rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
