//! Cooperative cancellation for reconciliation loops

use std::time::Duration;

use tokio::sync::watch;

use crate::error::CoreError;

/// Sending side of a [`Cancellation`]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal every linked [`Cancellation`]
    pub fn cancel(&self) {
        // No receivers left means nothing to cancel
        let _ = self.tx.send(true);
    }
}

/// Cancellation signal checked before each remote call
///
/// Dropping the [`CancelHandle`] without calling `cancel` does not cancel.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    /// Create a linked handle/signal pair
    #[must_use]
    pub fn new() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Self { rx: Some(rx) })
    }

    /// A signal that never fires
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// # Errors
    /// Returns [`CoreError::Cancelled`] once cancelled.
    pub fn check(&self) -> Result<(), CoreError> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `interval`, returning early if cancelled
    ///
    /// # Errors
    /// Returns [`CoreError::Cancelled`] if cancelled before or during the sleep.
    pub async fn sleep(&self, interval: Duration) -> Result<(), CoreError> {
        self.check()?;
        let Some(rx) = &self.rx else {
            tokio::time::sleep(interval).await;
            return Ok(());
        };

        let mut rx = rx.clone();
        let cancelled = async move {
            while rx.changed().await.is_ok() {
                if *rx.borrow() {
                    return;
                }
            }
            // Handle dropped without cancelling
            std::future::pending::<()>().await;
        };

        tokio::select! {
            () = tokio::time::sleep(interval) => Ok(()),
            () = cancelled => Err(CoreError::Cancelled),
        }
    }
}
