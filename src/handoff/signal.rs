//! Resettable async flag.
//!
//! [`Signal`] behaves like an event: [`set`](Signal::set) raises the flag and
//! wakes every waiter, [`wait`](Signal::wait) returns immediately while the
//! flag is raised, and [`clear`](Signal::clear) lowers it again.
//! [`wait_and_clear`](Signal::wait_and_clear) is the edge-triggered variant
//! used for the batch-complete marker: exactly one waiter consumes each
//! raise.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct Signal {
    flag: AtomicBool,
    notify: Notify,
}

impl Signal {
    /// A lowered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that starts raised.
    pub fn raised() -> Self {
        let signal = Self::new();
        signal.flag.store(true, Ordering::SeqCst);
        signal
    }

    /// Raise the flag and wake all current waiters.  Idempotent.
    pub fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Lower the flag.  Does not wake anyone.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Suspend until the flag is raised.  The flag stays raised.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent `set` cannot slip
            // between the check and the await.
            notified.as_mut().enable();
            if self.is_set() {
                return;
            }
            notified.await;
        }
    }

    /// Suspend until the flag is raised, then lower it.
    ///
    /// When several tasks wait concurrently only one of them observes each
    /// raise; the rest keep waiting for the next one.
    pub async fn wait_and_clear(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.flag.swap(false, Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_when_raised() {
        let signal = Signal::raised();
        tokio::time::timeout(Duration::from_millis(50), signal.wait())
            .await
            .expect("raised signal must not block");
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn set_wakes_every_waiter() {
        let signal = Arc::new(Signal::new());
        let a = tokio::spawn({
            let s = Arc::clone(&signal);
            async move { s.wait().await }
        });
        let b = tokio::spawn({
            let s = Arc::clone(&signal);
            async move { s.wait().await }
        });
        tokio::task::yield_now().await;

        signal.set();
        tokio::time::timeout(Duration::from_secs(1), async {
            a.await.unwrap();
            b.await.unwrap();
        })
        .await
        .expect("both waiters should wake");
    }

    #[tokio::test]
    async fn wait_and_clear_consumes_the_raise() {
        let signal = Signal::new();
        signal.set();
        signal.wait_and_clear().await;
        assert!(!signal.is_set());

        let second = tokio::time::timeout(Duration::from_millis(30), signal.wait_and_clear()).await;
        assert!(second.is_err(), "second wait must block until the next raise");
    }

    #[tokio::test]
    async fn clear_lowers_without_waking() {
        let signal = Signal::raised();
        signal.clear();
        assert!(!signal.is_set());
        let r = tokio::time::timeout(Duration::from_millis(30), signal.wait()).await;
        assert!(r.is_err());
    }
}
