//! Ordered many-item handoff with an explicit "batch complete" marker.
//!
//! ```text
//!  respond worker                        speak worker
//!  ──────────────                        ────────────
//!  put("Hi")      ──► [ "Hi" ]     ──►   get() -> "Hi"
//!  put(" there")  ──► [ " there" ] ──►   get() -> " there"
//!  mark_batch_complete()           ──►   wait_for_batch_completion()
//!                                        try_get() until empty
//! ```
//!
//! The queue is unbounded, so [`put`](BatchQueue::put) never suspends.
//! The completion marker is separate from the items: a consumer that has
//! observed completion must still drain whatever arrived alongside it.

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::Notify;

use super::{lock_for_reset, lock_recover, Delivery, HandoffError, Signal};

pub struct BatchQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<Delivery<T>>>,
    available: Notify,
    complete: Signal,
}

impl<T> BatchQueue<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
            complete: Signal::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append `item` to the tail.  Never blocks.
    pub fn put(&self, item: T) {
        self.push(Delivery::Value(item));
    }

    /// Append the cancellation sentinel so a blocked [`get`](Self::get)
    /// wakes up.
    pub fn interrupt(&self) {
        self.push(Delivery::Interrupted);
    }

    /// Suspend until an item is present, then remove and return the head.
    pub async fn get(&self) -> Delivery<T> {
        loop {
            if let Some(item) = self.try_get() {
                return item;
            }
            self.available.notified().await;
        }
    }

    /// Remove and return the head without suspending.
    pub fn try_get(&self) -> Option<Delivery<T>> {
        let mut items = lock_recover(&self.items);
        let head = items.pop_front();
        if !items.is_empty() {
            // `notify_one` stores a single permit; hand it on so a second
            // consumer does not sleep on a non-empty queue.
            self.available.notify_one();
        }
        head
    }

    /// Raise the batch-complete marker.  Idempotent.
    pub fn mark_batch_complete(&self) {
        self.complete.set();
    }

    /// Suspend until the marker is raised, then lower it.
    ///
    /// Edge-triggered: each raise is consumed by exactly one waiter.
    pub async fn wait_for_batch_completion(&self) {
        self.complete.wait_and_clear().await;
    }

    pub fn is_batch_complete(&self) -> bool {
        self.complete.is_set()
    }

    pub fn len(&self) -> usize {
        lock_recover(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all pending items and lower the marker.
    pub fn reset(&self) -> Result<(), HandoffError> {
        let (mut items, status) = lock_for_reset(&self.items, self.name);
        items.clear();
        drop(items);
        self.complete.clear();
        status
    }

    fn push(&self, delivery: Delivery<T>) {
        lock_recover(&self.items).push_back(delivery);
        self.available.notify_one();
    }
}

impl<T> std::fmt::Debug for BatchQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchQueue")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("batch_complete", &self.is_batch_complete())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    const SHORT: Duration = Duration::from_millis(30);

    fn values(q: &BatchQueue<u32>) -> Vec<u32> {
        std::iter::from_fn(|| q.try_get())
            .filter_map(Delivery::into_value)
            .collect()
    }

    // ---- FIFO ---------------------------------------------------------------

    #[tokio::test]
    async fn get_is_fifo() {
        let q = BatchQueue::new("replies");
        q.put("a");
        q.put("b");
        q.put("c");
        assert_eq!(q.len(), 3);
        assert_eq!(q.get().await, Delivery::Value("a"));
        assert_eq!(q.get().await, Delivery::Value("b"));
        assert_eq!(q.get().await, Delivery::Value("c"));
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn get_suspends_until_put() {
        let q = Arc::new(BatchQueue::new("replies"));
        assert!(tokio::time::timeout(SHORT, q.get()).await.is_err());

        let consumer = tokio::spawn({
            let q = Arc::clone(&q);
            async move { q.get().await }
        });
        tokio::task::yield_now().await;
        q.put(9u32);
        let got = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, Delivery::Value(9));
    }

    #[tokio::test]
    async fn concurrent_producer_preserves_order() {
        let q = Arc::new(BatchQueue::new("replies"));
        let producer = tokio::spawn({
            let q = Arc::clone(&q);
            async move {
                for i in 0..200u32 {
                    q.put(i);
                    if i % 7 == 0 {
                        tokio::task::yield_now().await;
                    }
                }
            }
        });

        let mut got = Vec::new();
        while got.len() < 200 {
            if let Delivery::Value(v) = q.get().await {
                got.push(v);
            }
        }
        producer.await.unwrap();
        assert_eq!(got, (0..200).collect::<Vec<_>>());
    }

    proptest! {
        #[test]
        fn try_get_drains_in_put_order(items in proptest::collection::vec(any::<u32>(), 0..64)) {
            let q = BatchQueue::new("prop");
            for &i in &items {
                q.put(i);
            }
            prop_assert_eq!(values(&q), items);
        }

        #[test]
        fn reset_matches_fresh_queue(items in proptest::collection::vec(any::<u32>(), 0..16), marked in any::<bool>()) {
            let q = BatchQueue::new("prop");
            for &i in &items {
                q.put(i);
            }
            if marked {
                q.mark_batch_complete();
            }
            q.reset().unwrap();
            prop_assert!(q.is_empty());
            prop_assert!(!q.is_batch_complete());
            prop_assert!(q.try_get().is_none());
        }
    }

    // ---- batch marker -------------------------------------------------------

    #[tokio::test]
    async fn mark_batch_complete_is_idempotent() {
        let q = BatchQueue::<u32>::new("replies");
        q.mark_batch_complete();
        q.mark_batch_complete();
        assert!(q.is_batch_complete());
        q.wait_for_batch_completion().await;
        assert!(!q.is_batch_complete());
    }

    #[tokio::test]
    async fn wait_for_batch_completion_is_edge_triggered() {
        let q = BatchQueue::<u32>::new("replies");
        q.mark_batch_complete();
        q.wait_for_batch_completion().await;
        assert!(
            tokio::time::timeout(SHORT, q.wait_for_batch_completion())
                .await
                .is_err(),
            "a consumed marker must not satisfy a second wait"
        );
    }

    #[tokio::test]
    async fn item_put_alongside_marker_is_not_lost() {
        let q = BatchQueue::new("replies");
        q.mark_batch_complete();
        q.put(1u32);
        q.wait_for_batch_completion().await;
        assert_eq!(q.try_get(), Some(Delivery::Value(1)));
    }

    #[tokio::test]
    async fn waiter_wakes_on_mark() {
        let q = Arc::new(BatchQueue::<u32>::new("replies"));
        let waiter = tokio::spawn({
            let q = Arc::clone(&q);
            async move { q.wait_for_batch_completion().await }
        });
        tokio::task::yield_now().await;
        q.mark_batch_complete();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }

    // ---- interrupt / reset --------------------------------------------------

    #[tokio::test]
    async fn interrupt_wakes_blocked_consumer() {
        let q = Arc::new(BatchQueue::<String>::new("replies"));
        let consumer = tokio::spawn({
            let q = Arc::clone(&q);
            async move { q.get().await }
        });
        tokio::task::yield_now().await;
        q.interrupt();
        let got = tokio::time::timeout(SHORT, consumer).await.unwrap().unwrap();
        assert!(got.is_interrupted());
    }

    #[tokio::test]
    async fn reset_does_not_leave_a_stale_wakeup() {
        let q = BatchQueue::new("replies");
        q.put(1u32);
        q.reset().unwrap();
        q.reset().unwrap();
        assert!(tokio::time::timeout(SHORT, q.get()).await.is_err());
    }
}
