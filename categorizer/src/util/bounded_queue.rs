use parking_lot::Mutex;
use std::collections::VecDeque;

use tokio::sync::Semaphore;

/// An async-friendly FIFO queue of bounded size. Consumers suspend while
/// the queue is empty; producers either suspend while it is full (`push`)
/// or evict the oldest entry (`push_evicting`).
pub struct BoundedQueue<T> {
    /// The maximum number of entries allowed in the queue
    capacity: usize,
    /// The actual items in the queue. New items are appended at the back, and
    /// popped off the front.
    queue: Mutex<VecDeque<T>>,
    /// This semaphore has as many permits as there are empty spots in the
    /// `queue`, i.e., `capacity - queue.len()` many permits
    push_semaphore: Semaphore,
    /// This semaphore has as many permits as there are entries in the queue,
    /// i.e., `queue.len()` many
    pop_semaphore: Semaphore,
}

impl<T> std::fmt::Debug for BoundedQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queue = self.queue.lock();
        write!(
            f,
            "BoundedQueue[cap: {}, queue: {}/{}, push: {}, pop: {}]",
            self.capacity,
            queue.len(),
            queue.capacity(),
            self.push_semaphore.available_permits(),
            self.pop_semaphore.available_permits(),
        )
    }
}

impl<T> BoundedQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            push_semaphore: Semaphore::new(capacity),
            pop_semaphore: Semaphore::new(0),
        }
    }

    /// Get an item from the queue. If the queue is currently empty
    /// this method blocks until an item is available.
    pub async fn pop(&self) -> T {
        let permit = self
            .pop_semaphore
            .acquire()
            .await
            .expect("we never close the pop_semaphore");
        let item = self
            .queue
            .lock()
            .pop_front()
            .expect("the queue is not empty");
        permit.forget();
        self.push_semaphore.add_permits(1);
        item
    }

    /// Push an item into the queue. If the queue is currently full this method
    /// blocks until a spot is available
    pub async fn push(&self, item: T) {
        let permit = self
            .push_semaphore
            .acquire()
            .await
            .expect("we never close the push_semaphore");
        self.queue.lock().push_back(item);
        permit.forget();
        self.pop_semaphore.add_permits(1);
    }

    /// Push an item into the queue without waiting. If the queue is full,
    /// the oldest item is removed to make room and returned.
    pub async fn push_evicting(&self, item: T) -> Option<T> {
        loop {
            if let Ok(permit) = self.push_semaphore.try_acquire() {
                self.queue.lock().push_back(item);
                permit.forget();
                self.pop_semaphore.add_permits(1);
                return None;
            }

            {
                let mut queue = self.queue.lock();
                // The number of entries, and therefore the permits, stay
                // the same
                if queue.len() >= self.capacity {
                    let evicted = queue.pop_front();
                    queue.push_back(item);
                    return evicted;
                }
            }

            // A consumer took an entry but has not released its spot yet
            tokio::task::yield_now().await;
        }
    }

    /// Wait until every entry has been popped off the queue.
    pub async fn wait_empty(&self) {
        self.push_semaphore
            .acquire_many(self.capacity as u32)
            .await
            .map(|_| ())
            .expect("we never close the push_semaphore")
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn pops_in_fifo_order() {
        let queue = BoundedQueue::with_capacity(4);
        for i in 1..=3 {
            queue.push(i).await;
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().await, 1);
        assert_eq!(queue.pop().await, 2);
        assert_eq!(queue.pop().await, 3);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn pop_waits_for_a_push() {
        let queue = Arc::new(BoundedQueue::with_capacity(2));

        let consumer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!consumer.is_finished());

        queue.push(7).await;
        assert_eq!(consumer.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn push_waits_while_full() {
        let queue = Arc::new(BoundedQueue::with_capacity(1));
        queue.push(1).await;

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push(2).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!producer.is_finished());

        assert_eq!(queue.pop().await, 1);
        producer.await.unwrap();
        assert_eq!(queue.pop().await, 2);
    }

    #[tokio::test]
    async fn push_evicting_drops_the_oldest() {
        let queue = BoundedQueue::with_capacity(2);
        assert_eq!(queue.push_evicting(1).await, None);
        assert_eq!(queue.push_evicting(2).await, None);
        assert_eq!(queue.push_evicting(3).await, Some(1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().await, 2);
        assert_eq!(queue.pop().await, 3);
    }

    #[tokio::test]
    async fn wait_empty_returns_once_drained() {
        let queue = Arc::new(BoundedQueue::with_capacity(3));
        queue.push(1).await;
        queue.push(2).await;

        let drained = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.wait_empty().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!drained.is_finished());

        queue.pop().await;
        queue.pop().await;
        drained.await.unwrap();
    }
}
