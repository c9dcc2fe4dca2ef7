use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

/// A fixed-capacity, thread-safe FIFO queue with a timed blocking pop.
///
/// Implemented as a fixed-capacity channel rather than a hand-rolled
/// mutex plus two condition variables; either shape gives the same
/// blocking-with-timeout dequeue, and a channel is the more idiomatic
/// choice here.
pub(crate) struct BoundedQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
}

impl<T> BoundedQueue<T> {
    /// Creates a queue that can hold at most `capacity` items.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        BoundedQueue { sender, receiver }
    }

    /// Enqueues `item` without blocking.
    ///
    /// Callers only ever push items that were just dequeued or newly
    /// created under the construction mutex, so the queue's capacity
    /// (equal to `max_connections_per_host`) is never exceeded in
    /// practice; a full queue here indicates an invariant violation
    /// elsewhere in the pool.
    pub(crate) fn push(&self, item: T) {
        match self.sender.try_send(item) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                unreachable!("available queue exceeded max_connections_per_host capacity")
            }
            Err(TrySendError::Disconnected(_)) => {
                unreachable!("available queue's receiver dropped while the pool is alive")
            }
        }
    }

    /// Blocks up to `timeout` waiting for an item, returning `None` if
    /// the deadline elapses first.
    pub(crate) fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        match self.receiver.recv_timeout(timeout) {
            Ok(item) => Some(item),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drains every currently queued item without blocking.
    pub(crate) fn drain(&self) -> Vec<T> {
        let mut items = Vec::new();
        while let Ok(item) = self.receiver.try_recv() {
            items.push(item);
        }
        items
    }

    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pop_returns_none_after_timeout_on_empty_queue() {
        let queue: BoundedQueue<u32> = BoundedQueue::with_capacity(1);
        let start = std::time::Instant::now();
        assert_eq!(queue.pop_timeout(Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn push_then_pop_returns_same_item() {
        let queue: BoundedQueue<u32> = BoundedQueue::with_capacity(2);
        queue.push(7);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), Some(7));
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_empties_the_queue() {
        let queue: BoundedQueue<u32> = BoundedQueue::with_capacity(4);
        queue.push(1);
        queue.push(2);
        let drained = queue.drain();
        assert_eq!(drained, vec![1, 2]);
        assert!(queue.is_empty());
    }
}
