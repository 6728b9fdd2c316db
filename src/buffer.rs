//! Thread-safe ordered message buffers.
//!
//! Two independent [`MessageQueue`]s decouple the host's send/receive calls
//! from the I/O worker's tick timing: any thread may enqueue outgoing
//! messages or drain incoming ones without waiting on the wire. The lock is
//! held only for the enqueue/drain copy, never across I/O.

use std::collections::VecDeque;
use std::sync::Mutex;

/// How much of a queue a drain call removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Remove and return every queued message.
    All,
    /// Remove and return at most the first `n` messages.
    First(usize),
}

/// An ordered FIFO queue of message strings.
///
/// Insertion order is preserved end-to-end: the order messages are pushed is
/// the order a drain returns them.
#[derive(Debug, Default)]
pub struct MessageQueue {
    inner: Mutex<VecDeque<String>>,
}

impl MessageQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message to the back.
    pub fn push(&self, message: String) {
        self.lock().push_back(message);
    }

    /// Append several messages, preserving their order.
    pub fn extend(&self, messages: Vec<String>) {
        self.lock().extend(messages);
    }

    /// Atomically remove and return messages from the front.
    pub fn drain(&self, drain: Drain) -> Vec<String> {
        let mut queue = self.lock();
        match drain {
            Drain::All => queue.drain(..).collect(),
            Drain::First(n) => {
                let n = n.min(queue.len());
                queue.drain(..n).collect()
            }
        }
    }

    /// Remove and return everything (shorthand for `drain(Drain::All)`).
    pub fn take_all(&self) -> Vec<String> {
        self.drain(Drain::All)
    }

    /// Atomically empty the queue.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        // A poisoned queue lock only means another thread panicked mid-copy;
        // the VecDeque itself is still structurally sound.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_with(messages: &[&str]) -> MessageQueue {
        let queue = MessageQueue::new();
        for m in messages {
            queue.push((*m).to_string());
        }
        queue
    }

    #[test]
    fn test_fifo_order() {
        let queue = queue_with(&["a", "b", "c"]);
        assert_eq!(
            queue.take_all(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_drain_all_is_idempotent() {
        let queue = queue_with(&["x", "y"]);
        assert_eq!(queue.drain(Drain::All).len(), 2);
        assert!(queue.drain(Drain::All).is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_first_n() {
        let queue = queue_with(&["a", "b", "c", "d"]);
        assert_eq!(
            queue.drain(Drain::First(2)),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(queue.len(), 2);
        assert_eq!(
            queue.drain(Drain::First(10)),
            vec!["c".to_string(), "d".to_string()]
        );
    }

    #[test]
    fn test_drain_first_zero() {
        let queue = queue_with(&["a"]);
        assert!(queue.drain(Drain::First(0)).is_empty());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear() {
        let queue = queue_with(&["a", "b"]);
        queue.clear();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_extend_preserves_order() {
        let queue = queue_with(&["a"]);
        queue.extend(vec!["b".to_string(), "c".to_string()]);
        assert_eq!(
            queue.take_all(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_concurrent_producers() {
        use std::sync::Arc;

        let queue = Arc::new(MessageQueue::new());
        let mut handles = Vec::new();
        for t in 0..4 {
            let queue = queue.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..100 {
                    queue.push(format!("{}-{}", t, i));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(queue.len(), 400);
    }
}
