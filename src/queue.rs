use std::collections::VecDeque;
use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use crate::traits::{Incoming, MessageSource};

pub const DEFAULT_QUEUE_SIZE_LIMIT: usize = 100;

#[derive(Debug)]
struct Ring {
    limit: usize,
    messages: VecDeque<Incoming>,
    dropped: usize,
}

/// Bounded FIFO between the backend input callback and the polling loop.
///
/// Clones share the same storage: one clone is moved into the callback,
/// the other is polled. Messages arriving while the queue is full are
/// dropped and counted.
#[derive(Debug, Clone)]
pub struct InputQueue {
    ring: Arc<Mutex<Ring>>,
}

impl InputQueue {
    pub fn new(limit: usize) -> Self {
        InputQueue {
            ring: Arc::new(Mutex::new(Ring {
                limit,
                messages: VecDeque::with_capacity(limit),
                dropped: 0,
            })),
        }
    }

    /// Returns `false` if the message had to be dropped.
    pub fn push(&self, stamp: Option<u64>, bytes: &[u8]) -> bool {
        let mut ring = self.ring.lock();
        if ring.messages.len() >= ring.limit {
            ring.dropped += 1;
            warn!(
                "input queue limit of {} reached, dropping {:?}",
                ring.limit, bytes
            );
            return false;
        }
        ring.messages.push_back(Incoming {
            stamp,
            bytes: bytes.to_vec(),
        });
        true
    }

    pub fn pop(&self) -> Option<Incoming> {
        self.ring.lock().messages.pop_front()
    }

    pub fn len(&self) -> usize {
        self.ring.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped(&self) -> usize {
        self.ring.lock().dropped
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        InputQueue::new(DEFAULT_QUEUE_SIZE_LIMIT)
    }
}

impl MessageSource for InputQueue {
    fn get_message(&mut self) -> Option<Incoming> {
        self.pop()
    }

    fn dropped(&self) -> usize {
        InputQueue::dropped(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn fifo_order() {
        let queue = InputQueue::new(4);
        assert!(queue.push(Some(1), &[144, 60, 1]));
        assert!(queue.push(Some(2), &[128, 60, 0]));
        assert_eq!(queue.len(), 2);

        let first = queue.pop().unwrap();
        assert_eq!(first.stamp, Some(1));
        assert_eq!(first.bytes, vec![144, 60, 1]);
        assert_eq!(queue.pop().unwrap().bytes, vec![128, 60, 0]);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn drops_beyond_limit() {
        let queue = InputQueue::new(2);
        assert!(queue.push(None, &[0xF8]));
        assert!(queue.push(None, &[0xF8]));
        assert!(!queue.push(None, &[0xFA]));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn clones_share_storage_across_threads() {
        let queue = InputQueue::default();
        let producer = queue.clone();
        thread::spawn(move || {
            for key in 0..10u8 {
                producer.push(Some(key as u64), &[144, key, 1]);
            }
        })
        .join()
        .unwrap();

        let mut source = queue;
        let keys: Vec<u8> = std::iter::from_fn(|| source.get_message())
            .map(|m| m.bytes[1])
            .collect();
        assert_eq!(keys, (0..10).collect::<Vec<u8>>());
    }
}
