// src/logger/queue.rs
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::config::{names, values, Configuration};

/// Admission policy when the queue is at capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueMode {
    /// Producer waits for the drain thread to make space.
    Block,
    /// Oldest records are discarded to make space; the push reports how
    /// many were dropped so the caller can signal capacity-exceeded.
    Drop,
}

impl QueueMode {
    pub fn from_config(cfg: &Configuration) -> Self {
        match cfg.get(names::QUEUE_MODE, values::QUEUE_MODE_DROP) {
            v if v.eq_ignore_ascii_case(values::QUEUE_MODE_BLOCK) => QueueMode::Block,
            _ => QueueMode::Drop,
        }
    }
}

struct QueueInner {
    records: VecDeque<Vec<u8>>,
    bytes: usize,
}

/// Bounded FIFO of framed records sitting between record production and
/// transmission. Bounded by total byte size, not record count, so a burst
/// of large contexts cannot grow memory without limit.
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    space: Condvar,
    capacity_bytes: usize,
    mode: QueueMode,
}

impl EventQueue {
    pub fn new(capacity_bytes: usize, mode: QueueMode) -> Self {
        Self {
            inner: Mutex::new(QueueInner { records: VecDeque::new(), bytes: 0 }),
            space: Condvar::new(),
            capacity_bytes,
            mode,
        }
    }

    /// Enqueue one framed record. Under BLOCK this waits for space; under
    /// DROP it discards oldest records and returns how many were dropped.
    pub fn push(&self, record: Vec<u8>) -> usize {
        let size = record.len();
        let mut inner = self.inner.lock().expect("queue lock");
        let mut dropped = 0usize;
        match self.mode {
            QueueMode::Block => {
                while !inner.records.is_empty() && inner.bytes + size > self.capacity_bytes {
                    inner = self.space.wait(inner).expect("queue lock");
                }
            }
            QueueMode::Drop => {
                while !inner.records.is_empty() && inner.bytes + size > self.capacity_bytes {
                    if let Some(old) = inner.records.pop_front() {
                        inner.bytes -= old.len();
                        dropped += 1;
                    }
                }
            }
        }
        inner.bytes += size;
        inner.records.push_back(record);
        dropped
    }

    /// Dequeue in FIFO order. Wakes one blocked producer.
    pub fn pop(&self) -> Option<Vec<u8>> {
        let mut inner = self.inner.lock().expect("queue lock");
        let record = inner.records.pop_front()?;
        inner.bytes -= record.len();
        drop(inner);
        self.space.notify_one();
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn size_bytes(&self) -> usize {
        self.inner.lock().expect("queue lock").bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn fifo_order() {
        let q = EventQueue::new(1024, QueueMode::Drop);
        q.push(vec![1]);
        q.push(vec![2]);
        q.push(vec![3]);
        assert_eq!(q.pop(), Some(vec![1]));
        assert_eq!(q.pop(), Some(vec![2]));
        assert_eq!(q.pop(), Some(vec![3]));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn drop_mode_discards_oldest_and_reports() {
        let q = EventQueue::new(8, QueueMode::Drop);
        assert_eq!(q.push(vec![0u8; 4]), 0);
        assert_eq!(q.push(vec![1u8; 4]), 0);
        let dropped = q.push(vec![2u8; 4]);
        assert_eq!(dropped, 1);
        assert_eq!(q.pop(), Some(vec![1u8; 4]));
        assert_eq!(q.pop(), Some(vec![2u8; 4]));
    }

    #[test]
    fn block_mode_waits_for_space() {
        let q = Arc::new(EventQueue::new(4, QueueMode::Block));
        q.push(vec![0u8; 4]);
        let producer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                q.push(vec![1u8; 4]); // must wait until the consumer pops
            })
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop(), Some(vec![0u8; 4]));
        producer.join().unwrap();
        assert_eq!(q.pop(), Some(vec![1u8; 4]));
    }
}
