use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tessera_lib_core::{Error, Result};

/// One logical-log record handed to the local executor of a replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub lsn: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
struct Inner {
    queue: VecDeque<LogRecord>,
    aborted: bool,
}

/// Bounded producer/consumer queue between the log shipper and the replica
/// executor.
///
/// `abort` fans out to every waiter on both sides; after it, every call
/// fails with `Canceled` until `reset`.
#[derive(Debug)]
pub struct ReplicationQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl ReplicationQueue {
    pub fn with_capacity(capacity: usize) -> ReplicationQueue {
        ReplicationQueue {
            inner: Mutex::new(Inner::default()),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Blocking append; waits while the queue is full.
    pub fn put(&self, record: LogRecord) -> Result<()> {
        let mut inner = self.inner.lock();
        while inner.queue.len() >= self.capacity && !inner.aborted {
            self.not_full.wait(&mut inner);
        }
        if inner.aborted {
            return Err(Error::Canceled);
        }
        inner.queue.push_back(record);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Blocking pop; waits while the queue is empty.
    pub fn take(&self) -> Result<LogRecord> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(record) = inner.queue.pop_front() {
                self.not_full.notify_one();
                return Ok(record);
            }
            if inner.aborted {
                return Err(Error::Canceled);
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Non-blocking pop for drain loops.
    pub fn try_take(&self) -> Option<LogRecord> {
        let mut inner = self.inner.lock();
        let record = inner.queue.pop_front();
        if record.is_some() {
            self.not_full.notify_one();
        }
        record
    }

    /// Wake every waiter with `Canceled` and reject further traffic.
    pub fn abort(&self) {
        let mut inner = self.inner.lock();
        inner.aborted = true;
        inner.queue.clear();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Clear the abort latch, e.g. when replication is re-established.
    pub fn reset(&self) {
        self.inner.lock().aborted = false;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn records_flow_in_order() {
        let queue = ReplicationQueue::with_capacity(4);
        for lsn in 1..=3 {
            queue.put(LogRecord { lsn, data: vec![] }).unwrap();
        }
        assert_eq!(queue.take().unwrap().lsn, 1);
        assert_eq!(queue.take().unwrap().lsn, 2);
        assert_eq!(queue.try_take().unwrap().lsn, 3);
        assert!(queue.try_take().is_none());
    }

    #[test]
    fn abort_wakes_blocked_consumers() {
        let queue = Arc::new(ReplicationQueue::with_capacity(1));
        let consumer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.take())
        };

        std::thread::sleep(Duration::from_millis(50));
        queue.abort();
        assert!(matches!(consumer.join().unwrap(), Err(Error::Canceled)));
        assert!(matches!(
            queue.put(LogRecord { lsn: 9, data: vec![] }),
            Err(Error::Canceled)
        ));
    }

    #[test]
    fn bounded_capacity_blocks_producers_until_drained() {
        let queue = Arc::new(ReplicationQueue::with_capacity(1));
        queue.put(LogRecord { lsn: 1, data: vec![] }).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || queue.put(LogRecord { lsn: 2, data: vec![] }))
        };

        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.take().unwrap().lsn, 1);
        producer.join().unwrap().unwrap();
        assert_eq!(queue.take().unwrap().lsn, 2);
    }
}
