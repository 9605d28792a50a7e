//! Per-service ring buffer with non-blocking subscriber fan-out.
//!
//! The producer's critical section (push + possible pop_front) is guarded
//! by a separate `Mutex` from the subscriber list, and fan-out uses
//! `try_send` only — a full subscriber channel drops the entry for that
//! subscriber alone, so a slow reader never stalls the producer.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::logs::model::{LogEntry, LogLevel};

pub const DEFAULT_CAPACITY: usize = 1000;
pub const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<LogEntry>,
}

pub struct LogBuffer {
    capacity: usize,
    ring: Mutex<VecDeque<LogEntry>>,
    subscribers: Mutex<Vec<Subscriber>>,
    next_subscriber_id: AtomicU64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ring: Mutex::new(VecDeque::with_capacity(capacity)),
            subscribers: Mutex::new(Vec::new()),
            next_subscriber_id: AtomicU64::new(1),
        }
    }

    /// O(1) insertion into the ring (overwrite-oldest at capacity). Never
    /// blocks the producer: subscriber delivery is `try_send` only.
    pub fn append(&self, entry: LogEntry) {
        {
            let mut ring = self.ring.lock().unwrap();
            if ring.len() >= self.capacity {
                ring.pop_front();
            }
            ring.push_back(entry.clone());
        }

        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|sub| match sub.sender.try_send(entry.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Returns up to the last `n` entries in insertion order.
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let ring = self.ring.lock().unwrap();
        let skip = ring.len().saturating_sub(n);
        ring.iter().skip(skip).cloned().collect()
    }

    /// Returns entries with `timestamp >= since`, optionally filtered by
    /// a level set.
    pub fn since(&self, since: DateTime<Utc>, levels: Option<&[LogLevel]>) -> Vec<LogEntry> {
        let ring = self.ring.lock().unwrap();
        ring.iter()
            .filter(|e| e.timestamp >= since)
            .filter(|e| levels.map(|ls| ls.contains(&e.level)).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Registers a new subscriber and returns its receiver plus an id used
    /// to unsubscribe later. The channel capacity bounds how far a slow
    /// subscriber can lag before entries start dropping for it alone.
    pub fn subscribe(&self) -> (u64, mpsc::Receiver<LogEntry>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        self.subscribers.lock().unwrap().push(Subscriber { id, sender: tx });
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().unwrap().retain(|sub| sub.id != id);
    }

    pub fn len(&self) -> usize {
        self.ring.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
