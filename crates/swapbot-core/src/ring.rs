use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;

use crate::types::unix_now;

/// One captured error/warning, as served by the status endpoint.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorEntry {
    pub ts: u64,
    pub level: String,
    pub msg: String,
}

/// Bounded ring of recent errors and warnings. On overflow the oldest tenth
/// is dropped in one batch so steady-state pushes stay cheap.
#[derive(Debug)]
pub struct ErrorRing {
    limit: usize,
    entries: Mutex<VecDeque<ErrorEntry>>,
}

impl ErrorRing {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, level: &str, msg: impl Into<String>) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.limit {
            let drop_n = (self.limit / 10).max(1);
            let len = entries.len();
            entries.drain(..drop_n.min(len));
        }
        entries.push_back(ErrorEntry {
            ts: unix_now(),
            level: level.to_string(),
            msg: msg.into(),
        });
    }

    /// Remove and return up to `n` oldest entries.
    pub fn drain(&self, n: usize) -> Vec<ErrorEntry> {
        let mut entries = self.entries.lock();
        let take = n.min(entries.len());
        entries.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for ErrorRing {
    fn default() -> Self {
        Self::new(5000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_fifo_order() {
        let ring = ErrorRing::new(10);
        ring.push("error", "first");
        ring.push("warn", "second");

        let drained = ring.drain(5);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].msg, "first");
        assert_eq!(drained[1].msg, "second");
        assert!(ring.is_empty());
    }

    #[test]
    fn overflow_drops_oldest_batch() {
        let ring = ErrorRing::new(100);
        for i in 0..100 {
            ring.push("error", format!("e{i}"));
        }
        assert_eq!(ring.len(), 100);

        ring.push("error", "overflow");
        // one tenth dropped, new entry appended
        assert_eq!(ring.len(), 91);
        let head = ring.drain(1);
        assert_eq!(head[0].msg, "e10");
    }
}
