//! Fixed-capacity FIFO of recent raw samples.

use heapless::Deque;

/// Maximum number of samples a device remembers.
pub const HISTORY_CAPACITY: usize = 10;

#[derive(Debug)]
pub struct BoundedHistory {
    entries: Deque<String, HISTORY_CAPACITY>,
}

impl BoundedHistory {
    pub fn new() -> Self {
        Self {
            entries: Deque::new(),
        }
    }

    /// Append a sample, evicting the oldest when full. Returns the evicted entry.
    pub fn push(&mut self, entry: String) -> Option<String> {
        let evicted = if self.entries.is_full() {
            self.entries.pop_front()
        } else {
            None
        };
        // A slot is always free here
        let _ = self.entries.push_back(entry);
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Log file body: one entry per line.
    pub fn render(&self) -> String {
        self.iter().fold(String::new(), |mut out, entry| {
            out.push_str(entry);
            out.push('\n');
            out
        })
    }
}

impl Default for BoundedHistory {
    fn default() -> Self {
        Self::new()
    }
}
