// /////////////////////////////////////////////////////////////////////////////
// logrich
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! A bounded FIFO retention buffer for recently emitted events, with an
//! optional on-disk checkpoint.
//!
//! The buffer holds at most `capacity` events; pushing past capacity evicts
//! the oldest. The checkpoint format is newline-delimited canonical JSON
//! (one `LogEvent` per line) so it can be appended to cheaply and tailed by
//! external tools; malformed lines encountered on load are skipped rather
//! than failing the whole load, since a single corrupted line (e.g. a
//! partial write from a crash) shouldn't lose the rest of the history.

use std::collections::VecDeque;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::LogRichError;
use crate::event::LogEvent;

pub struct RingBuffer {
    capacity: usize,
    events: VecDeque<LogEvent>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Appends an event, evicting the oldest if the buffer is already at
    /// capacity.
    pub fn push(&mut self, event: LogEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// A snapshot of the buffer's current contents, oldest first.
    pub fn snapshot(&self) -> Vec<LogEvent> {
        self.events.iter().cloned().collect()
    }

    /// Empties the buffer. Distinct from `flush`: this drops retained
    /// events, `flush` only persists them.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Persists the current contents to `path` as newline-delimited JSON.
    /// Does not clear the in-memory buffer (see the ring-buffer flush
    /// decision recorded in the project's design notes).
    pub fn flush(&self, path: &Path) -> Result<(), LogRichError> {
        let mut file = std::fs::File::create(path)?;
        for event in &self.events {
            let line = serde_json::to_string(event)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    /// Loads events from a checkpoint file, appending them in file order.
    /// Lines that fail to parse as a `LogEvent` are skipped; the rest of
    /// the file is still loaded.
    pub fn load_checkpoint(&mut self, path: &Path) -> Result<usize, LogRichError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let mut loaded = 0;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEvent>(&line) {
                Ok(event) => {
                    self.push(event);
                    loaded += 1;
                }
                Err(_) => continue,
            }
        }
        Ok(loaded)
    }
}
