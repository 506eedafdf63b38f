use std::collections::HashMap;

/// Per-model counters for auto-indexed entities, keyed by entity kind.
#[derive(Debug, Clone, Default)]
pub struct IndexAllocator {
    counters: HashMap<String, usize>,
}

impl IndexAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next index of `kind`, starting at 0.
    pub fn next(&mut self, kind: &str) -> usize {
        let counter = self.counters.entry(kind.to_string()).or_insert(0);
        let index = *counter;
        *counter += 1;
        index
    }

    /// Number of indexes handed out for `kind`.
    pub fn peek(&self, kind: &str) -> usize {
        self.counters.get(kind).copied().unwrap_or(0)
    }

    pub fn reset(&mut self, kind: &str) {
        self.counters.remove(kind);
    }
}
