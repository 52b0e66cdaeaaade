//! Metrics and rolling histories shown next to the running demos.
use serde::Serialize;
use std::collections::VecDeque;

/// Display accuracy of a single-output prediction: `100 − |100·error|`.
///
/// Goes negative once the error exceeds 1; callers print it as-is.
pub fn output_accuracy(error: f64) -> f64 {
    100.0 - (error * 100.0).abs()
}

/// Fixed-capacity history; the oldest entry drops out first.
#[derive(Debug, Clone, Serialize)]
pub struct History<T> {
    capacity: usize,
    entries: VecDeque<T>,
}

impl<T> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}
