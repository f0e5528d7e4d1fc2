//! Round-robin selection over a fixed item set
//!
//! Useful for rotating between interchangeable resources, e.g. replica
//! [`Source`](crate::refresh::Source)s feeding a refresher.

use crate::error::{FlowError, Result};
use std::sync::Mutex;

/// A mutex-guarded cyclic selector
#[derive(Debug)]
pub struct RoundRobin<T> {
    items: Vec<T>,
    cursor: Mutex<usize>,
}

impl<T: Clone> RoundRobin<T> {
    /// Create a selector over `items`
    ///
    /// Errors on an empty item list.
    pub fn new(items: Vec<T>) -> Result<Self> {
        if items.is_empty() {
            return Err(FlowError::Config(
                "round-robin requires at least one item".to_string(),
            ));
        }

        Ok(Self {
            items,
            cursor: Mutex::new(0),
        })
    }

    /// Pick the next item, cycling in insertion order
    pub fn pick(&self) -> T {
        let mut cursor = self
            .cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let item = self.items[*cursor].clone();
        *cursor = (*cursor + 1) % self.items.len();
        item
    }

    /// Number of items in the rotation
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the rotation is empty (never true for a constructed selector)
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_in_order() {
        let rr = RoundRobin::new(vec!["a", "b", "c"]).unwrap();

        assert_eq!(rr.pick(), "a");
        assert_eq!(rr.pick(), "b");
        assert_eq!(rr.pick(), "c");
        assert_eq!(rr.pick(), "a");
    }

    #[test]
    fn test_single_item() {
        let rr = RoundRobin::new(vec![7]).unwrap();
        assert_eq!(rr.pick(), 7);
        assert_eq!(rr.pick(), 7);
    }

    #[test]
    fn test_empty_rejected() {
        let rr: Result<RoundRobin<i32>> = RoundRobin::new(Vec::new());
        assert!(matches!(rr, Err(FlowError::Config(_))));
    }
}
