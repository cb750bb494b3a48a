//! Undo support: every forward step pushes the state it is about to replace.
//!
//! The stack is unbounded. Its depth is the number of forward steps taken since the last
//! reset, which is exactly how far back the simulation can rewind.

use crate::stages::Slots;

/// the full observable state of a processor before one forward step
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Snapshot {
    pub cycle: u64,
    pub cursor: usize,
    pub slots: Slots,
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct History {
    snapshots: Vec<Snapshot>,
}

impl History {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }

    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop()
    }

    #[must_use]
    pub fn peek(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn snapshot(cycle: u64) -> Snapshot {
        Snapshot {
            cycle,
            cursor: cycle as usize,
            slots: Slots::new(),
        }
    }

    #[test]
    fn test_pops_in_reverse_order() {
        let mut history = History::new();
        history.push(snapshot(0));
        history.push(snapshot(1));

        assert_eq!(history.len(), 2);
        assert_eq!(history.peek(), Some(&snapshot(1)));
        assert_eq!(history.pop(), Some(snapshot(1)));
        assert_eq!(history.pop(), Some(snapshot(0)));
        assert_eq!(history.pop(), None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut history = History::new();
        history.push(snapshot(0));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.peek(), None);
    }
}
