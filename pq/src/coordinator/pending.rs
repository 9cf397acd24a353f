//! FIFO of commands waiting for a reply

use std::collections::VecDeque;

use crate::completion::Completion;

/// One outstanding command
#[derive(Debug)]
pub struct PendingEntry<V> {
    /// Position of the command in write order
    pub seq: u64,
    pub completion: Completion<V>,
}

/// Completions in the order their commands were written
///
/// The front entry always belongs to the oldest command still waiting for its
/// reply.
#[derive(Debug)]
pub struct PendingQueue<V> {
    entries: VecDeque<PendingEntry<V>>,
}

impl<V> Default for PendingQueue<V> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }
}

impl<V> PendingQueue<V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, seq: u64, completion: Completion<V>) {
        self.entries.push_back(PendingEntry { seq, completion });
    }

    pub fn pop(&mut self) -> Option<PendingEntry<V>> {
        self.entries.pop_front()
    }

    /// Swap the queue for an empty one and hand back everything it held
    pub fn take_all(&mut self) -> VecDeque<PendingEntry<V>> {
        std::mem::take(&mut self.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence number of the oldest outstanding command
    pub fn front_seq(&self) -> Option<u64> {
        self.entries.front().map(|entry| entry.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(n: u64) -> PendingQueue<u32> {
        let mut queue = PendingQueue::with_capacity(4);
        for seq in 0..n {
            let (completion, _future) = Completion::channel();
            queue.push(seq, completion);
        }
        queue
    }

    #[test]
    fn test_pop_is_fifo() {
        let mut queue = queue_of(3);
        assert_eq!(queue.front_seq(), Some(0));
        assert_eq!(queue.pop().unwrap().seq, 0);
        assert_eq!(queue.pop().unwrap().seq, 1);
        assert_eq!(queue.pop().unwrap().seq, 2);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_take_all_leaves_empty_queue() {
        let mut queue = queue_of(5);
        let taken = queue.take_all();
        assert_eq!(taken.len(), 5);
        assert!(queue.is_empty());
        assert_eq!(queue.front_seq(), None);
    }

    #[test]
    fn test_grows_past_capacity_hint() {
        let queue = queue_of(100);
        assert_eq!(queue.len(), 100);
    }
}
