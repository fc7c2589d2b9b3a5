//! Fixed-capacity queues bridging the tick handler and the main loop.
//!
//! The producer runs in interrupt context, the consumer in the main loop.
//! Storage is a `heapless` SPSC queue; this wrapper adds the drop counter and
//! the [`ProducerGate`] the consumer uses to hold the producer off.

use heapless::spsc::Queue;
use log::trace;
use sb_core::config::{INPUT_CAPACITY, PENDING_CAPACITY};
use sb_core::PendingEvent;

use crate::input::InputEvent;

/// A push found the queue full; the item was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("queue full")]
pub struct QueueFull;

/// Runs a closure with the producer held off.
///
/// On hardware this masks the clock interrupt; hosts with a single context
/// need nothing.
pub trait ProducerGate {
    fn suspend<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// Gate for a single execution context.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleContext;

impl ProducerGate for SingleContext {
    #[inline]
    fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

/// Queue of `N` slots holding at most `N - 1` items. Overflow drops the new
/// item and counts it.
pub struct BoundedQueue<T, const N: usize> {
    queue: Queue<T, N>,
    dropped: u32,
}

/// Pending note queue between `on_tick` and the voice dispatcher.
pub type PendingQueue = BoundedQueue<PendingEvent, PENDING_CAPACITY>;
/// Decoded input events waiting for the router.
pub type InputQueue = BoundedQueue<InputEvent, INPUT_CAPACITY>;

impl<T, const N: usize> BoundedQueue<T, N> {
    pub const fn new() -> Self {
        Self {
            queue: Queue::new(),
            dropped: 0,
        }
    }

    /// Usable capacity (`N - 1`).
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Items dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn push(&mut self, item: T) -> Result<(), QueueFull> {
        self.queue.enqueue(item).map_err(|_| {
            self.dropped = self.dropped.wrapping_add(1);
            trace!("queue full, item dropped");
            QueueFull
        })
    }

    pub fn pop(&mut self) -> Option<T> {
        self.queue.dequeue()
    }

    /// Empty the queue. Exclusive access stands in for a suspended producer.
    pub fn reset(&mut self) {
        while self.queue.dequeue().is_some() {}
    }
}

impl<T, const N: usize> Default for BoundedQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holds_one_less_than_capacity() {
        let mut queue = BoundedQueue::<u32, 8>::new();
        assert_eq!(queue.capacity(), 7);
        for i in 0..7 {
            queue.push(i).unwrap();
        }
        assert_eq!(queue.len(), 7);
        assert_eq!(queue.push(99), Err(QueueFull));
        assert_eq!(queue.dropped(), 1);
    }

    #[test]
    fn overflow_never_corrupts_queued_items() {
        let mut queue = BoundedQueue::<u32, 8>::new();
        for i in 0..9 {
            let _ = queue.push(i);
        }
        let drained: Vec<u32> = core::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained, [0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(queue.dropped(), 2);
    }

    #[test]
    fn wraps_around() {
        let mut queue = BoundedQueue::<u32, 4>::new();
        for round in 0..10 {
            queue.push(round).unwrap();
            queue.push(round + 100).unwrap();
            assert_eq!(queue.pop(), Some(round));
            assert_eq!(queue.pop(), Some(round + 100));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn reset_empties_and_keeps_drop_count() {
        let mut queue = BoundedQueue::<u32, 4>::new();
        for i in 0..4 {
            let _ = queue.push(i);
        }
        queue.reset();
        assert!(queue.is_empty());
        assert_eq!(queue.pop(), None);
        assert_eq!(queue.dropped(), 1);
        queue.push(7).unwrap();
        assert_eq!(queue.pop(), Some(7));
    }

    #[test]
    fn single_context_gate_runs_closure() {
        assert_eq!(SingleContext.suspend(|| 42), 42);
    }
}
