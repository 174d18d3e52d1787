//! Fixed-capacity word ring with overwrite-oldest semantics.
//!
//! Storage is a flat array of `1 << shift` words addressed by two free-running
//! counters. `head` is the next word to read and `tail` the next slot to
//! write. Both only ever increase (with wrapping), so:
//!
//! - the physical slot of a counter is `counter & mask`;
//! - the number of unread words is `tail.wrapping_sub(head)`.
//!
//! The second identity holds across counter overflow because the capacity is a
//! power of two (it divides `usize::MAX + 1`) and `push` never lets occupancy
//! exceed the capacity.
//!
//! The ring knows nothing about record structure and has no locking of its
//! own; `MemLogger` owns it behind its state mutex.

/// The buffer's storage unit.
pub type Word = u64;

/// Reserved word marking the start of a record.
///
/// Data fields never produce this value: sizes and counters are far below it
/// and signed fields are stored in the low 32 bits only.
pub const SENTINEL: Word = Word::MAX;

/// Circular buffer of [`Word`]s.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    words: Box<[Word]>,
    mask: usize,
    head: usize,
    tail: usize,
    /// Words evicted by `push` since the last reset.
    overwritten: u64,
}

impl RingBuffer {
    /// Largest accepted shift (16M words).
    pub const MAX_SHIFT: u32 = 24;

    /// Creates a ring holding `1 << shift` words.
    ///
    /// `shift` is clamped to [`Self::MAX_SHIFT`].
    pub fn new(shift: u32) -> Self {
        let capacity = 1usize << shift.min(Self::MAX_SHIFT);
        Self {
            words: vec![0; capacity].into_boxed_slice(),
            mask: capacity - 1,
            head: 0,
            tail: 0,
            overwritten: 0,
        }
    }

    /// Number of words the ring can hold.
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Appends a word, evicting the oldest unread word when full.
    ///
    /// Returns how many words were evicted (0 or 1).
    pub fn push(&mut self, word: Word) -> usize {
        self.words[self.tail & self.mask] = word;
        self.tail = self.tail.wrapping_add(1);

        let excess = self.unread().saturating_sub(self.capacity());
        if excess > 0 {
            self.head = self.tail.wrapping_sub(self.capacity());
            self.overwritten += excess as u64;
        }
        excess
    }

    /// Removes and returns the oldest unread word, or `None` when empty.
    pub fn pop(&mut self) -> Option<Word> {
        if self.head == self.tail {
            return None;
        }
        let word = self.words[self.head & self.mask];
        self.head = self.head.wrapping_add(1);
        Some(word)
    }

    /// Number of words pushed but not yet popped, in `[0, capacity]`.
    pub fn unread(&self) -> usize {
        self.tail.wrapping_sub(self.head)
    }

    /// Returns `true` if there is nothing to read.
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Words evicted by overflow since the last reset.
    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }

    /// Discards all content.
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.overwritten = 0;
    }

    #[cfg(test)]
    fn set_counters(&mut self, head: usize, tail: usize) {
        self.head = head;
        self.tail = tail;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(ring: &mut RingBuffer) -> Vec<Word> {
        std::iter::from_fn(|| ring.pop()).collect()
    }

    #[test]
    fn test_capacity_is_power_of_two() {
        assert_eq!(RingBuffer::new(0).capacity(), 1);
        assert_eq!(RingBuffer::new(3).capacity(), 8);
        assert_eq!(RingBuffer::new(14).capacity(), 16384);
        assert_eq!(
            RingBuffer::new(40).capacity(),
            1 << RingBuffer::MAX_SHIFT
        );
    }

    #[test]
    fn test_pop_empty() {
        let mut ring = RingBuffer::new(3);
        assert_eq!(ring.pop(), None);
        assert!(ring.is_empty());
        assert_eq!(ring.unread(), 0);
    }

    #[test]
    fn test_fifo_without_overflow() {
        let mut ring = RingBuffer::new(3);
        for w in [10, 20, 30] {
            assert_eq!(ring.push(w), 0);
        }
        assert_eq!(ring.unread(), 3);
        assert_eq!(drain(&mut ring), vec![10, 20, 30]);
    }

    #[test]
    fn test_overwrite_oldest_keeps_last_capacity_words() {
        // Capacity 8, ordinals 0..9: the two oldest are evicted.
        let mut ring = RingBuffer::new(3);
        for w in 0..10 {
            ring.push(w);
        }
        assert_eq!(ring.unread(), 8);
        assert_eq!(ring.overwritten(), 2);
        assert_eq!(drain(&mut ring), vec![2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_overwrite_for_many_lengths() {
        for n in 0..40u64 {
            let mut ring = RingBuffer::new(2);
            for w in 0..n {
                ring.push(w);
            }
            let expected: Vec<Word> = (n.saturating_sub(4)..n).collect();
            assert_eq!(drain(&mut ring), expected, "n = {}", n);
        }
    }

    #[test]
    fn test_interleaved_push_pop() {
        let mut ring = RingBuffer::new(2);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.pop(), Some(1));
        for w in 3..8 {
            ring.push(w);
        }
        // 2..7 pushed into 4 slots: only 4..7 survive.
        assert_eq!(drain(&mut ring), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_counters_wrap_around_usize() {
        let mut ring = RingBuffer::new(2);
        ring.set_counters(usize::MAX - 1, usize::MAX - 1);
        for w in 0..6 {
            ring.push(w);
        }
        assert_eq!(ring.unread(), 4);
        assert_eq!(drain(&mut ring), vec![2, 3, 4, 5]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_reset_discards_content() {
        let mut ring = RingBuffer::new(2);
        for w in 0..6 {
            ring.push(w);
        }
        ring.reset();
        assert_eq!(ring.unread(), 0);
        assert_eq!(ring.overwritten(), 0);
        assert_eq!(ring.pop(), None);

        ring.push(42);
        assert_eq!(drain(&mut ring), vec![42]);
    }
}
