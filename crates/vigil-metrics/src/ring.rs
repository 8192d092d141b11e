//! Fixed-capacity ring buffer with overwrite-oldest semantics.
//!
//! The buffer keeps the most recent `capacity` items in insertion order.
//! Once full, each enqueue silently drops the oldest item. All reads on an
//! empty buffer return `None`, never an error.
//!
//! The buffer carries no internal locking: it is owned by exactly one
//! storage backend, which serializes access.

use crate::error::{Result, StoreError};

/// A fixed-capacity circular buffer.
///
/// Index arithmetic uses a bitmask when the capacity is a power of two and
/// falls back to modulo otherwise; the two paths behave identically.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    /// Physical index of the oldest item.
    head: usize,
    /// Physical index of the next write.
    tail: usize,
    len: usize,
    /// `capacity - 1` when the capacity is a power of two.
    mask: Option<usize>,
}

impl<T> RingBuffer<T> {
    /// Creates a buffer with the given capacity.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidCapacity` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StoreError::InvalidCapacity { requested: 0 });
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self {
            slots,
            head: 0,
            tail: 0,
            len: 0,
            mask: capacity.is_power_of_two().then_some(capacity - 1),
        })
    }

    fn wrap(&self, index: usize) -> usize {
        match self.mask {
            Some(mask) => index & mask,
            None => index % self.slots.len(),
        }
    }

    /// Returns the fixed capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of stored items.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true when nothing is stored.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true when the buffer is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends an item, overwriting the oldest when full.
    pub fn enqueue(&mut self, item: T) {
        self.slots[self.tail] = Some(item);
        self.tail = self.wrap(self.tail + 1);
        if self.len == self.capacity() {
            // Full: the write just consumed the oldest slot.
            self.head = self.wrap(self.head + 1);
        } else {
            self.len += 1;
        }
    }

    /// Removes and returns the oldest item, or `None` when empty.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let item = self.slots[self.head].take();
        self.head = self.wrap(self.head + 1);
        self.len -= 1;
        item
    }

    /// Returns the oldest item without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Returns the newest item without removing it.
    #[must_use]
    pub fn peek_last(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let last = self.wrap(self.head + self.len - 1);
        self.slots[last].as_ref()
    }

    /// Iterates items in chronological (oldest-first) order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).filter_map(move |i| self.slots[self.wrap(self.head + i)].as_ref())
    }

    /// Returns the first item satisfying the predicate, in logical order.
    #[must_use]
    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|item| predicate(item))
    }

    /// Maps every item, in logical order.
    pub fn map<U, F>(&self, f: F) -> Vec<U>
    where
        F: FnMut(&T) -> U,
    {
        self.iter().map(f).collect()
    }

    /// Appends every item from the iterator, oldest items dropping out as
    /// needed. Convenience wrapper, not atomic beyond the single call.
    pub fn enqueue_batch(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.enqueue(item);
        }
    }

    /// Removes and returns up to `n` of the oldest items.
    pub fn dequeue_batch(&mut self, n: usize) -> Vec<T> {
        let take = n.min(self.len);
        let mut out = Vec::with_capacity(take);
        for _ in 0..take {
            if let Some(item) = self.dequeue() {
                out.push(item);
            }
        }
        out
    }

    /// Removes all items.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Rebuilds the buffer from an ordered slice of survivors, keeping only
    /// the newest `capacity` items when oversized.
    pub fn replace(&mut self, items: Vec<T>) {
        self.clear();
        let skip = items.len().saturating_sub(self.capacity());
        self.enqueue_batch(items.into_iter().skip(skip));
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Materializes the contents in chronological order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Materializes the contents in reverse-chronological order.
    #[must_use]
    pub fn to_vec_reverse(&self) -> Vec<T> {
        let mut out = self.to_vec();
        out.reverse();
        out
    }

    /// Returns clones of the items satisfying the predicate, in logical order.
    #[must_use]
    pub fn filter<P>(&self, mut predicate: P) -> Vec<T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().filter(|item| predicate(item)).cloned().collect()
    }
}
