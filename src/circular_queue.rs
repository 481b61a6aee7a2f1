use std::collections::VecDeque;
use std::fmt;

/// Fixed-capacity history, oldest item evicted when a new one is pushed
/// into a full queue. Iteration runs oldest to newest.
pub struct CircularQueue<T> {
    deque: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Clone for CircularQueue<T> {
    fn clone(&self) -> Self {
        Self {
            deque: self.deque.clone(),
            capacity: self.capacity,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CircularQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.deque.fmt(f)
    }
}

impl<T> CircularQueue<T> {
    /// A zero capacity is bumped to one so the latest item is always kept.
    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        let capacity = cap.max(1);

        Self {
            deque: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.deque.pop_front()
        } else {
            None
        };

        self.deque.push_back(item);

        evicted
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.deque.len() >= self.capacity
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn clear(&mut self) {
        self.deque.clear()
    }

    #[inline]
    pub fn latest(&self) -> Option<&T> {
        self.deque.back()
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.deque.get(idx)
    }

    #[inline]
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'_ T> {
        self.deque.iter()
    }
}

impl<T: Clone> CircularQueue<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.deque.iter().cloned().collect()
    }
}

impl CircularQueue<f32> {
    pub fn mean(&self) -> Option<f32> {
        if self.deque.is_empty() {
            return None;
        }

        Some(self.deque.iter().sum::<f32>() / self.deque.len() as f32)
    }
}
