/// A fixed-size circular buffer holding the most recent periods of a series.
///
/// Pushing into a full buffer overwrites the oldest entry and hands it back,
/// which lets rolling aggregates subtract it from their running state.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Backing storage, allocated once with the window capacity.
    data: Box<[T]>,
    /// Index of the oldest element (the next one to be overwritten when full).
    index: usize,
    /// Number of elements currently stored, at most `data.len()`.
    len: usize,
}

impl<T: Default + Copy> RingBuffer<T> {
    /// Creates an empty buffer. `capacity` must be non-zero; callers validate
    /// window sizes before building one.
    pub fn new(capacity: usize) -> Self {
        let mut vec = Vec::with_capacity(capacity);
        vec.resize_with(capacity, T::default);
        Self {
            data: vec.into_boxed_slice(),
            index: 0,
            len: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Appends a value, returning the evicted one once the buffer is full
    pub fn push(&mut self, value: T) -> Option<T> {
        let cap = self.capacity();

        if self.is_full() {
            let overwritten = std::mem::replace(&mut self.data[self.index], value);
            self.index = (self.index + 1) % cap;
            Some(overwritten)
        } else {
            let insert_at = (self.index + self.len) % cap;
            self.data[insert_at] = value;
            self.len += 1;
            None
        }
    }

    /// Iterates oldest to newest
    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.len).map(move |i| &self.data[(self.index + i) % self.capacity()])
    }
}

#[cfg(test)]
mod tests {
    use super::RingBuffer;

    #[test]
    fn fills_before_evicting() {
        let mut buf: RingBuffer<Option<f64>> = RingBuffer::new(3);
        assert_eq!(buf.capacity(), 3);
        assert_eq!(buf.push(Some(1.0)), None);
        assert_eq!(buf.push(None), None);
        assert!(!buf.is_full());
        assert_eq!(buf.push(Some(3.0)), None);
        assert!(buf.is_full());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn evicts_oldest_period() {
        let mut buf = RingBuffer::new(2);
        buf.push(Some(10.0));
        buf.push(None);

        assert_eq!(buf.push(Some(30.0)), Some(Some(10.0)));
        assert_eq!(buf.push(Some(40.0)), Some(None));

        let elems: Vec<_> = buf.iter().copied().collect();
        assert_eq!(elems, vec![Some(30.0), Some(40.0)]);
    }

    #[test]
    fn iterates_in_arrival_order_across_wraparound() {
        let mut buf = RingBuffer::new(3);
        for v in 1..=7 {
            buf.push(v);
        }
        let elems: Vec<_> = buf.iter().copied().collect();
        assert_eq!(elems, vec![5, 6, 7]);
    }

    #[test]
    fn window_of_one_always_holds_latest() {
        let mut buf = RingBuffer::new(1);
        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), Some(1));
        assert_eq!(buf.iter().copied().collect::<Vec<_>>(), vec![2]);
    }
}
