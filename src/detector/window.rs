/// Fixed-capacity ring buffer over the most recent temperature values for one
/// channel. Length can never exceed capacity; insertion order is receipt
/// order. The detector owns the evict-after-evaluate cycle, so `push` is only
/// legal while the window has room.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    slots: Box<[f64]>,
    head: usize,
    len: usize,
}

impl SlidingWindow {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "window capacity must be positive");
        Self {
            slots: vec![0.0; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Tail insert. Caller must evict before pushing into a full window.
    pub fn push(&mut self, value: f64) {
        assert!(!self.is_full(), "push into full window; evict first");
        let tail = (self.head + self.len) % self.capacity();
        self.slots[tail] = value;
        self.len += 1;
    }

    /// Removes and returns the single oldest entry.
    pub fn pop_oldest(&mut self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        Some(value)
    }

    pub fn oldest(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            Some(self.slots[self.head])
        }
    }

    pub fn newest(&self) -> Option<f64> {
        if self.is_empty() {
            None
        } else {
            let tail = (self.head + self.len - 1) % self.capacity();
            Some(self.slots[tail])
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).map(move |i| self.slots[(self.head + i) % self.capacity()])
    }

    /// Full-window spread, `max - min`. Non-negative by construction even if
    /// values arrived out of temporal order.
    pub fn spread(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in self.iter() {
            min = min.min(value);
            max = max.max(value);
        }
        Some(max - min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_tracks_insertions_up_to_capacity() {
        let mut window = SlidingWindow::new(5);
        for i in 0..5 {
            assert_eq!(window.len(), i);
            window.push(i as f64);
        }
        assert!(window.is_full());
        assert_eq!(window.pop_oldest(), Some(0.0));
        assert_eq!(window.len(), 4);
    }

    #[test]
    fn endpoints_survive_wraparound() {
        let mut window = SlidingWindow::new(3);
        // Push/pop enough to wrap the ring twice.
        for i in 0..10 {
            window.push(i as f64);
            if window.is_full() {
                window.pop_oldest();
            }
        }
        assert_eq!(window.len(), 2);
        assert_eq!(window.oldest(), Some(8.0));
        assert_eq!(window.newest(), Some(9.0));
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![8.0, 9.0]);
    }

    #[test]
    fn spread_is_max_minus_min_regardless_of_order() {
        let mut window = SlidingWindow::new(4);
        for v in [150.0, 151.2, 149.8, 150.5] {
            window.push(v);
        }
        let spread = window.spread().unwrap();
        assert!((spread - 1.4).abs() < 1e-9);
        assert!(spread >= 0.0);
    }

    #[test]
    fn empty_window_has_no_extrema() {
        let window = SlidingWindow::new(2);
        assert_eq!(window.oldest(), None);
        assert_eq!(window.newest(), None);
        assert_eq!(window.spread(), None);
    }
}
