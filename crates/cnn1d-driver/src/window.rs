//! Three-tap sliding window with zero padding
//!
//! Carries (previous, current, next) forward in registers so each input
//! element is fetched from the vector exactly once over the whole sweep.

/// Taps exposed at one sweep position: `(x[t-1], x[t], x[t+1])`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Taps {
    /// `x[t-1]`, or `0.0` at `t = 0`.
    pub prev: f32,
    /// `x[t]`.
    pub curr: f32,
    /// `x[t+1]`, or `0.0` at `t = D_IN - 1`.
    pub next: f32,
}

/// Iterator over [`Taps`] for every position of an input vector.
#[derive(Debug, Clone)]
pub struct SlidingWindow<'a> {
    input: &'a [f32],
    prev: f32,
    curr: f32,
    next: f32,
    pos: usize,
    fetches: usize,
}

impl<'a> SlidingWindow<'a> {
    /// Prime the window with `x[0]` and `x[1]`.
    pub fn new(input: &'a [f32]) -> Self {
        let mut w = Self {
            input,
            prev: 0.0,
            curr: 0.0,
            next: 0.0,
            pos: 0,
            fetches: 0,
        };
        w.curr = w.fetch(0);
        w.next = w.fetch(1);
        w
    }

    fn fetch(&mut self, i: usize) -> f32 {
        match self.input.get(i) {
            Some(&v) => {
                self.fetches += 1;
                v
            }
            None => 0.0,
        }
    }

    /// Number of reads from the input vector so far.
    pub const fn fetches(&self) -> usize {
        self.fetches
    }
}

impl Iterator for SlidingWindow<'_> {
    type Item = Taps;

    fn next(&mut self) -> Option<Taps> {
        if self.pos >= self.input.len() {
            return None;
        }
        let taps = Taps {
            prev: self.prev,
            curr: self.curr,
            next: self.next,
        };
        // one new read per step
        self.prev = self.curr;
        self.curr = self.next;
        self.next = self.fetch(self.pos + 2);
        self.pos += 1;
        Some(taps)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.input.len() - self.pos;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SlidingWindow<'_> {}
