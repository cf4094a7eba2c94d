//! Saturating counter table.
//!
//! The building block of every table-based direction predictor: a power-of-two
//! array of n-bit counters indexed by a masked key. Counters start weakly
//! not-taken and predict taken at or above the midpoint.

/// Table of n-bit saturating counters.
#[derive(Clone, Debug)]
pub struct SCTable {
    table: Vec<u8>,
    mask: u64,
    max: u8,
    threshold: u8,
}

impl SCTable {
    /// Creates a table of `size` counters, each `bits` wide.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of counters. Must be a power of 2.
    /// * `bits` - Counter width, 1 to 7.
    pub fn new(size: usize, bits: u8) -> Self {
        let max = (1u8 << bits) - 1;
        let threshold = max / 2 + 1;
        Self {
            table: vec![threshold - 1; size],
            mask: size as u64 - 1,
            max,
            threshold,
        }
    }

    #[inline]
    fn slot(&self, key: u64) -> usize {
        (key & self.mask) as usize
    }

    /// Current counter value for `key`.
    #[inline]
    pub fn counter(&self, key: u64) -> u8 {
        self.table[self.slot(key)]
    }

    /// Predicts without training.
    #[inline]
    pub fn predict(&self, key: u64) -> bool {
        self.counter(key) >= self.threshold
    }

    /// Predicts, then trains toward `taken`. Returns the prediction made before training.
    #[inline]
    pub fn predict_update(&mut self, key: u64, taken: bool) -> bool {
        let prediction = self.predict(key);
        self.update(key, taken);
        prediction
    }

    /// Moves the counter one step toward `taken`, saturating at either end.
    #[inline]
    pub fn update(&mut self, key: u64, taken: bool) {
        let i = self.slot(key);
        let c = &mut self.table[i];
        if taken {
            if *c < self.max {
                *c += 1;
            }
        } else if *c > 0 {
            *c -= 1;
        }
    }

    /// Resets the counter to the weak state on the `taken` side.
    pub fn reset(&mut self, key: u64, taken: bool) {
        let i = self.slot(key);
        self.table[i] = if taken { self.threshold } else { self.threshold - 1 };
    }

    /// Largest counter value.
    pub const fn max(&self) -> u8 {
        self.max
    }
}
