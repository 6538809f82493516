//! Deterministic random number generation.
//!
//! A seedable xorshift64* generator with its full state exposed, so a
//! replay can restore the exact stream. Used for tie-breaking and
//! shuffling only; evaluation never consults it.

use rand_core::{impls, Error, RngCore};

/// Multiplier from the xorshift64* reference construction.
const MULTIPLIER: u64 = 0x2545_F491_4F6C_DD1D;

/// Fallback state when a caller seeds with zero (the state must never be
/// zero or the stream degenerates to all zeros).
const DEFAULT_STATE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Deterministic xorshift64* generator.
///
/// Equal states produce equal streams; [`state`](DetRng::state) /
/// [`set_state`](DetRng::set_state) allow exact capture and replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetRng {
    state: u64,
}

impl DetRng {
    /// Create a generator from a seed. A zero seed is replaced by a fixed
    /// non-zero constant.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_STATE } else { seed },
        }
    }

    /// Current generator state.
    #[inline]
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Restore a previously captured state. Zero is replaced by the same
    /// constant `new` uses.
    #[inline]
    pub fn set_state(&mut self, state: u64) {
        self.state = if state == 0 { DEFAULT_STATE } else { state };
    }

    /// Advance the generator and return the next value.
    #[inline]
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(MULTIPLIER)
    }

    /// Uniform value in `[0, bound)`. Returns 0 for a zero bound.
    #[inline]
    pub fn next_below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        self.next() % bound
    }

    /// Fisher-Yates shuffle driven by this generator.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_below(i as u64 + 1) as usize;
            items.swap(i, j);
        }
    }
}

impl Default for DetRng {
    fn default() -> Self {
        Self::new(DEFAULT_STATE)
    }
}

impl RngCore for DetRng {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        (self.next() >> 32) as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.next()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_states_equal_streams() {
        let mut a = DetRng::new(42);
        let mut b = DetRng::new(42);

        for _ in 0..100 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn test_state_capture_replay() {
        let mut rng = DetRng::new(7);
        rng.next();
        rng.next();

        let saved = rng.state();
        let ahead: Vec<u64> = (0..10).map(|_| rng.next()).collect();

        rng.set_state(saved);
        let replayed: Vec<u64> = (0..10).map(|_| rng.next()).collect();
        assert_eq!(ahead, replayed);
    }

    #[test]
    fn test_zero_seed_is_replaced() {
        let mut rng = DetRng::new(0);
        assert_ne!(rng.state(), 0);
        assert_ne!(rng.next(), 0);

        rng.set_state(0);
        assert_ne!(rng.state(), 0);
    }

    #[test]
    fn test_state_never_becomes_zero() {
        let mut rng = DetRng::new(1);
        for _ in 0..10_000 {
            rng.next();
            assert_ne!(rng.state(), 0);
        }
    }

    #[test]
    fn test_shuffle_deterministic() {
        let mut a: Vec<u32> = (0..32).collect();
        let mut b: Vec<u32> = (0..32).collect();

        DetRng::new(99).shuffle(&mut a);
        DetRng::new(99).shuffle(&mut b);
        assert_eq!(a, b);

        let mut c: Vec<u32> = (0..32).collect();
        DetRng::new(100).shuffle(&mut c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rng_core_integration() {
        use rand::Rng;

        let mut rng = DetRng::new(5);
        let value: u32 = rng.gen_range(0..10);
        assert!(value < 10);
    }
}
