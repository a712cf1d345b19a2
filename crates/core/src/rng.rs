//! RNG module - injectable randomness
//!
//! Every random decision of the engine (shape, colors, specials, shuffle
//! recolors, garbage rows) goes through [`RandomSource`], so a seeded source
//! makes whole rounds reproducible.
//!
//! Also provides a simple LCG for deterministic testing and default play.

/// Source of pseudo-random numbers consumed by the engine
pub trait RandomSource {
    /// Generate next random u32
    fn next_u32(&mut self) -> u32;

    /// Generate random value in range [0, max); 0 when `max` is 0
    fn next_range(&mut self, max: u32) -> u32 {
        if max == 0 {
            return 0;
        }
        self.next_u32() % max
    }

    /// True with probability `per_mille / 1000`
    fn chance(&mut self, per_mille: u32) -> bool {
        self.next_range(1000) < per_mille
    }

    /// Pick an element uniformly
    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        items.get(self.next_range(items.len() as u32) as usize)
    }
}

/// Simple LCG (Linear Congruential Generator) RNG
/// Uses constants from Numerical Recipes
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u32,
    seed: u32,
}

impl SimpleRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u32) -> Self {
        // Avoid 0 seed which would produce all zeros
        let state = if seed == 0 { 1 } else { seed };
        Self { state, seed: state }
    }

    /// Seed this generator was created with (used to restart a round)
    pub fn seed(&self) -> u32 {
        self.seed
    }
}

impl RandomSource for SimpleRng {
    fn next_u32(&mut self) -> u32 {
        // LCG formula: (a * state + c) mod m
        // Using Numerical Recipes constants: a=1664525, c=1013904223, m=2^32
        self.state = self.state.wrapping_mul(1664525).wrapping_add(1013904223);
        // The low bits of a power-of-two LCG cycle quickly; serve the high half.
        self.state.rotate_left(16)
    }
}

impl Default for SimpleRng {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Replays a fixed sequence of values, cycling when exhausted.
///
/// Lets tests force exact choices (e.g. "always pick index 0").
#[derive(Debug, Clone)]
pub struct ScriptedRng {
    values: Vec<u32>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(values: Vec<u32>) -> Self {
        Self { values, cursor: 0 }
    }
}

impl RandomSource for ScriptedRng {
    fn next_u32(&mut self) -> u32 {
        if self.values.is_empty() {
            return 0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_deterministic() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(12345);

        // Same seed should produce same sequence
        for _ in 0..100 {
            assert_eq!(rng1.next_u32(), rng2.next_u32());
        }
    }

    #[test]
    fn test_rng_different_seeds() {
        let mut rng1 = SimpleRng::new(12345);
        let mut rng2 = SimpleRng::new(54321);

        assert_ne!(rng1.next_u32(), rng2.next_u32());
    }

    #[test]
    fn test_zero_seed_is_remapped() {
        let rng = SimpleRng::new(0);
        assert_eq!(rng.seed(), 1);
    }

    #[test]
    fn test_next_range_bounds() {
        let mut rng = SimpleRng::new(7);
        for _ in 0..1000 {
            assert!(rng.next_range(6) < 6);
        }
        assert_eq!(rng.next_range(0), 0);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = SimpleRng::new(99);
        for _ in 0..200 {
            assert!(!rng.chance(0));
            assert!(rng.chance(1000));
        }
    }

    #[test]
    fn test_scripted_rng_cycles() {
        let mut rng = ScriptedRng::new(vec![3, 5]);
        assert_eq!(rng.next_u32(), 3);
        assert_eq!(rng.next_u32(), 5);
        assert_eq!(rng.next_u32(), 3);
        assert_eq!(rng.pick(&['a', 'b', 'c', 'd']), Some(&'b'));
    }
}
