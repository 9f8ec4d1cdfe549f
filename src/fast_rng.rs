// PCG-LCG random number generator with per-history streams, matching
// OpenMC's random_lcg.cpp

use rand::{RngCore, SeedableRng};

/// LCG multiplier (same as OpenMC)
const PRN_MULT: u64 = 6364136223846793005;
/// LCG additive constant (same as OpenMC)
const PRN_ADD: u64 = 1442695040888963407;
/// Random numbers reserved per history (same as OpenMC).
///
/// A history that draws more than this runs into the next history's stream,
/// so the two are no longer independent. Heavy rejection sampling can get
/// there; see [`FastRng::exceeds_history_stride`].
pub const PRN_STRIDE: u64 = 152917;

/// Fast RNG using OpenMC's PCG-LCG algorithm.
///
/// This is a PCG (Permuted Congruential Generator) variant that uses
/// an LCG as the base generator with output permutation for quality.
///
/// Reference: Melissa E. O'Neill, "PCG: A Family of Simple Fast Space-Efficient
/// Statistically Good Algorithms for Random Number Generation"
#[derive(Clone, Copy, Debug)]
pub struct FastRng {
    seed: u64,
    draws: u64,
}

impl FastRng {
    /// Create a new FastRng with the given seed
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { seed, draws: 0 }
    }

    /// Random f64 in [0, 1), as OpenMC's prn()
    #[inline(always)]
    pub fn random(&mut self) -> f64 {
        // Equivalent to ldexp(result, -64)
        (self.next_u64() as f64) * 5.421010862427522e-20
    }

    /// Generator for one history.
    ///
    /// Each history starts `PRN_STRIDE` numbers after the previous one in
    /// the stream of `seed`, so a history samples the same values whichever
    /// thread or process runs it.
    pub fn for_history(seed: u64, history: u64) -> Self {
        Self::new(future_seed(history.wrapping_mul(PRN_STRIDE), seed))
    }

    /// Skip `n` numbers ahead in the stream
    pub fn advance(&mut self, n: u64) {
        self.seed = future_seed(n, self.seed);
        self.draws = self.draws.wrapping_add(n);
    }

    /// Numbers drawn or skipped since this generator was created
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// True once more numbers were drawn than a history has reserved
    pub fn exceeds_history_stride(&self) -> bool {
        self.draws > PRN_STRIDE
    }
}

/// LCG state after `n` steps from `seed`, in O(log n)
fn future_seed(mut n: u64, seed: u64) -> u64 {
    let mut g = PRN_MULT;
    let mut c = PRN_ADD;
    let mut g_new: u64 = 1;
    let mut c_new: u64 = 0;

    while n > 0 {
        if n & 1 == 1 {
            g_new = g_new.wrapping_mul(g);
            c_new = c_new.wrapping_mul(g).wrapping_add(c);
        }
        c = g.wrapping_add(1).wrapping_mul(c);
        g = g.wrapping_mul(g);
        n >>= 1;
    }

    g_new.wrapping_mul(seed).wrapping_add(c_new)
}

impl SeedableRng for FastRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::new(u64::from_le_bytes(seed))
    }
}

impl RngCore for FastRng {
    #[inline(always)]
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    #[inline(always)]
    fn next_u64(&mut self) -> u64 {
        // Advance the LCG
        self.seed = PRN_MULT.wrapping_mul(self.seed).wrapping_add(PRN_ADD);
        self.draws = self.draws.wrapping_add(1);

        // PCG output permutation
        let word = ((self.seed >> ((self.seed >> 59) + 5)) ^ self.seed)
            .wrapping_mul(12605985483714917081);
        (word >> 43) ^ word
    }

    #[inline]
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        // Fill bytes using next_u64
        let mut left = dest;
        while left.len() >= 8 {
            let bytes = self.next_u64().to_le_bytes();
            left[..8].copy_from_slice(&bytes);
            left = &mut left[8..];
        }
        if !left.is_empty() {
            let bytes = self.next_u64().to_le_bytes();
            left.copy_from_slice(&bytes[..left.len()]);
        }
    }

    #[inline]
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
