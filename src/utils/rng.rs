//! Seeded xorshift generator for parameter initialization
//!
//! Two networks built from the same seed start from the same weights.

/// Replaces a zero seed, which would keep xorshift at zero forever.
const ZERO_SEED: u64 = 0x9e3779b97f4a7c15;

#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { ZERO_SEED } else { seed },
        }
    }

    /// Advance the 64-bit state and return its high half.
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform in `[0, 1]`.
    pub fn next_f32(&mut self) -> f32 {
        self.next_u32() as f32 / u32::MAX as f32
    }

    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    /// Draw every value from `U(-limit, limit)` with the Xavier limit for a
    /// layer mapping `fan_in` inputs to `fan_out` outputs.
    pub fn fill_xavier(&mut self, values: &mut [f32], fan_in: usize, fan_out: usize) {
        let limit = xavier_limit(fan_in, fan_out);
        values
            .iter_mut()
            .for_each(|value| *value = self.gen_range_f32(-limit, limit));
    }
}

/// `sqrt(6 / (fan_in + fan_out))`
pub fn xavier_limit(fan_in: usize, fan_out: usize) -> f32 {
    (6.0f32 / (fan_in + fan_out).max(1) as f32).sqrt()
}
