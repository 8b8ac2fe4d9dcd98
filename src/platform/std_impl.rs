//! Standard library implementations of the platform traits.

use super::{RandomProvider, TimeProvider};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall clock time from `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdTimeProvider;

impl StdTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for StdTimeProvider {
    fn now_millis(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as f64)
            .unwrap_or(0.0)
    }
}

/// xorshift64 generator, seeded from the clock unless told otherwise.
#[derive(Debug, Clone)]
pub struct StdRandomProvider {
    state: u64,
}

impl StdRandomProvider {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x12345678_9abcdef0);
        Self::with_seed(seed)
    }

    /// Deterministic sequence for tests
    pub fn with_seed(seed: u64) -> Self {
        let seed = if seed == 0 { 0x12345678_9abcdef0 } else { seed };
        Self { state: seed }
    }
}

impl Default for StdRandomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomProvider for StdRandomProvider {
    fn random(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;

        // upper 53 bits
        let mantissa = x >> 11;
        (mantissa as f64) / ((1u64 << 53) as f64)
    }
}
