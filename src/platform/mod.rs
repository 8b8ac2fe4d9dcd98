//! Platform seams for the clock and the random source.
//!
//! `Date` and `Math.random` reach the outside world only through these
//! traits, so embedders (and tests) can pin both.

mod std_impl;

pub use std_impl::{StdRandomProvider, StdTimeProvider};

/// Source of the current time.
pub trait TimeProvider: Send + Sync {
    /// Milliseconds since the Unix epoch. Used for `new Date()`.
    fn now_millis(&self) -> f64;
}

/// Source of `Math.random()` values.
pub trait RandomProvider: Send {
    /// A value in `[0, 1)`.
    fn random(&mut self) -> f64;
}

/// A clock stopped at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeProvider(pub f64);

impl TimeProvider for FixedTimeProvider {
    fn now_millis(&self) -> f64 {
        self.0
    }
}
