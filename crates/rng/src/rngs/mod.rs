//! Implementations of the [`Rng`](crate::Rng) trait.

mod xoshiro256plusplus;
pub use xoshiro256plusplus::*;
