//! Implementations of the [`Noise`](crate::Noise) trait.

mod mixer;
pub use mixer::*;

mod perlin;
pub use perlin::*;
