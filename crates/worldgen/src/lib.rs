//! The pure generation surface of Hills 'n Huts.
//!
//! Everything in this crate is a deterministic function of the world seed and a position:
//! elevation, biome classification, and object placement. Nothing here owns resources or
//! depends on what is currently loaded, which is what allows the streaming layers to build
//! cells in any order and still agree on shared borders.

mod cell;
pub use cell::*;

mod config;
pub use config::*;

mod height;
pub use height::*;

mod biome;
pub use biome::*;

mod scatter;
pub use scatter::*;
