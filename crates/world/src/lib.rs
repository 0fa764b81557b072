//! The streaming engine of Hills 'n Huts.
//!
//! Three content layers — the terrain surface, the vegetation, and the settlements — share one
//! generic cell streamer, and all of them read elevation and biome data from the pure samplers
//! of `hnh-worldgen`. The [`World`] facade ties the layers together and exposes the query
//! surface the rest of the game consumes.

mod streamer;
pub use streamer::*;

mod hooks;
pub use hooks::*;

mod collider;
pub use collider::*;

mod terrain;
pub use terrain::*;

mod vegetation;
pub use vegetation::*;

mod settlement;
pub use settlement::*;

mod world;
pub use world::*;
