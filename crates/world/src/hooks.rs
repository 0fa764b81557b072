use bitflags::bitflags;
use hnh_worldgen::CellCoord;

bitflags! {
    /// The kinds of content a loaded cell carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContentFlags: u8 {
        /// The cell carries a terrain surface patch.
        const TERRAIN = 1 << 0;
        /// The cell carries at least one tree.
        const TREES = 1 << 1;
        /// The cell carries at least one rock.
        const ROCKS = 1 << 2;
        /// The cell carries at least one grass tuft.
        const GRASS = 1 << 3;
        /// The cell carries a settlement cluster.
        const SETTLEMENT = 1 << 4;
        /// The cell carries interaction stations.
        const STATIONS = 1 << 5;
    }
}

/// A short description of what a cell build produced, handed to lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellContent {
    /// The kinds of content the cell carries.
    pub flags: ContentFlags,
    /// The number of placed objects in the cell.
    pub placements: u32,
}

impl Default for CellContent {
    fn default() -> Self {
        Self {
            flags: ContentFlags::empty(),
            placements: 0,
        }
    }
}

/// Receives cell lifecycle notifications from a [`ChunkStreamer`](crate::ChunkStreamer).
///
/// External systems that mirror cell lifetime (an AI director registering ambush spawns per
/// settlement, a renderer creating its own per-cell representation, ...) implement this and
/// register themselves on the layer they care about.
///
/// `cell_loaded` fires after the cell's build has returned, and `cell_unloaded` fires after
/// the cell's resources have been released; a hook must therefore never hold on to anything
/// owned by the cell itself.
pub trait CellLifecycle {
    /// Called once when a cell finishes loading.
    fn cell_loaded(&mut self, coord: CellCoord, content: &CellContent);

    /// Called once when a cell has been unloaded.
    fn cell_unloaded(&mut self, coord: CellCoord);
}
