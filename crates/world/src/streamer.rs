use std::hash::BuildHasherDefault;

use glam::Vec2;
use hashbrown::HashMap;

use hnh_worldgen::{CellCoord, StreamConfig};

use crate::{CellContent, CellLifecycle};

/// A map keyed by cell coordinates.
pub(crate) type CellMap<T> = HashMap<CellCoord, T, BuildHasherDefault<rustc_hash::FxHasher>>;

/// An error reported by a layer whose cell build could not acquire its resources.
///
/// Generation itself is pure and total; this only exists for builds that allocate. A failed
/// build leaves the cell unloaded, and the streamer retries it on the next update.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BuildError(pub &'static str);

/// Builds and destroys the per-cell payload of one content layer.
///
/// # Contract
///
/// `build` must behave as a pure function of the cell coordinate (plus the world seed baked
/// into the layer): the streamer may call it at any time, in any order, and expects the same
/// cell back every time. Everything `build` allocates must be released by `destroy`; the
/// streamer guarantees exactly one `destroy` per successful `build`, and that a cell is never
/// destroyed and rebuilt at the same time.
pub trait CellLayer {
    /// The payload owned by one loaded cell of this layer.
    type Cell;

    /// Builds the payload of the provided cell.
    fn build(&mut self, coord: CellCoord) -> Result<Self::Cell, BuildError>;

    /// Releases everything `build` allocated for the provided cell.
    fn destroy(&mut self, coord: CellCoord, cell: Self::Cell);

    /// Summarizes the content of a built cell for lifecycle hooks.
    fn content(&self, cell: &Self::Cell) -> CellContent;
}

/// Maintains the set of loaded cells of one content layer around a moving observer.
///
/// The streamer is the exclusive owner of its layer's loaded cells: nothing else creates or
/// destroys them, and lookups hand out plain references that must not outlive the cell.
///
/// Cells within `load_radius` (Chebyshev) of the observer's cell are loaded; loaded cells are
/// only destroyed once they drift beyond `unload_radius`. The band between the two radii is
/// deliberate hysteresis: an observer oscillating around a cell boundary never destroys and
/// rebuilds the same cell.
pub struct ChunkStreamer<L: CellLayer> {
    pitch: f32,
    load_radius: i32,
    unload_radius: i32,
    layer: L,
    cells: CellMap<L::Cell>,
    hooks: Vec<Box<dyn CellLifecycle>>,
    /// The observer cell of the previous update, used as the early-return guard.
    observer_cell: Option<CellCoord>,
    /// Cleared when a build fails, so the next update retries without a cell crossing.
    complete: bool,
    built_total: u64,
    evicted_total: u64,
}

impl<L: CellLayer> ChunkStreamer<L> {
    /// Creates a new [`ChunkStreamer`] around the provided layer.
    ///
    /// `config` is expected to have passed `WorldConfig::validate` already.
    pub fn new(config: StreamConfig, layer: L) -> Self {
        debug_assert!(config.pitch > 0.0);
        debug_assert!(config.unload_radius > config.load_radius);

        Self {
            pitch: config.pitch,
            load_radius: config.load_radius,
            unload_radius: config.unload_radius,
            layer,
            cells: CellMap::default(),
            hooks: Vec::new(),
            observer_cell: None,
            complete: false,
            built_total: 0,
            evicted_total: 0,
        }
    }

    /// Registers a lifecycle hook on this streamer.
    pub fn add_hook(&mut self, hook: Box<dyn CellLifecycle>) {
        self.hooks.push(hook);
    }

    /// Synchronizes the loaded set with the provided observer position.
    ///
    /// When this returns, every cell within `load_radius` of the observer's cell is loaded
    /// (unless its build failed, in which case the next call retries it), and no cell beyond
    /// `unload_radius` remains loaded. The whole pass early-returns when the observer has not
    /// crossed a cell boundary since the previous call, which bounds the controller's cost to
    /// once per crossing rather than once per frame.
    #[profiling::function]
    pub fn update(&mut self, observer: Vec2) {
        let center = CellCoord::from_world(observer, self.pitch);
        if self.observer_cell == Some(center) && self.complete {
            return;
        }
        self.observer_cell = Some(center);
        self.complete = true;

        let mut built = 0u64;
        for dz in -self.load_radius..=self.load_radius {
            for dx in -self.load_radius..=self.load_radius {
                let coord = center.offset(dx, dz);
                if self.cells.contains_key(&coord) {
                    continue;
                }

                match self.layer.build(coord) {
                    Ok(cell) => {
                        let content = self.layer.content(&cell);
                        for hook in &mut self.hooks {
                            hook.cell_loaded(coord, &content);
                        }
                        self.cells.insert(coord, cell);
                        built += 1;
                    }
                    Err(err) => {
                        hnh_log::warning!("cell {coord} failed to build, will retry: {err}");
                        self.complete = false;
                    }
                }
            }
        }

        let mut evicted = 0u64;
        let stale: Vec<CellCoord> = self
            .cells
            .keys()
            .copied()
            .filter(|coord| coord.chebyshev_distance(center) > self.unload_radius)
            .collect();
        for coord in stale {
            if let Some(cell) = self.cells.remove(&coord) {
                self.layer.destroy(coord, cell);
                for hook in &mut self.hooks {
                    hook.cell_unloaded(coord);
                }
                evicted += 1;
            }
        }
        self.cells.shrink_to_fit();

        self.built_total += built;
        self.evicted_total += evicted;
        if built + evicted > 0 {
            hnh_log::trace!("streamed around {center}: {built} built, {evicted} evicted");
        }
    }

    /// Returns the loaded cell at the provided coordinate, if any.
    #[inline]
    pub fn get(&self, coord: CellCoord) -> Option<&L::Cell> {
        self.cells.get(&coord)
    }

    /// Returns an iterator over all loaded cells.
    #[inline]
    pub fn loaded(&self) -> impl Iterator<Item = (CellCoord, &L::Cell)> {
        self.cells.iter().map(|(&coord, cell)| (coord, cell))
    }

    /// Returns the number of currently loaded cells.
    #[inline]
    pub fn loaded_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the cell the observer was in at the last update.
    #[inline]
    pub fn observer_cell(&self) -> Option<CellCoord> {
        self.observer_cell
    }

    /// The grid pitch of this streamer, in world units.
    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Returns the layer driven by this streamer.
    #[inline]
    pub fn layer(&self) -> &L {
        &self.layer
    }

    /// The total number of cells built since creation.
    #[inline]
    pub fn built_total(&self) -> u64 {
        self.built_total
    }

    /// The total number of cells evicted since creation.
    #[inline]
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentFlags;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// A layer whose cells are just their own coordinates, with optional synthetic failures.
    struct TestLayer {
        built: u32,
        destroyed: u32,
        fail_next: u32,
    }

    impl TestLayer {
        fn new() -> Self {
            Self {
                built: 0,
                destroyed: 0,
                fail_next: 0,
            }
        }
    }

    impl CellLayer for TestLayer {
        type Cell = CellCoord;

        fn build(&mut self, coord: CellCoord) -> Result<Self::Cell, BuildError> {
            if self.fail_next > 0 {
                self.fail_next -= 1;
                return Err(BuildError("synthetic failure"));
            }
            self.built += 1;
            Ok(coord)
        }

        fn destroy(&mut self, coord: CellCoord, cell: Self::Cell) {
            assert_eq!(coord, cell);
            self.destroyed += 1;
        }

        fn content(&self, _cell: &Self::Cell) -> CellContent {
            CellContent {
                flags: ContentFlags::TERRAIN,
                placements: 1,
            }
        }
    }

    fn streamer(load: i32, unload: i32) -> ChunkStreamer<TestLayer> {
        ChunkStreamer::new(
            StreamConfig {
                pitch: 64.0,
                load_radius: load,
                unload_radius: unload,
            },
            TestLayer::new(),
        )
    }

    #[test]
    fn initial_update_loads_the_full_square() {
        let mut s = streamer(3, 4);
        s.update(Vec2::ZERO);

        assert_eq!(s.loaded_count(), 49);
        for dz in -3..=3 {
            for dx in -3..=3 {
                assert!(s.get(CellCoord::new(dx, dz)).is_some());
            }
        }
        assert!(s.get(CellCoord::new(4, 0)).is_none());
    }

    #[test]
    fn update_within_the_same_cell_is_a_no_op() {
        let mut s = streamer(3, 4);
        s.update(Vec2::ZERO);
        let built = s.built_total();
        s.update(Vec2::new(30.0, 55.0));
        assert_eq!(s.built_total(), built);
    }

    #[test]
    fn crossing_a_cell_loads_ahead_and_keeps_the_hysteresis_band() {
        let mut s = streamer(3, 4);
        s.update(Vec2::ZERO);

        // One cell east: the new column loads, the trailing column is inside the hysteresis
        // band and stays.
        s.update(Vec2::new(64.0, 0.0));
        assert!(s.get(CellCoord::new(4, 0)).is_some());
        assert!(s.get(CellCoord::new(-3, 0)).is_some());
        assert_eq!(s.loaded_count(), 56);

        // Another cell east: the trailing column is now beyond the unload radius.
        s.update(Vec2::new(128.0, 0.0));
        assert!(s.get(CellCoord::new(-3, 0)).is_none());
        assert!(s.get(CellCoord::new(-2, 0)).is_some());
        assert_eq!(s.loaded_count(), 56);
    }

    #[test]
    fn loaded_set_invariant_holds_after_a_long_walk() {
        let mut s = streamer(2, 3);
        let mut pos = Vec2::ZERO;
        for _ in 0..200 {
            pos += Vec2::new(17.0, 9.0);
            s.update(pos);

            let center = s.observer_cell().unwrap();
            for dz in -2..=2 {
                for dx in -2..=2 {
                    assert!(s.get(center.offset(dx, dz)).is_some());
                }
            }
            for (coord, _) in s.loaded() {
                assert!(coord.chebyshev_distance(center) <= 3);
            }
        }
    }

    #[test]
    fn every_build_is_balanced_by_a_destroy() {
        let mut s = streamer(2, 3);
        let mut pos = Vec2::ZERO;
        for _ in 0..100 {
            pos += Vec2::new(40.0, -13.0);
            s.update(pos);
        }
        // Walk back to where we started.
        for _ in 0..100 {
            pos -= Vec2::new(40.0, -13.0);
            s.update(pos);
        }

        let layer = s.layer();
        assert_eq!(layer.built as usize - layer.destroyed as usize, s.loaded_count());
    }

    #[test]
    fn failed_builds_are_retried_on_the_next_update() {
        let mut s = streamer(3, 4);
        s.layer.fail_next = 2;

        s.update(Vec2::ZERO);
        assert_eq!(s.loaded_count(), 47);

        // The observer has not moved, but the streamer knows it is incomplete.
        s.update(Vec2::ZERO);
        assert_eq!(s.loaded_count(), 49);
    }

    /// Records lifecycle events for inspection.
    struct Recorder {
        events: Rc<RefCell<Vec<(CellCoord, bool)>>>,
    }

    impl CellLifecycle for Recorder {
        fn cell_loaded(&mut self, coord: CellCoord, content: &CellContent) {
            assert!(content.flags.contains(ContentFlags::TERRAIN));
            self.events.borrow_mut().push((coord, true));
        }

        fn cell_unloaded(&mut self, coord: CellCoord) {
            self.events.borrow_mut().push((coord, false));
        }
    }

    #[test]
    fn hooks_mirror_cell_lifetime() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut s = streamer(1, 2);
        s.add_hook(Box::new(Recorder {
            events: events.clone(),
        }));

        let mut pos = Vec2::ZERO;
        for _ in 0..40 {
            pos += Vec2::new(64.0, 0.0);
            s.update(pos);
        }

        // Per coordinate, events strictly alternate load/unload starting with a load.
        let mut state: CellMap<bool> = CellMap::default();
        for (coord, loaded) in events.borrow().iter() {
            let prev = state.insert(*coord, *loaded);
            assert_ne!(prev, Some(*loaded), "double event for {coord}");
        }

        let loads = events.borrow().iter().filter(|(_, l)| *l).count();
        let unloads = events.borrow().len() - loads;
        assert_eq!(loads - unloads, s.loaded_count());
    }
}
