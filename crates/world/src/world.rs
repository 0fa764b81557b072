use std::sync::Arc;

use glam::{Vec2, Vec3};
use hnh_rng::noises::Mixer;
use hnh_rng::{DefaultRng, FromRng, Noise, Rng};
use hnh_worldgen::{
    BiomeClassifier, BiomeId, BiomeParams, CellCoord, ConfigError, HeightSampler, WorldConfig,
};
use parking_lot::RwLock;

use crate::{
    CellLifecycle, ChunkStreamer, InteractionPoint, Settlement, SettlementCell, SettlementLayer,
    SettlementRegistry, SharedColliders, SharedSettlements, SurfacePatch, TerrainLayer,
    VegetationCell, VegetationLayer,
};

/// The number of candidate positions [`World::find_valid_spawn_point`] tries before falling
/// back.
const SPAWN_ATTEMPTS: u64 = 32;

/// The steepest ground a spawn point tolerates, as a gradient magnitude.
const MAX_SPAWN_SLOPE: f32 = 0.45;

/// Ground at or below this elevation counts as submerged and is never a spawn point.
const SEA_LEVEL: f32 = 0.0;

/// The streamed world: three content layers around a moving observer, plus the query surface
/// the rest of the game consumes.
///
/// All generation is a pure function of the seed in the [`WorldConfig`], so two worlds
/// created from the same configuration are identical, cell for cell, no matter how their
/// observers move.
pub struct World {
    config: WorldConfig,
    height: Arc<HeightSampler>,
    biomes: Arc<BiomeClassifier>,
    colliders: SharedColliders,
    registry: SharedSettlements,
    terrain: ChunkStreamer<TerrainLayer>,
    vegetation: ChunkStreamer<VegetationLayer>,
    settlements: ChunkStreamer<SettlementLayer>,
    spawn_hash: Mixer<2>,
}

impl World {
    /// Creates a new [`World`] from the provided configuration.
    ///
    /// The configuration is validated first; an invalid configuration refuses to start.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        hnh_log::info!("creating a new world with seed: {}", config.seed);

        // Everything below draws from this one generator, in a fixed order; the order is part
        // of what "same seed, same world" means.
        let mut rng = DefaultRng::from_seed(config.seed);
        let height = Arc::new(HeightSampler::new(&mut rng, &config));
        let biomes = Arc::new(BiomeClassifier::new(&mut rng, &config.biomes));
        let colliders: SharedColliders = Arc::new(RwLock::new(Default::default()));
        let registry: SharedSettlements = Arc::new(RwLock::new(SettlementRegistry::default()));

        let terrain = ChunkStreamer::new(
            config.terrain,
            TerrainLayer::new(&mut rng, &config, height.clone(), biomes.clone()),
        );
        let vegetation = ChunkStreamer::new(
            config.vegetation,
            VegetationLayer::new(
                &mut rng,
                &config,
                height.clone(),
                biomes.clone(),
                colliders.clone(),
            ),
        );
        let settlements = ChunkStreamer::new(
            config.settlements,
            SettlementLayer::new(
                &mut rng,
                &config,
                height.clone(),
                biomes.clone(),
                registry.clone(),
            ),
        );
        let spawn_hash = Mixer::from_rng(&mut rng);

        Ok(Self {
            config,
            height,
            biomes,
            colliders,
            registry,
            terrain,
            vegetation,
            settlements,
            spawn_hash,
        })
    }

    /// Synchronizes every layer's loaded set with the provided observer position.
    ///
    /// Call this once per frame; layers early-return unless the observer crossed one of
    /// their cell boundaries.
    #[profiling::function]
    pub fn update(&mut self, observer: Vec3) {
        let pos = Vec2::new(observer.x, observer.z);
        self.terrain.update(pos);
        self.settlements.update(pos);
        self.vegetation.update(pos);
    }

    /// The configuration this world was created from.
    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// The elevation sampler shared by every layer.
    #[inline]
    pub fn height_sampler(&self) -> &Arc<HeightSampler> {
        &self.height
    }

    /// The biome classifier shared by every layer.
    #[inline]
    pub fn biome_classifier(&self) -> &Arc<BiomeClassifier> {
        &self.biomes
    }

    /// Returns the elevation of the ground at the provided position.
    #[inline]
    pub fn height(&self, x: f32, z: f32) -> f32 {
        self.height.height(x, z)
    }

    /// Returns the steepness of the ground at the provided position.
    #[inline]
    pub fn slope(&self, x: f32, z: f32) -> f32 {
        self.height.slope(x, z)
    }

    /// Returns the upward surface normal at the provided position.
    #[inline]
    pub fn normal(&self, x: f32, z: f32) -> Vec3 {
        self.height.normal(x, z)
    }

    /// Returns the biome of the provided position.
    #[inline]
    pub fn biome(&self, x: f32, z: f32) -> BiomeId {
        self.biomes.biome(x, z)
    }

    /// Returns the generation parameters of the provided position.
    #[inline]
    pub fn biome_params(&self, x: f32, z: f32) -> BiomeParams {
        self.biomes.params(x, z)
    }

    /// Checks the provided point against the vegetation colliders.
    ///
    /// See [`ColliderIndex::point_push_out`](crate::ColliderIndex::point_push_out).
    pub fn point_push_out(&self, position: Vec3, radius: f32) -> Option<Vec2> {
        self.colliders.read().point_push_out(position, radius)
    }

    /// Returns the closest interaction point within `radius` of the provided position.
    pub fn nearby_interaction_point(&self, x: f32, z: f32, radius: f32) -> Option<InteractionPoint> {
        self.registry
            .read()
            .nearby_interaction_point(Vec2::new(x, z), radius)
    }

    /// Finds a spawn point between `min_dist` and `max_dist` from the origin.
    ///
    /// A bounded number of deterministic candidates is tried, rejecting steep ground and
    /// submerged ground; if every candidate fails, the fallback on the safe-zone rim is
    /// returned. The result only depends on the seed and the arguments.
    pub fn find_valid_spawn_point(&self, min_dist: f32, max_dist: f32) -> Vec3 {
        for attempt in 0..SPAWN_ATTEMPTS {
            let bits = self.spawn_hash.sample([attempt, 0]);
            let angle = (bits & 0xFFFF) as f32 * (std::f32::consts::TAU / 65536.0);
            let t = ((bits >> 16) & 0xFFFF) as f32 * (1.0 / 65536.0);
            let dist = min_dist + t * (max_dist - min_dist);
            let pos = Vec2::from_angle(angle) * dist;

            let height = self.height.height(pos.x, pos.y);
            if height <= SEA_LEVEL {
                continue;
            }
            if self.height.slope(pos.x, pos.y) > MAX_SPAWN_SLOPE {
                continue;
            }

            return Vec3::new(pos.x, height, pos.y);
        }

        hnh_log::trace!("no spawn candidate passed, falling back to the safe-zone rim");
        Vec3::new(self.config.safe_radius, self.height.base_height(), 0.0)
    }

    /// The terrain streamer, for cell lookups and statistics.
    #[inline]
    pub fn terrain(&self) -> &ChunkStreamer<TerrainLayer> {
        &self.terrain
    }

    /// The vegetation streamer, for cell lookups and statistics.
    #[inline]
    pub fn vegetation(&self) -> &ChunkStreamer<VegetationLayer> {
        &self.vegetation
    }

    /// The settlement streamer, for region lookups and statistics.
    #[inline]
    pub fn settlements(&self) -> &ChunkStreamer<SettlementLayer> {
        &self.settlements
    }

    /// Returns the surface patch of a loaded terrain cell.
    ///
    /// The reference is non-owning: it must not be held across an [`update`](Self::update).
    #[inline]
    pub fn surface_patch(&self, coord: CellCoord) -> Option<&SurfacePatch> {
        self.terrain.get(coord)
    }

    /// Returns the vegetation content of a loaded cell.
    #[inline]
    pub fn vegetation_cell(&self, coord: CellCoord) -> Option<&VegetationCell> {
        self.vegetation.get(coord)
    }

    /// Returns the settlement of a loaded region, if the region has one.
    #[inline]
    pub fn settlement(&self, region: CellCoord) -> Option<&Settlement> {
        self.settlements
            .get(region)
            .and_then(|cell: &SettlementCell| cell.settlement.as_ref())
    }

    /// Returns an iterator over every placed settlement in a loaded region.
    pub fn placed_settlements(&self) -> impl Iterator<Item = (CellCoord, &Settlement)> {
        self.settlements
            .loaded()
            .filter_map(|(region, cell)| cell.settlement.as_ref().map(|s| (region, s)))
    }

    /// Registers a lifecycle hook on the terrain layer.
    pub fn add_terrain_hook(&mut self, hook: Box<dyn CellLifecycle>) {
        self.terrain.add_hook(hook);
    }

    /// Registers a lifecycle hook on the vegetation layer.
    pub fn add_vegetation_hook(&mut self, hook: Box<dyn CellLifecycle>) {
        self.vegetation.add_hook(hook);
    }

    /// Registers a lifecycle hook on the settlement layer.
    pub fn add_settlement_hook(&mut self, hook: Box<dyn CellLifecycle>) {
        self.settlements.add_hook(hook);
    }

    /// The number of currently registered vegetation colliders.
    pub fn collider_count(&self) -> usize {
        self.colliders.read().record_count()
    }

    /// The number of currently placed settlements.
    pub fn settlement_count(&self) -> usize {
        self.registry.read().count()
    }

    /// Prints debug information about the world using the provided buffer.
    pub fn debug_info(&self, buf: &mut String) {
        use std::fmt::Write;

        let _ = writeln!(
            buf,
            "Terrain cells: {} (built {}, evicted {})",
            self.terrain.loaded_count(),
            self.terrain.built_total(),
            self.terrain.evicted_total(),
        );
        let _ = writeln!(
            buf,
            "Vegetation cells: {} (built {}, evicted {})",
            self.vegetation.loaded_count(),
            self.vegetation.built_total(),
            self.vegetation.evicted_total(),
        );
        let _ = writeln!(
            buf,
            "Settlement regions: {} (built {}, evicted {})",
            self.settlements.loaded_count(),
            self.settlements.built_total(),
            self.settlements.evicted_total(),
        );
        let _ = writeln!(buf, "Colliders: {}", self.collider_count());
        let _ = writeln!(buf, "Settlements: {}", self.settlement_count());
        if let Some(cell) = self.terrain.observer_cell() {
            let _ = writeln!(buf, "Observer cell: {cell}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A configuration with small radii so the tests stay fast.
    fn small_config(seed: u64) -> WorldConfig {
        let mut config = WorldConfig::default();
        config.seed = seed;
        config.terrain.load_radius = 3;
        config.terrain.unload_radius = 4;
        config.vegetation.load_radius = 2;
        config.vegetation.unload_radius = 3;
        config.settlements.pitch = 48.0;
        config.settlements.load_radius = 1;
        config.settlements.unload_radius = 2;
        config
    }

    #[test]
    fn invalid_configurations_refuse_to_start() {
        let mut config = small_config(1);
        config.terrain.unload_radius = config.terrain.load_radius;
        assert!(World::new(config).is_err());
    }

    #[test]
    fn update_loads_every_layer() {
        let mut world = World::new(small_config(12345)).unwrap();
        world.update(Vec3::ZERO);

        assert_eq!(world.terrain().loaded_count(), 49);
        assert_eq!(world.vegetation().loaded_count(), 25);
        assert_eq!(world.settlements().loaded_count(), 9);
        assert!(world.surface_patch(CellCoord::ZERO).is_some());
        assert!(world.vegetation_cell(CellCoord::ZERO).is_some());
    }

    #[test]
    fn worlds_with_the_same_seed_agree() {
        let mut a = World::new(small_config(777)).unwrap();
        let mut b = World::new(small_config(777)).unwrap();
        let observer = Vec3::new(300.0, 0.0, -150.0);
        a.update(observer);
        b.update(observer);

        for (x, z) in [(0.0, 0.0), (311.5, -140.2), (287.0, -99.0)] {
            assert_eq!(a.height(x, z), b.height(x, z));
            assert_eq!(a.biome(x, z), b.biome(x, z));
        }

        let coord = CellCoord::from_world(Vec2::new(300.0, -150.0), 12.0);
        let (va, vb) = (
            a.vegetation_cell(coord).unwrap(),
            b.vegetation_cell(coord).unwrap(),
        );
        assert_eq!(va.instance_count(), vb.instance_count());
    }

    #[test]
    fn spawn_points_are_deterministic_and_grounded() {
        let world = World::new(small_config(12345)).unwrap();
        let a = world.find_valid_spawn_point(60.0, 400.0);
        let b = world.find_valid_spawn_point(60.0, 400.0);
        assert_eq!(a, b);
        assert_eq!(a.y, world.height(a.x, a.z));

        let planar = Vec2::new(a.x, a.z).length();
        let fallback = Vec3::new(
            world.config().safe_radius,
            world.height_sampler().base_height(),
            0.0,
        );
        assert!(
            (60.0..=400.0).contains(&planar) || a == fallback,
            "spawn point out of band: {a}"
        );
    }

    #[test]
    fn debug_info_mentions_every_layer() {
        let mut world = World::new(small_config(5)).unwrap();
        world.update(Vec3::ZERO);
        let mut buf = String::new();
        world.debug_info(&mut buf);
        assert!(buf.contains("Terrain cells"));
        assert!(buf.contains("Colliders"));
        assert!(buf.contains("Observer cell"));
    }
}
