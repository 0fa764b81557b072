use std::sync::Arc;

use glam::{Vec2, Vec3};
use hnh_rng::{FromRng, Rng};
use hnh_worldgen::{
    BiomeClassifier, CellCoord, HeightSampler, PlacementSampler, SettlementRules, WorldConfig,
};
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::streamer::CellMap;
use crate::{BuildError, CellContent, CellLayer, ContentFlags};

/// The placement salt of the settlement site candidates.
const SITE_SALT: u64 = 16;
/// The placement salt of the hut ring.
const HUT_SALT: u64 = 17;
/// The placement salt of the interaction stations.
const STATION_SALT: u64 = 18;

/// The kinds of interaction stations a settlement offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    Workbench,
    FirePit,
}

impl StationKind {
    /// A human-readable name for this station.
    pub fn name(self) -> &'static str {
        match self {
            Self::Workbench => "workbench",
            Self::FirePit => "fire pit",
        }
    }
}

/// A spot external systems (crafting, dialogue) can interact with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionPoint {
    pub position: Vec3,
    pub kind: StationKind,
}

/// One building of a settlement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hut {
    pub position: Vec3,
    /// Yaw, in radians; huts face the settlement center.
    pub rotation: f32,
}

/// A placed settlement: a ring of huts around a center, plus its stations.
pub struct Settlement {
    pub center: Vec3,
    pub huts: SmallVec<[Hut; 6]>,
    pub stations: SmallVec<[InteractionPoint; 2]>,
}

/// The settlement content of one region; a region yields at most one settlement.
#[derive(Default)]
pub struct SettlementCell {
    pub settlement: Option<Settlement>,
}

/// What the registry remembers about a loaded settlement for spacing checks and queries.
struct RegistryEntry {
    center: Vec2,
    stations: SmallVec<[InteractionPoint; 2]>,
}

/// The registry of currently loaded settlements.
///
/// Written only by the settlement layer on the update thread; interaction queries from the
/// rest of the game are read-only.
#[derive(Default)]
pub struct SettlementRegistry {
    entries: CellMap<RegistryEntry>,
}

impl SettlementRegistry {
    /// The number of registered settlements.
    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the provided position keeps at least `spacing` distance from every
    /// registered settlement.
    pub fn is_clear_of(&self, pos: Vec2, spacing: f32) -> bool {
        let spacing_sq = spacing * spacing;
        self.entries
            .values()
            .all(|entry| entry.center.distance_squared(pos) >= spacing_sq)
    }

    /// Returns the closest interaction point within `radius` of the provided position.
    pub fn nearby_interaction_point(&self, pos: Vec2, radius: f32) -> Option<InteractionPoint> {
        let mut best: Option<(f32, InteractionPoint)> = None;
        for entry in self.entries.values() {
            for station in &entry.stations {
                let dist_sq = Vec2::new(station.position.x, station.position.z).distance_squared(pos);
                if dist_sq > radius * radius {
                    continue;
                }
                if best.map_or(true, |(b, _)| dist_sq < b) {
                    best = Some((dist_sq, *station));
                }
            }
        }
        best.map(|(_, station)| station)
    }

    fn insert(&mut self, region: CellCoord, entry: RegistryEntry) {
        self.entries.insert(region, entry);
    }

    fn remove(&mut self, region: CellCoord) {
        self.entries.remove(&region);
    }
}

/// The settlement registry shared between the settlement layer and external query callers.
pub type SharedSettlements = Arc<RwLock<SettlementRegistry>>;

/// Attempts one settlement per region of the coarse grid.
pub struct SettlementLayer {
    height: Arc<HeightSampler>,
    biomes: Arc<BiomeClassifier>,
    sampler: PlacementSampler,
    registry: SharedSettlements,
    pitch: f32,
    safe_radius: f32,
    rules: SettlementRules,
}

impl SettlementLayer {
    /// Creates a new [`SettlementLayer`] that records accepted settlements in the provided
    /// shared registry.
    pub fn new(
        rng: &mut impl Rng,
        config: &WorldConfig,
        height: Arc<HeightSampler>,
        biomes: Arc<BiomeClassifier>,
        registry: SharedSettlements,
    ) -> Self {
        Self {
            height,
            biomes,
            sampler: PlacementSampler::from_rng(rng),
            registry,
            pitch: config.settlements.pitch,
            safe_radius: config.safe_radius,
            rules: config.settlement_rules,
        }
    }

    /// Lays out the buildings of a settlement accepted at `center`.
    fn build_cluster(&self, region: CellCoord, center: Vec2) -> Settlement {
        let center_y = self.height.height(center.x, center.y);

        // One nested placement call per hut; the slot index fixes the ring sector, the
        // candidate jitters the hut within it.
        let mut huts = SmallVec::new();
        let sector = std::f32::consts::TAU / self.rules.hut_count.max(1) as f32;
        for (i, candidate) in self
            .sampler
            .candidates(region, self.rules.hut_count, HUT_SALT)
            .enumerate()
        {
            let angle = i as f32 * sector + (candidate.offset.x - 0.5) * sector * 0.6;
            let dist = self.rules.cluster_radius * (0.75 + 0.25 * candidate.scale01);
            let pos = center + Vec2::from_angle(angle) * dist;
            huts.push(Hut {
                position: Vec3::new(pos.x, self.height.height(pos.x, pos.y), pos.y),
                rotation: angle + std::f32::consts::PI,
            });
        }

        // The stations sit inside the hut ring.
        let mut stations = SmallVec::new();
        for (i, candidate) in self
            .sampler
            .candidates(region, 2, STATION_SALT)
            .enumerate()
        {
            let pos = center + (candidate.offset - 0.5) * self.rules.cluster_radius;
            stations.push(InteractionPoint {
                position: Vec3::new(pos.x, self.height.height(pos.x, pos.y), pos.y),
                kind: if i == 0 {
                    StationKind::Workbench
                } else {
                    StationKind::FirePit
                },
            });
        }

        Settlement {
            center: Vec3::new(center.x, center_y, center.y),
            huts,
            stations,
        }
    }
}

impl CellLayer for SettlementLayer {
    type Cell = SettlementCell;

    #[profiling::function]
    fn build(&mut self, region: CellCoord) -> Result<Self::Cell, BuildError> {
        let corner = region.min_corner(self.pitch);

        for candidate in self
            .sampler
            .candidates(region, self.rules.attempts, SITE_SALT)
        {
            let pos = corner + candidate.offset * self.pitch;
            if pos.length() <= self.safe_radius {
                continue;
            }
            if !self.biomes.params(pos.x, pos.y).structures_allowed {
                continue;
            }
            if self.height.slope(pos.x, pos.y) > self.rules.max_slope {
                continue;
            }
            if !self.registry.read().is_clear_of(pos, self.rules.min_spacing) {
                continue;
            }

            let settlement = self.build_cluster(region, pos);
            self.registry.write().insert(
                region,
                RegistryEntry {
                    center: pos,
                    stations: settlement.stations.clone(),
                },
            );
            return Ok(SettlementCell {
                settlement: Some(settlement),
            });
        }

        hnh_log::trace!("region {region} yielded no settlement");
        Ok(SettlementCell::default())
    }

    fn destroy(&mut self, region: CellCoord, cell: Self::Cell) {
        if cell.settlement.is_some() {
            self.registry.write().remove(region);
        }
        drop(cell);
    }

    fn content(&self, cell: &Self::Cell) -> CellContent {
        match &cell.settlement {
            Some(settlement) => CellContent {
                flags: ContentFlags::SETTLEMENT | ContentFlags::STATIONS,
                placements: (settlement.huts.len() + settlement.stations.len()) as u32,
            },
            None => CellContent::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hnh_rng::DefaultRng;

    fn layer(seed: u64) -> SettlementLayer {
        let config = WorldConfig::default();
        let mut rng = DefaultRng::from_seed(seed);
        let height = Arc::new(HeightSampler::new(&mut rng, &config));
        let biomes = Arc::new(BiomeClassifier::new(&mut rng, &config.biomes));
        let registry = Arc::new(RwLock::new(SettlementRegistry::default()));
        SettlementLayer::new(&mut rng, &config, height, biomes, registry)
    }

    #[test]
    fn at_most_one_settlement_per_region_and_spacing_holds() {
        let mut l = layer(12345);
        let mut built = Vec::new();

        // A block of regions across the meadows and woods bands.
        for rx in -6..=6 {
            for rz in -6..=6 {
                let region = CellCoord::new(rx, rz);
                let cell = l.build(region).unwrap();
                // Dropping the cell without `destroy` leaves the registry entry in place,
                // which is what we want here: the spacing check below reads the registry.
                if let Some(settlement) = &cell.settlement {
                    built.push((region, Vec2::new(settlement.center.x, settlement.center.z)));
                }
            }
        }

        assert!(!built.is_empty(), "no settlement at all in 169 regions");
        for (i, (_, a)) in built.iter().enumerate() {
            for (_, b) in &built[i + 1..] {
                assert!(a.distance(*b) >= l.rules.min_spacing);
            }
        }
    }

    #[test]
    fn frontier_regions_yield_nothing() {
        let mut l = layer(7);
        // Far beyond the last band radius, structures are not allowed anywhere.
        let region = CellCoord::from_world(Vec2::new(5000.0, 5000.0), l.pitch);
        let cell = l.build(region).unwrap();
        assert!(cell.settlement.is_none());
        assert_eq!(l.registry.read().count(), 0);
    }

    #[test]
    fn cluster_sits_on_the_ground() {
        let mut l = layer(3);
        let mut found = false;
        for rx in 1..10 {
            let cell = l.build(CellCoord::new(rx, 1)).unwrap();
            if let Some(settlement) = &cell.settlement {
                found = true;
                assert_eq!(settlement.huts.len(), l.rules.hut_count as usize);
                assert_eq!(settlement.stations.len(), 2);
                for hut in &settlement.huts {
                    assert_eq!(
                        hut.position.y,
                        l.height.height(hut.position.x, hut.position.z)
                    );
                }
            }
        }
        assert!(found, "no settlement in a 9-region strip");
    }

    #[test]
    fn destroy_unregisters_the_settlement() {
        let mut l = layer(12345);
        let mut region = None;
        for rx in -6..=6 {
            let coord = CellCoord::new(rx, 2);
            let cell = l.build(coord).unwrap();
            if cell.settlement.is_some() {
                region = Some((coord, cell));
                break;
            }
        }

        let (coord, cell) = region.expect("no settlement in a 13-region strip");
        let before = l.registry.read().count();
        l.destroy(coord, cell);
        assert_eq!(l.registry.read().count(), before - 1);
    }

    #[test]
    fn interaction_points_are_reachable_through_the_registry() {
        let mut l = layer(12345);
        for rx in -6..=6 {
            for rz in -6..=6 {
                let _ = l.build(CellCoord::new(rx, rz)).unwrap();
            }
        }

        let registry = l.registry.read();
        assert!(registry.count() > 0);
        let entry_pos = registry
            .entries
            .values()
            .next()
            .map(|entry| entry.center)
            .unwrap();
        let station = registry
            .nearby_interaction_point(entry_pos, l.rules.cluster_radius * 2.0)
            .expect("no station near a settlement center");
        assert!(
            Vec2::new(station.position.x, station.position.z).distance(entry_pos)
                <= l.rules.cluster_radius * 2.0
        );
    }
}
