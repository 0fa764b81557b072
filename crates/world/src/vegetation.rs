use std::sync::Arc;

use glam::Vec2;
use hnh_rng::{FromRng, Rng};
use hnh_worldgen::{
    BiomeClassifier, CellCoord, HeightSampler, PlacementSampler, PropRules, WorldConfig,
};
use smallvec::SmallVec;

use crate::{
    BuildError, CellContent, CellLayer, ColliderRecord, ContentFlags, SharedColliders,
};

/// How many candidates a cell requests per prop it aims to accept.
///
/// The budget is fixed: a candidate rejected by slope, density or spacing is not retried
/// with different randomness, so sparse biomes simply yield fewer props.
const ATTEMPT_MULTIPLIER: u32 = 3;

/// A kind of scattered prop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    Tree,
    Rock,
    GrassTuft,
}

impl PropKind {
    /// The placement salt of this kind; every kind scatters over its own sequence so that
    /// different kinds never land on identical spots.
    fn salt(self) -> u64 {
        match self {
            Self::Tree => 1,
            Self::Rock => 2,
            Self::GrassTuft => 3,
        }
    }

    /// The content flag of this kind.
    fn flag(self) -> ContentFlags {
        match self {
            Self::Tree => ContentFlags::TREES,
            Self::Rock => ContentFlags::ROCKS,
            Self::GrassTuft => ContentFlags::GRASS,
        }
    }

    /// A human-readable name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Rock => "rock",
            Self::GrassTuft => "grass tuft",
        }
    }
}

/// One placed prop, laid out for instanced drawing.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PropInstance {
    pub position: [f32; 3],
    pub rotation: f32,
    pub scale: f32,
    pub variant: u32,
}

/// One instanced draw batch: every placed prop of one kind in one cell.
pub struct PropBatch {
    pub kind: PropKind,
    pub instances: Vec<PropInstance>,
}

/// The vegetation content of one loaded cell.
#[derive(Default)]
pub struct VegetationCell {
    pub batches: SmallVec<[PropBatch; 3]>,
    /// The number of collider records this cell registered.
    pub collider_count: u32,
}

impl VegetationCell {
    /// The total number of placed props in this cell.
    pub fn instance_count(&self) -> u32 {
        self.batches
            .iter()
            .map(|batch| batch.instances.len() as u32)
            .sum()
    }
}

/// Scatters trees, rocks and grass over the terrain, one cell at a time.
pub struct VegetationLayer {
    height: Arc<HeightSampler>,
    biomes: Arc<BiomeClassifier>,
    sampler: PlacementSampler,
    colliders: SharedColliders,
    pitch: f32,
    safe_radius: f32,
    kinds: [(PropKind, PropRules); 3],
}

impl VegetationLayer {
    /// Creates a new [`VegetationLayer`] that registers trunk colliders in the provided
    /// shared index.
    pub fn new(
        rng: &mut impl Rng,
        config: &WorldConfig,
        height: Arc<HeightSampler>,
        biomes: Arc<BiomeClassifier>,
        colliders: SharedColliders,
    ) -> Self {
        Self {
            height,
            biomes,
            sampler: PlacementSampler::from_rng(rng),
            colliders,
            pitch: config.vegetation.pitch,
            safe_radius: config.safe_radius,
            kinds: [
                (PropKind::Tree, config.trees),
                (PropKind::Rock, config.rocks),
                (PropKind::GrassTuft, config.grass),
            ],
        }
    }
}

impl CellLayer for VegetationLayer {
    type Cell = VegetationCell;

    #[profiling::function]
    fn build(&mut self, coord: CellCoord) -> Result<Self::Cell, BuildError> {
        // The settlement-safe zone stays clear; a cell centered inside it loads empty.
        if coord.center(self.pitch).length() <= self.safe_radius {
            return Ok(VegetationCell::default());
        }

        let corner = coord.min_corner(self.pitch);
        let mut cell = VegetationCell::default();
        // Spacing is enforced against every prop already accepted in this cell, regardless
        // of kind.
        let mut accepted: SmallVec<[Vec2; 32]> = SmallVec::new();
        let mut colliders = self.colliders.write();

        for (kind, rules) in self.kinds {
            if rules.count == 0 {
                continue;
            }

            let mut instances = Vec::new();
            let budget = rules.count * ATTEMPT_MULTIPLIER;
            for candidate in self.sampler.candidates(coord, budget, kind.salt()) {
                if instances.len() as u32 == rules.count {
                    break;
                }

                let pos = corner + candidate.offset * self.pitch;
                if pos.length() <= self.safe_radius {
                    continue;
                }

                let params = self.biomes.params(pos.x, pos.y);
                let density = (params.vegetation_density * rules.density_weight).min(1.0);
                if candidate.roll >= density {
                    continue;
                }

                if self.height.slope(pos.x, pos.y) > rules.max_slope {
                    continue;
                }

                let spacing_sq = rules.min_spacing * rules.min_spacing;
                if accepted
                    .iter()
                    .any(|other| other.distance_squared(pos) < spacing_sq)
                {
                    continue;
                }

                let y = self.height.height(pos.x, pos.y);
                let scale =
                    rules.min_scale + candidate.scale01 * (rules.max_scale - rules.min_scale);
                instances.push(PropInstance {
                    position: [pos.x, y, pos.y],
                    rotation: candidate.rotation,
                    scale,
                    variant: candidate.variant as u32,
                });
                accepted.push(pos);

                if rules.collider_radius > 0.0 {
                    colliders.insert(
                        coord,
                        ColliderRecord {
                            center: pos,
                            radius: rules.collider_radius * scale,
                            base: y,
                            top: y + rules.collider_height * scale,
                        },
                    );
                    cell.collider_count += 1;
                }
            }

            if (instances.len() as u32) < rules.count {
                hnh_log::trace!(
                    "cell {coord}: {} of {} {}s placed before the attempt budget ran out",
                    instances.len(),
                    rules.count,
                    kind.name(),
                );
            }

            if !instances.is_empty() {
                cell.batches.push(PropBatch { kind, instances });
            }
        }

        Ok(cell)
    }

    fn destroy(&mut self, coord: CellCoord, cell: Self::Cell) {
        let removed = self.colliders.write().remove_cell(coord);
        debug_assert_eq!(removed as u32, cell.collider_count);
        drop(cell);
    }

    fn content(&self, cell: &Self::Cell) -> CellContent {
        let mut flags = ContentFlags::empty();
        for batch in &cell.batches {
            flags |= batch.kind.flag();
        }
        CellContent {
            flags,
            placements: cell.instance_count(),
        }
    }
}
