use glam::Vec2;
use hnh_rng::noises::Perlin2;
use hnh_rng::{FromRng, Noise, Rng};

use crate::BiomeConfig;

/// Identifies one of the concentric biome bands of the world.
///
/// Bands are ordered from the origin outward: the hearth around the flattened safe zone, then
/// progressively wilder country until the frontier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BiomeId {
    /// The settled band around the origin.
    Hearth,
    /// Open grassland past the hearth.
    Meadows,
    /// Dense forest country.
    Woods,
    /// The far band; nobody builds out here.
    Frontier,
}

impl BiomeId {
    /// All biomes, ordered from the origin outward.
    pub const ALL: [Self; 4] = [Self::Hearth, Self::Meadows, Self::Woods, Self::Frontier];

    /// A human-readable name for this biome.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hearth => "hearth",
            Self::Meadows => "meadows",
            Self::Woods => "woods",
            Self::Frontier => "frontier",
        }
    }
}

/// The generation parameters a position's biome implies.
///
/// This is derived on demand and never stored; it is a pure function of the position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeParams {
    /// How much vegetation the band carries, in `[0, 1]`. Callers compare a placement roll
    /// against this.
    pub vegetation_density: f32,
    /// Whether settlements may be placed here.
    pub structures_allowed: bool,
    /// A fog density hint for the renderer.
    pub fog_density: f32,
    /// An ambient light hint for the renderer.
    pub ambient_light: f32,
}

/// Classifies world positions into biome bands.
///
/// The bands are concentric around the origin, but their boundaries are displaced by an
/// independent moisture field so they do not read as perfect circles. Classification has no
/// dependency on what is currently loaded.
pub struct BiomeClassifier {
    moisture: Perlin2,
    band_radii: [f32; 3],
    moisture_scale: f32,
    band_wobble: f32,
}

impl BiomeClassifier {
    /// Creates a new [`BiomeClassifier`] from the provided settings.
    pub fn new(rng: &mut impl Rng, config: &BiomeConfig) -> Self {
        Self {
            moisture: Perlin2::from_rng(rng),
            band_radii: config.band_radii,
            moisture_scale: config.moisture_scale,
            band_wobble: config.band_wobble,
        }
    }

    /// Samples the moisture field at the provided position, in `[-1, 1]`.
    pub fn moisture(&self, x: f32, z: f32) -> f32 {
        self.moisture
            .sample([x / self.moisture_scale, z / self.moisture_scale])
    }

    /// The distance from the origin used for band classification, after the moisture
    /// perturbation.
    fn banded_distance(&self, x: f32, z: f32) -> f32 {
        Vec2::new(x, z).length() + self.moisture(x, z) * self.band_wobble
    }

    /// Returns the biome of the provided position.
    pub fn biome(&self, x: f32, z: f32) -> BiomeId {
        let r = self.banded_distance(x, z);
        if r < self.band_radii[0] {
            BiomeId::Hearth
        } else if r < self.band_radii[1] {
            BiomeId::Meadows
        } else if r < self.band_radii[2] {
            BiomeId::Woods
        } else {
            BiomeId::Frontier
        }
    }

    /// Returns the generation parameters of the provided position.
    ///
    /// The band supplies the base values; moisture then modulates the vegetation density so
    /// that a band is not uniformly thick or thin.
    pub fn params(&self, x: f32, z: f32) -> BiomeParams {
        let base = match self.biome(x, z) {
            BiomeId::Hearth => BiomeParams {
                vegetation_density: 0.25,
                structures_allowed: false,
                fog_density: 0.002,
                ambient_light: 1.0,
            },
            BiomeId::Meadows => BiomeParams {
                vegetation_density: 0.45,
                structures_allowed: true,
                fog_density: 0.005,
                ambient_light: 0.9,
            },
            BiomeId::Woods => BiomeParams {
                vegetation_density: 0.85,
                structures_allowed: true,
                fog_density: 0.012,
                ambient_light: 0.75,
            },
            BiomeId::Frontier => BiomeParams {
                vegetation_density: 0.7,
                structures_allowed: false,
                fog_density: 0.02,
                ambient_light: 0.6,
            },
        };

        let density = base.vegetation_density * (1.0 + 0.35 * self.moisture(x, z));
        BiomeParams {
            vegetation_density: density.clamp(0.0, 1.0),
            ..base
        }
    }
}
