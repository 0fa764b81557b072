use serde::{Deserialize, Serialize};

/// An error detected while validating or parsing a [`WorldConfig`].
///
/// All of these are fatal: a world is never created from a configuration that fails
/// validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("layer `{layer}` has a non-positive pitch ({pitch})")]
    NonPositivePitch { layer: &'static str, pitch: f32 },
    #[error("layer `{layer}` has a negative load radius ({load})")]
    NegativeLoadRadius { layer: &'static str, load: i32 },
    #[error(
        "layer `{layer}` must keep its unload radius ({unload}) strictly greater than its \
         load radius ({load})"
    )]
    NoHysteresis {
        layer: &'static str,
        load: i32,
        unload: i32,
    },
    #[error(
        "the settlement pitch ({coarse}) must be a positive multiple of the terrain \
         pitch ({fine})"
    )]
    MisalignedGrids { fine: f32, coarse: f32 },
    #[error("the blend radius ({blend}) must not be smaller than the safe radius ({safe})")]
    BlendInsideSafeZone { safe: f32, blend: f32 },
    #[error("the height field needs at least one octave")]
    NoOctaves,
    #[error("failed to parse world settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// The streaming parameters of one content layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StreamConfig {
    /// The side length of one grid cell, in world units.
    pub pitch: f32,
    /// Cells within this Chebyshev radius of the observer's cell are kept loaded.
    pub load_radius: i32,
    /// Cells beyond this Chebyshev radius of the observer's cell are destroyed.
    ///
    /// Keeping this strictly greater than `load_radius` gives the streamer a hysteresis band
    /// so that jitter around a cell boundary never destroys and rebuilds the same cell.
    pub unload_radius: i32,
}

impl StreamConfig {
    fn validate(&self, layer: &'static str) -> Result<(), ConfigError> {
        if self.pitch <= 0.0 {
            return Err(ConfigError::NonPositivePitch {
                layer,
                pitch: self.pitch,
            });
        }
        if self.load_radius < 0 {
            return Err(ConfigError::NegativeLoadRadius {
                layer,
                load: self.load_radius,
            });
        }
        if self.unload_radius <= self.load_radius {
            return Err(ConfigError::NoHysteresis {
                layer,
                load: self.load_radius,
                unload: self.unload_radius,
            });
        }
        Ok(())
    }
}

/// One octave of the height field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OctaveConfig {
    /// The spatial frequency of this octave, in noise cycles per world unit.
    pub frequency: f32,
    /// The relative amplitude of this octave.
    pub amplitude: f32,
}

/// The placement rules for one kind of scattered prop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PropRules {
    /// The number of placements a cell aims for.
    ///
    /// The actual number accepted is usually lower: candidates rejected by the slope, density
    /// and spacing checks are not retried, which is precisely how sparse areas end up sparse.
    pub count: u32,
    /// The steepest ground this prop tolerates, as a gradient magnitude.
    pub max_slope: f32,
    /// The minimum distance between two accepted placements in the same cell.
    pub min_spacing: f32,
    /// The smallest scale a placement can take.
    pub min_scale: f32,
    /// The largest scale a placement can take.
    pub max_scale: f32,
    /// A multiplier applied to the biome's vegetation density before the density gate.
    pub density_weight: f32,
    /// The radius of the collision cylinder, or `0.0` for no collider.
    pub collider_radius: f32,
    /// The vertical extent of the collision cylinder.
    pub collider_height: f32,
}

/// The placement rules for settlements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SettlementRules {
    /// How many candidate positions a region tries before giving up.
    pub attempts: u32,
    /// The steepest ground a settlement tolerates, as a gradient magnitude.
    pub max_slope: f32,
    /// The minimum distance between two settlements.
    pub min_spacing: f32,
    /// The radius of the ring the huts are laid out on.
    pub cluster_radius: f32,
    /// The number of huts in a settlement.
    pub hut_count: u32,
}

/// The parameters of the biome bands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BiomeConfig {
    /// The outer radii of the three inner bands, in increasing order.
    ///
    /// Positions beyond the last radius classify as the frontier.
    pub band_radii: [f32; 3],
    /// The wavelength of the moisture field, in world units.
    pub moisture_scale: f32,
    /// How far the moisture field displaces the band boundaries, in world units.
    pub band_wobble: f32,
}

/// The process-wide world settings, fixed at world creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// The seed every noise and hash derives from. Same seed, same world.
    pub seed: u64,
    /// The elevation the safe zone is flattened to.
    pub base_height: f32,
    /// The global factor the normalized octave sum is scaled by.
    pub height_scale: f32,
    /// Within this radius of the origin, the ground is exactly `base_height`.
    pub safe_radius: f32,
    /// Between `safe_radius` and this radius, the ground blends back to the open terrain.
    pub blend_radius: f32,
    /// The octaves of the height field.
    pub octaves: Vec<OctaveConfig>,
    /// Streaming parameters of the terrain surface layer.
    pub terrain: StreamConfig,
    /// Streaming parameters of the vegetation layer.
    pub vegetation: StreamConfig,
    /// Streaming parameters of the settlement layer. Its pitch is the "region" size and must
    /// be a multiple of the terrain pitch.
    pub settlements: StreamConfig,
    /// The biome band layout.
    pub biomes: BiomeConfig,
    /// Placement rules for trees.
    pub trees: PropRules,
    /// Placement rules for rocks.
    pub rocks: PropRules,
    /// Placement rules for grass tufts.
    pub grass: PropRules,
    /// Placement rules for settlements.
    pub settlement_rules: SettlementRules,
}

impl WorldConfig {
    /// Parses a [`WorldConfig`] from RON source and validates it.
    pub fn from_ron(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration invariants that the rest of the engine relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.terrain.validate("terrain")?;
        self.vegetation.validate("vegetation")?;
        self.settlements.validate("settlements")?;

        let ratio = self.settlements.pitch / self.terrain.pitch;
        if ratio < 1.0 || ratio.fract() != 0.0 {
            return Err(ConfigError::MisalignedGrids {
                fine: self.terrain.pitch,
                coarse: self.settlements.pitch,
            });
        }

        if self.blend_radius < self.safe_radius {
            return Err(ConfigError::BlendInsideSafeZone {
                safe: self.safe_radius,
                blend: self.blend_radius,
            });
        }

        if self.octaves.is_empty() {
            return Err(ConfigError::NoOctaves);
        }

        Ok(())
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            base_height: 6.0,
            height_scale: 22.0,
            safe_radius: 30.0,
            blend_radius: 45.0,
            octaves: vec![
                OctaveConfig {
                    frequency: 1.0 / 180.0,
                    amplitude: 1.0,
                },
                OctaveConfig {
                    frequency: 1.0 / 90.0,
                    amplitude: 0.5,
                },
                OctaveConfig {
                    frequency: 1.0 / 45.0,
                    amplitude: 0.25,
                },
                OctaveConfig {
                    frequency: 1.0 / 22.0,
                    amplitude: 0.12,
                },
                OctaveConfig {
                    frequency: 1.0 / 11.0,
                    amplitude: 0.06,
                },
            ],
            terrain: StreamConfig {
                pitch: 12.0,
                load_radius: 6,
                unload_radius: 8,
            },
            vegetation: StreamConfig {
                pitch: 12.0,
                load_radius: 5,
                unload_radius: 7,
            },
            settlements: StreamConfig {
                pitch: 96.0,
                load_radius: 2,
                unload_radius: 3,
            },
            biomes: BiomeConfig {
                band_radii: [45.0, 220.0, 520.0],
                moisture_scale: 140.0,
                band_wobble: 24.0,
            },
            trees: PropRules {
                count: 14,
                max_slope: 0.9,
                min_spacing: 1.6,
                min_scale: 0.8,
                max_scale: 1.4,
                density_weight: 1.0,
                collider_radius: 0.35,
                collider_height: 4.0,
            },
            rocks: PropRules {
                count: 6,
                max_slope: 1.4,
                min_spacing: 1.0,
                min_scale: 0.5,
                max_scale: 1.6,
                density_weight: 0.6,
                collider_radius: 0.0,
                collider_height: 0.0,
            },
            grass: PropRules {
                count: 40,
                max_slope: 0.8,
                min_spacing: 0.4,
                min_scale: 0.7,
                max_scale: 1.3,
                density_weight: 1.5,
                collider_radius: 0.0,
                collider_height: 0.0,
            },
            settlement_rules: SettlementRules {
                attempts: 20,
                max_slope: 0.25,
                min_spacing: 180.0,
                cluster_radius: 14.0,
                hut_count: 4,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        WorldConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_non_positive_pitch() {
        let mut config = WorldConfig::default();
        config.terrain.pitch = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositivePitch { layer: "terrain", .. })
        ));
    }

    #[test]
    fn rejects_unload_not_beyond_load() {
        let mut config = WorldConfig::default();
        config.vegetation.unload_radius = config.vegetation.load_radius;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NoHysteresis { layer: "vegetation", .. })
        ));
    }

    #[test]
    fn rejects_misaligned_grids() {
        let mut config = WorldConfig::default();
        config.settlements.pitch = config.terrain.pitch * 2.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MisalignedGrids { .. })
        ));
    }

    #[test]
    fn rejects_blend_inside_safe_zone() {
        let mut config = WorldConfig::default();
        config.blend_radius = config.safe_radius - 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BlendInsideSafeZone { .. })
        ));
    }

    #[test]
    fn rejects_empty_octaves() {
        let mut config = WorldConfig::default();
        config.octaves.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoOctaves)));
    }

    #[test]
    fn ron_round_trip() {
        let config = WorldConfig::default();
        let source = ron::to_string(&config).unwrap();
        let parsed = WorldConfig::from_ron(&source).unwrap();
        assert_eq!(parsed.seed, config.seed);
        assert_eq!(parsed.octaves.len(), config.octaves.len());
        assert_eq!(parsed.settlement_rules.attempts, config.settlement_rules.attempts);
    }
}
