use glam::{Vec2, Vec3};
use hnh_rng::noises::Perlin2;
use hnh_rng::{FromRng, Noise, Rng};

use crate::WorldConfig;

/// The step used by the finite differences in [`HeightSampler::gradient`].
const DERIVATIVE_STEP: f32 = 0.25;

/// One octave of the height field.
struct Octave {
    noise: Perlin2,
    frequency: f32,
    amplitude: f32,
}

/// Samples the elevation of the world at any position.
///
/// This is the single source of truth for elevation: terrain patches, vegetation placement,
/// settlement placement and collision checks all go through the same sampler, which is what
/// keeps independently generated cells consistent at their shared borders.
///
/// Sampling is a pure function of the construction seed and the queried position; a
/// [`HeightSampler`] holds no mutable state and can be shared freely between readers.
pub struct HeightSampler {
    octaves: Vec<Octave>,
    /// Reciprocal of the octave amplitude sum, so the octave mix stays in `[-1, 1]`.
    inv_total_amplitude: f32,
    height_scale: f32,
    base_height: f32,
    safe_radius: f32,
    blend_radius: f32,
}

impl HeightSampler {
    /// Creates a new [`HeightSampler`] from the provided settings.
    ///
    /// The octave noises are drawn from `rng` in configuration order, so a given seed always
    /// produces the same field.
    pub fn new(rng: &mut impl Rng, config: &WorldConfig) -> Self {
        let octaves: Vec<Octave> = config
            .octaves
            .iter()
            .map(|oct| Octave {
                noise: Perlin2::from_rng(rng),
                frequency: oct.frequency,
                amplitude: oct.amplitude,
            })
            .collect();

        let total_amplitude: f32 = octaves.iter().map(|oct| oct.amplitude).sum();

        Self {
            octaves,
            inv_total_amplitude: 1.0 / total_amplitude,
            height_scale: config.height_scale,
            base_height: config.base_height,
            safe_radius: config.safe_radius,
            blend_radius: config.blend_radius,
        }
    }

    /// The elevation the safe zone is flattened to.
    #[inline]
    pub fn base_height(&self) -> f32 {
        self.base_height
    }

    /// The open terrain, before the safe zone is blended in.
    fn wilderness(&self, x: f32, z: f32) -> f32 {
        let mut sum = 0.0;
        for oct in &self.octaves {
            sum += oct.noise.sample([x * oct.frequency, z * oct.frequency]) * oct.amplitude;
        }
        self.base_height + sum * self.inv_total_amplitude * self.height_scale
    }

    /// Returns the elevation of the ground at the provided position.
    pub fn height(&self, x: f32, z: f32) -> f32 {
        let r = Vec2::new(x, z).length();
        if r <= self.safe_radius {
            return self.base_height;
        }

        let wild = self.wilderness(x, z);
        if r >= self.blend_radius {
            return wild;
        }

        // Smoothstep of the normalized radial distance: zero first derivative at both rims, so
        // neither collision nor the rendered surface shows a seam.
        let t = (r - self.safe_radius) / (self.blend_radius - self.safe_radius);
        let s = t * t * (3.0 - 2.0 * t);
        self.base_height + (wild - self.base_height) * s
    }

    /// Returns the elevation gradient at the provided position, by symmetric finite
    /// differences of [`height`](Self::height).
    ///
    /// Re-using `height` here means the reported gradient can never disagree with the value a
    /// collision check would read at the same spot.
    pub fn gradient(&self, x: f32, z: f32) -> Vec2 {
        let step = DERIVATIVE_STEP;
        Vec2::new(
            (self.height(x + step, z) - self.height(x - step, z)) / (2.0 * step),
            (self.height(x, z + step) - self.height(x, z - step)) / (2.0 * step),
        )
    }

    /// Returns the steepness of the ground at the provided position, as the magnitude of the
    /// elevation gradient.
    #[inline]
    pub fn slope(&self, x: f32, z: f32) -> f32 {
        self.gradient(x, z).length()
    }

    /// Returns the upward surface normal at the provided position.
    pub fn normal(&self, x: f32, z: f32) -> Vec3 {
        let g = self.gradient(x, z);
        Vec3::new(-g.x, 1.0, -g.y).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hnh_rng::DefaultRng;

    fn sampler_with(seed: u64, safe: f32, blend: f32) -> HeightSampler {
        let mut config = WorldConfig::default();
        config.seed = seed;
        config.safe_radius = safe;
        config.blend_radius = blend;
        let mut rng = DefaultRng::from_seed(seed);
        HeightSampler::new(&mut rng, &config)
    }

    #[test]
    fn same_seed_is_bit_identical() {
        let a = sampler_with(12345, 30.0, 45.0);
        let b = sampler_with(12345, 30.0, 45.0);
        for i in 0..64 {
            let (x, z) = (i as f32 * 13.7 - 400.0, i as f32 * -7.3 + 120.0);
            assert_eq!(a.height(x, z), b.height(x, z));
        }
    }

    #[test]
    fn different_seeds_differ() {
        let a = sampler_with(1, 0.0, 0.0);
        let b = sampler_with(2, 0.0, 0.0);
        let differing = (0..32)
            .filter(|i| {
                let (x, z) = (*i as f32 * 31.0, *i as f32 * 17.0 + 3.0);
                a.height(x, z) != b.height(x, z)
            })
            .count();
        assert!(differing > 24);
    }

    #[test]
    fn safe_zone_is_flat_and_blends_out() {
        let sampler = sampler_with(12345, 30.0, 45.0);
        let open = sampler_with(12345, 0.0, 0.0);
        let base = sampler.base_height();

        // Inside the safe radius: exactly the base height.
        assert_eq!(sampler.height(0.0, 0.0), base);
        assert_eq!(sampler.height(29.0, 0.0), base);

        // Beyond the blend radius: exactly the open terrain.
        assert_eq!(sampler.height(100.0, 0.0), open.height(100.0, 0.0));

        // In the blend band: strictly between the base height and the open terrain.
        let raw = open.height(37.0, 0.0);
        let blended = sampler.height(37.0, 0.0);
        if (raw - base).abs() > 1e-3 {
            let t = (blended - base) / (raw - base);
            assert!(t > 0.0 && t < 1.0, "blend factor out of range: {t}");
        }
    }

    #[test]
    fn safe_zone_has_zero_slope_and_upright_normal() {
        let sampler = sampler_with(7, 30.0, 45.0);
        assert_eq!(sampler.slope(0.0, 0.0), 0.0);
        assert_eq!(sampler.slope(12.0, -9.0), 0.0);
        let n = sampler.normal(5.0, 5.0);
        assert!((n - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn height_is_continuous() {
        // Samples straddling an arbitrary vertical line differ proportionally to the step;
        // nothing in the sampler knows about cells, so cell borders cannot introduce seams.
        let sampler = sampler_with(99, 30.0, 45.0);
        for i in 0..64 {
            let x = i as f32 * 3.0 + 50.0;
            let a = sampler.height(x - 1e-3, 77.0);
            let b = sampler.height(x + 1e-3, 77.0);
            assert!((a - b).abs() < 0.05, "discontinuity near x = {x}");
        }
    }

    #[test]
    fn normal_is_unit_length() {
        let sampler = sampler_with(3, 30.0, 45.0);
        for i in 0..16 {
            let n = sampler.normal(60.0 + i as f32 * 9.0, -120.0);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!(n.y > 0.0);
        }
    }
}
