use std::sync::Arc;

use glam::Vec2;
use hnh_rng::noises::Perlin2;
use hnh_rng::{FromRng, Noise, Rng};
use hnh_worldgen::{BiomeClassifier, BiomeId, CellCoord, HeightSampler, WorldConfig};

use crate::{BuildError, CellContent, CellLayer, ContentFlags};

/// The number of quads along one side of a surface patch.
pub const PATCH_RESOLUTION: u32 = 16;

/// The wavelength of the per-vertex color variation noise, in world units.
const DETAIL_SCALE: f32 = 7.0;

/// The amplitude of the per-vertex color variation.
const DETAIL_AMPLITUDE: f32 = 0.05;

/// How far past the blend radius the meadow brightening reaches, in world units.
const MEADOW_RIM_WIDTH: f32 = 40.0;

/// How much the meadow brightening lightens the ground at the safe-zone rim.
const MEADOW_BOOST: f32 = 0.22;

/// One vertex of a terrain surface patch, laid out for direct GPU upload.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// The renderable surface of one terrain cell.
///
/// The renderer only ever borrows a patch through
/// [`World::surface_patch`](crate::World::surface_patch); the patch itself is owned by the
/// terrain streamer and is released when the cell unloads.
pub struct SurfacePatch {
    pub coord: CellCoord,
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

/// The palette of one biome band: ground color at low and at high elevation.
fn palette(biome: BiomeId) -> ([f32; 4], [f32; 4]) {
    match biome {
        BiomeId::Hearth => ([0.38, 0.52, 0.23, 1.0], [0.46, 0.56, 0.28, 1.0]),
        BiomeId::Meadows => ([0.33, 0.47, 0.20, 1.0], [0.52, 0.55, 0.33, 1.0]),
        BiomeId::Woods => ([0.20, 0.35, 0.16, 1.0], [0.42, 0.44, 0.30, 1.0]),
        BiomeId::Frontier => ([0.25, 0.28, 0.18, 1.0], [0.48, 0.42, 0.33, 1.0]),
    }
}

#[inline]
fn lerp4(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

/// Builds one renderable surface patch per terrain cell.
pub struct TerrainLayer {
    height: Arc<HeightSampler>,
    biomes: Arc<BiomeClassifier>,
    /// Small-amplitude variation mixed into the vertex colors so flat ground does not read
    /// as a uniform sheet.
    detail: Perlin2,
    pitch: f32,
    base_height: f32,
    height_scale: f32,
    blend_radius: f32,
}

impl TerrainLayer {
    /// Creates a new [`TerrainLayer`].
    pub fn new(
        rng: &mut impl Rng,
        config: &WorldConfig,
        height: Arc<HeightSampler>,
        biomes: Arc<BiomeClassifier>,
    ) -> Self {
        Self {
            height,
            biomes,
            detail: Perlin2::from_rng(rng),
            pitch: config.terrain.pitch,
            base_height: config.base_height,
            height_scale: config.height_scale,
            blend_radius: config.blend_radius,
        }
    }

    /// Computes the color of one terrain vertex.
    fn vertex_color(&self, x: f32, z: f32, elevation: f32) -> [f32; 4] {
        let biome = self.biomes.biome(x, z);
        let (low, high) = palette(biome);

        // Normalized elevation and moisture drive the palette interpolation.
        let e = ((elevation - self.base_height) / self.height_scale * 0.5 + 0.5).clamp(0.0, 1.0);
        let m = self.biomes.moisture(x, z) * 0.5 + 0.5;

        let mut color = lerp4(low, high, e);
        // Moist ground reads darker and greener.
        color = lerp4(color, [0.22, 0.40, 0.19, 1.0], m * 0.25);

        // Meadow brightening: the land around the safe zone reads as kept grassland.
        let r = Vec2::new(x, z).length();
        if r < self.blend_radius + MEADOW_RIM_WIDTH {
            let rim = 1.0 - (r - self.blend_radius).max(0.0) / MEADOW_RIM_WIDTH;
            color = lerp4(color, [0.55, 0.66, 0.31, 1.0], rim * MEADOW_BOOST);
        }

        let d = self.detail.sample([x / DETAIL_SCALE, z / DETAIL_SCALE]) * DETAIL_AMPLITUDE;
        color[0] = (color[0] + d).clamp(0.0, 1.0);
        color[1] = (color[1] + d).clamp(0.0, 1.0);
        color[2] = (color[2] + d).clamp(0.0, 1.0);
        color
    }
}

impl CellLayer for TerrainLayer {
    type Cell = SurfacePatch;

    #[profiling::function]
    fn build(&mut self, coord: CellCoord) -> Result<Self::Cell, BuildError> {
        let side = PATCH_RESOLUTION as usize + 1;
        let corner = coord.min_corner(self.pitch);
        let step = self.pitch / PATCH_RESOLUTION as f32;

        let mut vertices = Vec::with_capacity(side * side);
        for iz in 0..side {
            for ix in 0..side {
                let x = corner.x + ix as f32 * step;
                let z = corner.y + iz as f32 * step;
                let y = self.height.height(x, z);

                vertices.push(TerrainVertex {
                    position: [x, y, z],
                    normal: self.height.normal(x, z).to_array(),
                    color: self.vertex_color(x, z, y),
                });
            }
        }

        let mut indices = Vec::with_capacity(PATCH_RESOLUTION as usize * PATCH_RESOLUTION as usize * 6);
        for iz in 0..PATCH_RESOLUTION {
            for ix in 0..PATCH_RESOLUTION {
                let i0 = iz * (side as u32) + ix;
                let i1 = i0 + 1;
                let i2 = i0 + side as u32;
                let i3 = i2 + 1;
                indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
            }
        }

        Ok(SurfacePatch {
            coord,
            vertices,
            indices,
        })
    }

    fn destroy(&mut self, _coord: CellCoord, cell: Self::Cell) {
        // The geometry is owned by the patch; dropping it releases everything.
        drop(cell);
    }

    fn content(&self, _cell: &Self::Cell) -> CellContent {
        CellContent {
            flags: ContentFlags::TERRAIN,
            placements: 0,
        }
    }
}
