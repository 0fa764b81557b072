use glam::Vec2;

/// Identifies one square cell on a grid of a fixed pitch.
///
/// The same coordinate type is used by every grid in the game; grids of different pitches are
/// independent of each other, and a [`CellCoord`] is only meaningful together with the pitch of
/// the grid it was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i32,
    pub z: i32,
}

impl CellCoord {
    /// The cell at the grid origin.
    pub const ZERO: Self = Self { x: 0, z: 0 };

    /// Creates a new [`CellCoord`] from its grid coordinates.
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Computes the cell containing the provided world position.
    #[inline]
    pub fn from_world(pos: Vec2, pitch: f32) -> Self {
        Self {
            x: hnh_rng::utility::floor_i32(pos.x / pitch),
            z: hnh_rng::utility::floor_i32(pos.y / pitch),
        }
    }

    /// Returns the world position of the corner of this cell with the smallest coordinates.
    #[inline]
    pub fn min_corner(self, pitch: f32) -> Vec2 {
        Vec2::new(self.x as f32 * pitch, self.z as f32 * pitch)
    }

    /// Returns the world position of the center of this cell.
    #[inline]
    pub fn center(self, pitch: f32) -> Vec2 {
        self.min_corner(pitch) + Vec2::splat(pitch * 0.5)
    }

    /// Returns the Chebyshev distance between two cells.
    ///
    /// This is the metric the streaming radii are expressed in: all cells within distance `r`
    /// form a square of side `2r + 1`.
    #[inline]
    pub fn chebyshev_distance(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// Returns this cell translated by the provided amounts.
    #[inline]
    pub const fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            z: self.z + dz,
        }
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}
