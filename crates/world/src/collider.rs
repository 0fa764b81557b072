use std::sync::Arc;

use glam::{Vec2, Vec3};
use parking_lot::RwLock;
use smallvec::SmallVec;

use hnh_worldgen::CellCoord;

use crate::streamer::CellMap;

/// A collision cylinder around a vegetation trunk.
///
/// Records live exactly as long as the vegetation cell that placed them: they are inserted in
/// bulk during a cell build and removed in bulk when the cell unloads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderRecord {
    /// The horizontal center of the cylinder.
    pub center: Vec2,
    /// The radius of the cylinder.
    pub radius: f32,
    /// The bottom of the cylinder.
    pub base: f32,
    /// The top of the cylinder.
    pub top: f32,
}

/// The global index of vegetation colliders, keyed by owning cell.
///
/// Only the vegetation layer writes to this (on the update thread); collision queries from
/// the rest of the game are read-only.
#[derive(Default)]
pub struct ColliderIndex {
    cells: CellMap<SmallVec<[ColliderRecord; 8]>>,
    record_count: usize,
}

impl ColliderIndex {
    /// Registers a collider owned by the provided cell.
    pub fn insert(&mut self, owner: CellCoord, record: ColliderRecord) {
        self.cells.entry(owner).or_default().push(record);
        self.record_count += 1;
    }

    /// Removes every collider owned by the provided cell.
    ///
    /// Returns the number of removed records.
    pub fn remove_cell(&mut self, owner: CellCoord) -> usize {
        let removed = self.cells.remove(&owner).map_or(0, |records| records.len());
        self.record_count -= removed;
        removed
    }

    /// The total number of registered colliders.
    #[inline]
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Checks the provided point against every collider.
    ///
    /// If a cylinder whose vertical range contains the point overlaps the horizontal circle
    /// of the provided radius, returns the vector that pushes the point out along the
    /// separating axis. Returns [`None`] when the point is free.
    pub fn point_push_out(&self, position: Vec3, radius: f32) -> Option<Vec2> {
        let point = Vec2::new(position.x, position.z);
        for records in self.cells.values() {
            for record in records {
                if position.y < record.base || position.y > record.top {
                    continue;
                }

                let min_dist = record.radius + radius;
                let delta = point - record.center;
                let dist_sq = delta.length_squared();
                if dist_sq >= min_dist * min_dist {
                    continue;
                }

                let dist = dist_sq.sqrt();
                // A point exactly on the axis has no separating direction; pick one.
                let dir = if dist > 1e-5 { delta / dist } else { Vec2::X };
                return Some(dir * (min_dist - dist));
            }
        }
        None
    }
}

/// The collider index shared between the vegetation layer and external query callers.
pub type SharedColliders = Arc<RwLock<ColliderIndex>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn trunk(x: f32, z: f32) -> ColliderRecord {
        ColliderRecord {
            center: Vec2::new(x, z),
            radius: 0.5,
            base: 10.0,
            top: 14.0,
        }
    }

    #[test]
    fn push_out_respects_the_vertical_range() {
        let mut index = ColliderIndex::default();
        index.insert(CellCoord::ZERO, trunk(0.0, 0.0));

        // Inside the trunk at trunk height: pushed out.
        let push = index
            .point_push_out(Vec3::new(0.3, 12.0, 0.0), 0.4)
            .expect("expected a push");
        assert!(push.x > 0.0);
        assert!((Vec2::new(0.3, 0.0) + push).length() >= 0.9 - 1e-4);

        // Same spot, but above the canopy: free.
        assert!(index.point_push_out(Vec3::new(0.3, 20.0, 0.0), 0.4).is_none());
    }

    #[test]
    fn clear_points_are_free() {
        let mut index = ColliderIndex::default();
        index.insert(CellCoord::ZERO, trunk(0.0, 0.0));
        assert!(index.point_push_out(Vec3::new(5.0, 12.0, 0.0), 0.4).is_none());
    }

    #[test]
    fn degenerate_center_still_separates() {
        let mut index = ColliderIndex::default();
        index.insert(CellCoord::ZERO, trunk(0.0, 0.0));
        let push = index
            .point_push_out(Vec3::new(0.0, 12.0, 0.0), 0.4)
            .expect("expected a push");
        assert!(push.length() >= 0.9 - 1e-4);
    }

    #[test]
    fn removal_is_per_owning_cell() {
        let mut index = ColliderIndex::default();
        index.insert(CellCoord::new(0, 0), trunk(0.0, 0.0));
        index.insert(CellCoord::new(0, 0), trunk(3.0, 0.0));
        index.insert(CellCoord::new(1, 0), trunk(20.0, 0.0));
        assert_eq!(index.record_count(), 3);

        assert_eq!(index.remove_cell(CellCoord::new(0, 0)), 2);
        assert_eq!(index.record_count(), 1);
        assert!(index.point_push_out(Vec3::new(0.0, 12.0, 0.0), 0.4).is_none());
        assert!(index.point_push_out(Vec3::new(20.0, 12.0, 0.2), 0.4).is_some());

        assert_eq!(index.remove_cell(CellCoord::new(0, 0)), 0);
    }
}
