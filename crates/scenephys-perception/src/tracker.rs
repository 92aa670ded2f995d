//! Bounded store of tracked 3-D points.
//!
//! A multi-frame tracker reports points with persistent ids.  They densify
//! the evidence around partially occluded objects for feedback forces.  The
//! store keeps at most [`MAX_TRACKED_POINTS`]; when full, the point that was
//! least recently updated is evicted first.

use std::collections::{BTreeMap, VecDeque};

use scenephys_types::{PointCloud, TrackedPoint, Vec3};
use tracing::trace;

/// Upper bound on simultaneously tracked points.
pub const MAX_TRACKED_POINTS: usize = 200;

#[derive(Debug, Clone)]
pub struct TrackedPoints {
    capacity: usize,
    positions: BTreeMap<u64, Vec3>,
    /// Ids from least to most recently updated.
    recency: VecDeque<u64>,
}

impl Default for TrackedPoints {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_POINTS)
    }
}

impl TrackedPoints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            positions: BTreeMap::new(),
            recency: VecDeque::new(),
        }
    }

    /// Insert or move points.  A known id replaces its stale position.
    pub fn update(&mut self, points: &[TrackedPoint]) {
        for p in points {
            if self.positions.insert(p.id, p.position).is_some() {
                self.recency.retain(|id| *id != p.id);
            }
            self.recency.push_back(p.id);

            while self.positions.len() > self.capacity {
                let Some(oldest) = self.recency.pop_front() else {
                    break;
                };
                self.positions.remove(&oldest);
                trace!(id = oldest, "evicted tracked point");
            }
        }
    }

    pub fn get(&self, id: u64) -> Option<Vec3> {
        self.positions.get(&id).copied()
    }

    /// Tracked points within `radius` of `centre`.
    pub fn within_radius(&self, centre: Vec3, radius: f32) -> PointCloud {
        PointCloud::new(
            self.positions
                .values()
                .copied()
                .filter(|p| p.distance(centre) <= radius)
                .collect(),
        )
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.recency.clear();
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: u64, x: f32) -> TrackedPoint {
        TrackedPoint {
            id,
            position: Vec3::new(x, 0.0, 0.0),
        }
    }

    #[test]
    fn known_ids_are_moved_not_duplicated() {
        let mut store = TrackedPoints::new();
        store.update(&[point(1, 0.0), point(2, 1.0)]);
        store.update(&[point(1, 0.5)]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1), Some(Vec3::new(0.5, 0.0, 0.0)));
    }

    #[test]
    fn store_is_bounded_and_evicts_least_recent() {
        let mut store = TrackedPoints::new();
        let batch: Vec<_> = (0..MAX_TRACKED_POINTS as u64 + 10).map(|i| point(i, 0.0)).collect();
        store.update(&batch);
        assert_eq!(store.len(), MAX_TRACKED_POINTS);
        assert!(store.get(0).is_none());
        assert!(store.get(9).is_none());
        assert!(store.get(10).is_some());
    }

    #[test]
    fn refreshed_point_survives_eviction() {
        let mut store = TrackedPoints::with_capacity(2);
        store.update(&[point(1, 0.0), point(2, 0.0)]);
        store.update(&[point(1, 0.1)]);
        store.update(&[point(3, 0.0)]);
        assert!(store.get(1).is_some());
        assert!(store.get(2).is_none());
    }

    #[test]
    fn radius_query_and_clear() {
        let mut store = TrackedPoints::new();
        store.update(&[point(1, 0.0), point(2, 0.05), point(3, 2.0)]);
        assert_eq!(store.within_radius(Vec3::zero(), 0.1).len(), 2);
        store.clear();
        assert!(store.is_empty());
    }
}
