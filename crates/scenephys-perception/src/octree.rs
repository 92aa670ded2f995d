//! Spatial index for point-cloud correspondence search.
//!
//! Partitions 3-D space using a recursive **Octree** so that feedback-force
//! generation and recognition scoring can find, for every model point, the
//! nearest observed scene point without a linear scan.
//!
//! # Key types
//!
//! | Type | Role |
//! |------|------|
//! | [`Aabb`]     | An axis-aligned bounding box.                          |
//! | [`Octree`]   | Spatial index; insert points, query nearest neighbour. |
//!
//! # Example
//!
//! ```rust
//! use scenephys_perception::octree::Octree;
//! use scenephys_types::{PointCloud, Vec3};
//!
//! let cloud = PointCloud::new(vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 0.0, 0.0)]);
//! let tree = Octree::from_cloud(&cloud, 8);
//!
//! let (p, d) = tree.nearest_within(Vec3::new(1.0, 2.0, 3.1), 0.5).unwrap();
//! assert_eq!(p, Vec3::new(1.0, 2.0, 3.0));
//! assert!((d - 0.1).abs() < 1e-5);
//! assert!(tree.nearest_within(Vec3::new(5.0, 5.0, 5.0), 0.5).is_none());
//! ```

use scenephys_types::{PointCloud, Vec3};

/// Padding added around a cloud's extent so boundary points stay inside.
const BOUNDS_PADDING: f32 = 1e-3;

// ────────────────────────────────────────────────────────────────────────────
// Aabb
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a bounding box from its two opposite corners.
    ///
    /// The constructor normalises the corners so that `min ≤ max` per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Smallest box enclosing every point, padded by `padding`; `None` for an
    /// empty slice.
    pub fn enclosing(points: &[Vec3], padding: f32) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points.iter().fold((first, first), |(lo, hi), p| {
            (
                Vec3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z)),
                Vec3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z)),
            )
        });
        let pad = Vec3::new(padding, padding, padding);
        Some(Self::new(min.sub(pad), max.add(pad)))
    }

    /// Return the centre point of the box.
    pub fn centre(&self) -> Vec3 {
        self.min.add(self.max).scale(0.5)
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Distance from `p` to the closest point of the box (0 inside).
    pub fn distance_to(&self, p: Vec3) -> f32 {
        let dx = (self.min.x - p.x).max(0.0).max(p.x - self.max.x);
        let dy = (self.min.y - p.y).max(0.0).max(p.y - self.max.y);
        let dz = (self.min.z - p.z).max(0.0).max(p.z - self.max.z);
        Vec3::new(dx, dy, dz).norm()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Octree
// ────────────────────────────────────────────────────────────────────────────

/// A recursive spatial index that subdivides 3-D space into eight octants.
///
/// Points are stored in the deepest node whose bounding box still contains
/// them.  Subdividing stops when either
/// - the number of points in a node is ≤ `capacity`, or
/// - `max_depth` levels have already been created.
#[derive(Debug)]
pub struct Octree {
    root: Option<OctreeNode>,
    max_depth: usize,
}

impl Octree {
    /// Create an empty octree covering `bounds`.
    pub fn new(bounds: Aabb, capacity: usize) -> Self {
        Self {
            root: Some(OctreeNode::new(bounds, capacity)),
            max_depth: 8,
        }
    }

    /// Build a tree sized to enclose every point of `cloud`.
    pub fn from_cloud(cloud: &PointCloud, capacity: usize) -> Self {
        match Aabb::enclosing(&cloud.points, BOUNDS_PADDING) {
            Some(bounds) => {
                let mut tree = Self::new(bounds, capacity);
                for &p in &cloud.points {
                    tree.insert(p);
                }
                tree
            }
            None => Self {
                root: None,
                max_depth: 8,
            },
        }
    }

    /// Insert a point into the tree.
    ///
    /// Points outside the root bounding box are silently ignored.
    pub fn insert(&mut self, point: Vec3) {
        if let Some(root) = self.root.as_mut() {
            root.insert(point, self.max_depth, 0);
        }
    }

    /// Return the total number of points stored in the tree.
    pub fn len(&self) -> usize {
        self.root.as_ref().map_or(0, |r| r.count())
    }

    /// True when the tree contains no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The stored point closest to `query`, with its distance, provided it
    /// lies within `max_distance`.
    pub fn nearest_within(&self, query: Vec3, max_distance: f32) -> Option<(Vec3, f32)> {
        let root = self.root.as_ref()?;
        let mut best: Option<(Vec3, f32)> = None;
        root.nearest(query, max_distance, &mut best);
        best
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OctreeNode – internal implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct OctreeNode {
    bounds: Aabb,
    capacity: usize,
    /// Points stored at this node (only non-empty when the node is a leaf).
    points: Vec<Vec3>,
    /// Eight children; `None` while this node is a leaf.
    children: Option<Box<[OctreeNode; 8]>>,
}

impl OctreeNode {
    fn new(bounds: Aabb, capacity: usize) -> Self {
        Self {
            bounds,
            capacity,
            points: Vec::new(),
            children: None,
        }
    }

    fn count(&self) -> usize {
        match &self.children {
            None => self.points.len(),
            Some(children) => children.iter().map(|c| c.count()).sum(),
        }
    }

    fn insert(&mut self, point: Vec3, max_depth: usize, depth: usize) {
        if !self.bounds.contains_point(point) {
            return;
        }
        match self.children.as_mut() {
            None => {
                self.points.push(point);
                if self.points.len() > self.capacity && depth < max_depth {
                    self.subdivide(max_depth, depth);
                }
            }
            Some(children) => {
                if let Some(child) = children.iter_mut().find(|c| c.bounds.contains_point(point)) {
                    child.insert(point, max_depth, depth + 1);
                }
            }
        }
    }

    /// Branch-and-bound nearest-neighbour search; `best` carries the current
    /// champion and its distance.
    fn nearest(&self, query: Vec3, max_distance: f32, best: &mut Option<(Vec3, f32)>) {
        let bound = best.map_or(max_distance, |(_, d)| d);
        if self.bounds.distance_to(query) > bound {
            return;
        }
        match &self.children {
            None => {
                for &p in &self.points {
                    let d = p.distance(query);
                    let limit = best.map_or(max_distance, |(_, bd)| bd);
                    if d <= limit && best.is_none_or(|(_, bd)| d < bd) {
                        *best = Some((p, d));
                    }
                }
            }
            Some(children) => {
                // Visit the nearest octants first so pruning kicks in early.
                let mut order: Vec<&OctreeNode> = children.iter().collect();
                order.sort_by(|a, b| {
                    a.bounds
                        .distance_to(query)
                        .total_cmp(&b.bounds.distance_to(query))
                });
                for child in order {
                    child.nearest(query, max_distance, best);
                }
            }
        }
    }

    /// Split this leaf into eight children and redistribute existing points.
    fn subdivide(&mut self, max_depth: usize, depth: usize) {
        let c = self.bounds.centre();
        let min = self.bounds.min;
        let max = self.bounds.max;

        let octants = [
            Aabb::new(min, c),
            Aabb::new(Vec3::new(c.x, min.y, min.z), Vec3::new(max.x, c.y, c.z)),
            Aabb::new(Vec3::new(min.x, c.y, min.z), Vec3::new(c.x, max.y, c.z)),
            Aabb::new(Vec3::new(c.x, c.y, min.z), Vec3::new(max.x, max.y, c.z)),
            Aabb::new(Vec3::new(min.x, min.y, c.z), Vec3::new(c.x, c.y, max.z)),
            Aabb::new(Vec3::new(c.x, min.y, c.z), Vec3::new(max.x, c.y, max.z)),
            Aabb::new(Vec3::new(min.x, c.y, c.z), Vec3::new(c.x, max.y, max.z)),
            Aabb::new(c, max),
        ];

        let cap = self.capacity;
        let mut children = Box::new(octants.map(|b| OctreeNode::new(b, cap)));

        let points = std::mem::take(&mut self.points);
        for p in points {
            if let Some(child) = children.iter_mut().find(|c| c.bounds.contains_point(p)) {
                child.insert(p, max_depth, depth + 1);
            }
        }

        self.children = Some(children);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_cloud(n: usize, spacing: f32) -> PointCloud {
        let mut points = Vec::new();
        for ix in 0..n {
            for iy in 0..n {
                for iz in 0..n {
                    points.push(Vec3::new(
                        ix as f32 * spacing,
                        iy as f32 * spacing,
                        iz as f32 * spacing,
                    ));
                }
            }
        }
        PointCloud::new(points)
    }

    fn brute_force_nearest(cloud: &PointCloud, q: Vec3) -> (Vec3, f32) {
        cloud
            .points
            .iter()
            .map(|p| (*p, p.distance(q)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap()
    }

    // ── Aabb ────────────────────────────────────────────────────────────────

    #[test]
    fn aabb_normalises_min_max() {
        let b = Aabb::new(Vec3::new(2.0, 2.0, 2.0), Vec3::zero());
        assert_eq!(b.min, Vec3::zero());
        assert_eq!(b.max, Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn aabb_distance_is_zero_inside() {
        let b = Aabb::new(Vec3::zero(), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(b.distance_to(Vec3::new(0.5, 0.5, 0.5)), 0.0);
        assert!((b.distance_to(Vec3::new(2.0, 0.5, 0.5)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn enclosing_box_of_empty_slice_is_none() {
        assert!(Aabb::enclosing(&[], 0.0).is_none());
    }

    // ── Octree ──────────────────────────────────────────────────────────────

    #[test]
    fn empty_cloud_builds_empty_tree() {
        let tree = Octree::from_cloud(&PointCloud::default(), 4);
        assert!(tree.is_empty());
        assert!(tree.nearest_within(Vec3::zero(), 10.0).is_none());
    }

    #[test]
    fn subdivision_preserves_all_points() {
        let cloud = grid_cloud(5, 0.1);
        let tree = Octree::from_cloud(&cloud, 4);
        assert_eq!(tree.len(), cloud.len());
    }

    #[test]
    fn insert_outside_bounds_is_ignored() {
        let mut tree = Octree::new(Aabb::new(Vec3::zero(), Vec3::new(1.0, 1.0, 1.0)), 4);
        tree.insert(Vec3::new(5.0, 5.0, 5.0));
        assert!(tree.is_empty());
    }

    #[test]
    fn nearest_matches_brute_force() {
        let cloud = grid_cloud(6, 0.07);
        let tree = Octree::from_cloud(&cloud, 3);
        let queries = [
            Vec3::new(0.11, 0.2, 0.05),
            Vec3::new(0.34, 0.01, 0.29),
            Vec3::new(-0.05, 0.4, 0.2),
        ];
        for q in queries {
            let (_, expected) = brute_force_nearest(&cloud, q);
            let (_, got) = tree.nearest_within(q, 1.0).expect("neighbour");
            assert!((got - expected).abs() < 1e-6, "query {q:?}");
        }
    }

    #[test]
    fn nearest_respects_max_distance() {
        let cloud = PointCloud::new(vec![Vec3::zero()]);
        let tree = Octree::from_cloud(&cloud, 4);
        assert!(tree.nearest_within(Vec3::new(0.2, 0.0, 0.0), 0.1).is_none());
        assert!(tree.nearest_within(Vec3::new(0.05, 0.0, 0.0), 0.1).is_some());
    }
}
