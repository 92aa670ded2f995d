//! Rigid-body geometry primitives shared by every scenephys crate.
//!
//! Poses are expressed in the scene (world) frame: to move a point from the
//! body frame into the world frame, rotate it by [`Pose::rotation`] then add
//! [`Pose::translation`].  The world's up axis is `+Z`.
//!
//! # Example
//!
//! ```rust
//! use scenephys_types::geometry::{Pose, Quaternion, Vec3};
//!
//! let yaw = Quaternion::from_axis_angle(Vec3::unit_z(), std::f32::consts::FRAC_PI_2);
//! let pose = Pose::new(Vec3::new(1.0, 0.0, 0.0), yaw);
//!
//! let p = pose.transform_point(Vec3::new(1.0, 0.0, 0.0));
//! assert!((p.x - 1.0).abs() < 1e-5);
//! assert!((p.y - 1.0).abs() < 1e-5);
//! ```

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector or point (metres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// Create a new vector.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// The world up axis.
    pub fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Self) -> Self {
        Self::new(
            self.y * rhs.z - self.z * rhs.y,
            self.z * rhs.x - self.x * rhs.z,
            self.x * rhs.y - self.y * rhs.x,
        )
    }

    /// Euclidean length.
    pub fn norm(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Distance between two points.
    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).norm()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Self> {
        let n = self.norm();
        if n <= f32::EPSILON {
            None
        } else {
            Some(self.scale(1.0 / n))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion; use [`normalized`](Self::normalized) otherwise.
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle_rad` about `axis`.  A zero axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f32) -> Self {
        match axis.normalized() {
            Some(a) => {
                let (s, c) = (angle_rad * 0.5).sin_cos();
                Self::new(c, a.x * s, a.y * s, a.z * s)
            }
            None => Self::identity(),
        }
    }

    /// Shortest-arc rotation that carries direction `from` onto `to`.
    pub fn from_two_vectors(from: Vec3, to: Vec3) -> Self {
        let (Some(a), Some(b)) = (from.normalized(), to.normalized()) else {
            return Self::identity();
        };
        let d = a.dot(b);
        if d < -1.0 + 1e-6 {
            // Antiparallel: rotate half a turn about any axis orthogonal to `a`.
            let ortho = a.cross(Vec3::new(1.0, 0.0, 0.0));
            let ortho = if ortho.norm() < 1e-3 {
                a.cross(Vec3::new(0.0, 1.0, 0.0))
            } else {
                ortho
            };
            return Self::from_axis_angle(ortho, std::f32::consts::PI);
        }
        let c = a.cross(b);
        Self::new(1.0 + d, c.x, c.y, c.z).normalized()
    }

    /// Hamilton product: compose two rotations (`self` after `rhs`).
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rescale to unit length.  A degenerate quaternion becomes the identity.
    pub fn normalized(self) -> Self {
        let n = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if n <= f32::EPSILON {
            Self::identity()
        } else {
            Self::new(self.w / n, self.x / n, self.y / n, self.z / n)
        }
    }

    /// The same rotation with a non-negative scalar part (`q` and `-q` are
    /// the same rotation).
    pub fn canonical_sign(self) -> Self {
        if self.w < 0.0 {
            Self::new(-self.w, -self.x, -self.y, -self.z)
        } else {
            self
        }
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Angle (radians, in `[0, π]`) of the relative rotation between `self`
    /// and `other`.
    pub fn angle_to(self, other: Self) -> f32 {
        let d = (self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z).abs();
        2.0 * d.min(1.0).acos()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body pose: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Pose {
    /// Create a pose from a translation and rotation.
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity pose.
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// A pure translation.
    pub fn from_translation(x: f32, y: f32, z: f32) -> Self {
        Self::new(Vec3::new(x, y, z), Quaternion::identity())
    }

    /// Compose two poses: if `self` = T_A_B and `other` = T_B_C the result is
    /// T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let translated = self.translation.add(self.rotation.rotate(other.translation));
        Self::new(translated, self.rotation.mul(other.rotation))
    }

    /// Move a body-frame point into the world frame.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.translation.add(self.rotation.rotate(p))
    }

    /// Positional drift (metres) between two poses.
    pub fn translation_distance(&self, other: &Self) -> f32 {
        self.translation.distance(other.translation)
    }

    /// Angular drift (radians) between two poses.
    pub fn rotation_distance(&self, other: &Self) -> f32 {
        self.rotation.angle_to(other.rotation)
    }
}
