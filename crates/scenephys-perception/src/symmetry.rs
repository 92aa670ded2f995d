//! Symmetry folding of pose hypotheses.
//!
//! A mug without its handle, a cube or a can looks the same under some
//! rotations.  Simulating each of those poses separately wastes simulation
//! budget and lets whichever duplicate appears first win by accident.  The
//! [`SymmetryFolder`] maps every pose to a canonical representative of its
//! symmetry class and merges candidates whose representatives coincide.
//!
//! Canonical forms:
//!
//! - **Rotational, order k about body axis `a`**: among the k rotations
//!   `R · Rot(a, 2πj/k)` pick the one with the largest scalar part.
//! - **Continuous about `a`**: the shortest-arc rotation carrying `a` onto its
//!   world direction `R · a` (the twist about the axis is discarded).
//!
//! Canonical rotations are snapped to a fine grid so that two inputs from the
//! same class produce bit-identical representatives.
//!
//! # Example
//!
//! ```rust
//! use scenephys_perception::symmetry::SymmetryFolder;
//! use scenephys_types::{ObjectSymmetry, Pose, Quaternion, Vec3};
//!
//! let cube = ObjectSymmetry::Rotational { axis: Vec3::unit_z(), order: 4 };
//! let a = Pose::from_translation(0.0, 0.0, 0.05);
//! let b = Pose::new(
//!     a.translation,
//!     Quaternion::from_axis_angle(Vec3::unit_z(), std::f32::consts::FRAC_PI_2),
//! );
//!
//! let classes = SymmetryFolder::default().fold(&[a, b], &cube);
//! assert_eq!(classes.len(), 1);
//! assert_eq!(classes[0].members, vec![0, 1]);
//! ```

use std::f32::consts::TAU;

use scenephys_types::{ObjectSymmetry, Pose, Quaternion, Vec3};

/// Grid (in quaternion component units) canonical rotations are snapped to.
const CANONICAL_GRID: f32 = 1e-4;

/// One symmetry class of input poses.
#[derive(Debug, Clone, PartialEq)]
pub struct FoldedPose {
    /// Canonical representative that is scored on behalf of the class.
    pub pose: Pose,
    /// Indices into the input list, ascending; `members[0]` is the earliest.
    pub members: Vec<usize>,
}

impl FoldedPose {
    /// Index of the earliest input pose in this class.
    pub fn first_index(&self) -> usize {
        self.members[0]
    }
}

/// Merges pose hypotheses that are indistinguishable under an object's
/// declared symmetry.
#[derive(Debug, Clone, Copy)]
pub struct SymmetryFolder {
    /// Poses whose canonical translations differ by at most this much
    /// (metres) may be merged.
    pub position_tolerance: f32,
    /// Poses whose canonical rotations differ by at most this much
    /// (radians) may be merged.
    pub angle_tolerance: f32,
}

impl Default for SymmetryFolder {
    fn default() -> Self {
        Self {
            position_tolerance: 1e-3,
            angle_tolerance: 1e-3,
        }
    }
}

impl SymmetryFolder {
    pub fn new(position_tolerance: f32, angle_tolerance: f32) -> Self {
        Self {
            position_tolerance: position_tolerance.max(0.0),
            angle_tolerance: angle_tolerance.max(0.0),
        }
    }

    /// Map `pose` to the canonical representative of its symmetry class.
    ///
    /// Poses of objects without symmetry (or with a degenerate descriptor:
    /// zero axis, order ≤ 1) are returned unchanged.
    pub fn canonicalize(pose: &Pose, symmetry: &ObjectSymmetry) -> Pose {
        let rotation = match *symmetry {
            ObjectSymmetry::None => return *pose,
            ObjectSymmetry::Rotational { axis, order } => {
                if order <= 1 || axis.normalized().is_none() {
                    return *pose;
                }
                let mut best = pose.rotation.canonical_sign();
                for j in 1..order {
                    let step = Quaternion::from_axis_angle(axis, TAU * j as f32 / order as f32);
                    let candidate = pose.rotation.mul(step).canonical_sign();
                    if prefer(candidate, best) {
                        best = candidate;
                    }
                }
                best
            }
            ObjectSymmetry::Continuous { axis } => {
                let Some(a) = axis.normalized() else {
                    return *pose;
                };
                let world_axis = pose.rotation.rotate(a);
                Quaternion::from_two_vectors(a, world_axis).canonical_sign()
            }
        };
        Pose::new(pose.translation, snap(rotation))
    }

    /// Group `poses` into symmetry classes, preserving input order: classes
    /// are ordered by their earliest member.
    pub fn fold(&self, poses: &[Pose], symmetry: &ObjectSymmetry) -> Vec<FoldedPose> {
        let mut classes: Vec<FoldedPose> = Vec::new();
        for (index, pose) in poses.iter().enumerate() {
            let canonical = Self::canonicalize(pose, symmetry);
            let existing = classes.iter_mut().find(|c| {
                c.pose.translation_distance(&canonical) <= self.position_tolerance
                    && c.pose.rotation_distance(&canonical) <= self.angle_tolerance
            });
            match existing {
                Some(class) => class.members.push(index),
                None => classes.push(FoldedPose {
                    pose: canonical,
                    members: vec![index],
                }),
            }
        }
        classes
    }
}

/// Symmetry images whose scalar parts differ by less than this are tied.
const TIE_EPSILON: f32 = 1e-5;

/// Largest scalar part wins; ties go to the lexicographically largest
/// vector part so that both sides of a class boundary pick the same image.
fn prefer(candidate: Quaternion, best: Quaternion) -> bool {
    if (candidate.w - best.w).abs() >= TIE_EPSILON {
        return candidate.w > best.w;
    }
    let key = |q: Quaternion| [q.x, q.y, q.z];
    for (c, b) in key(candidate).into_iter().zip(key(best)) {
        if (c - b).abs() >= TIE_EPSILON {
            return c > b;
        }
    }
    false
}

/// Snap each component to [`CANONICAL_GRID`] and renormalise.
fn snap(q: Quaternion) -> Quaternion {
    let r = |v: f32| (v / CANONICAL_GRID).round() * CANONICAL_GRID;
    Quaternion::new(r(q.w), r(q.x), r(q.y), r(q.z)).normalized()
}

/// True when `a` and `b` are the same pose up to `symmetry`.
pub fn equivalent(a: &Pose, b: &Pose, symmetry: &ObjectSymmetry, folder: &SymmetryFolder) -> bool {
    folder.fold(&[*a, *b], symmetry).len() == 1
}

/// Rotate `pose` by `angle_rad` about its body-frame `axis`.
pub fn rotate_about_body_axis(pose: &Pose, axis: Vec3, angle_rad: f32) -> Pose {
    Pose::new(
        pose.translation,
        pose.rotation.mul(Quaternion::from_axis_angle(axis, angle_rad)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn four_fold_z() -> ObjectSymmetry {
        ObjectSymmetry::Rotational {
            axis: Vec3::unit_z(),
            order: 4,
        }
    }

    fn tilted() -> Pose {
        Pose::new(
            Vec3::new(0.1, -0.2, 0.05),
            Quaternion::from_axis_angle(Vec3::new(1.0, 0.3, 0.0), 0.4),
        )
    }

    // ── canonicalize ────────────────────────────────────────────────────────

    #[test]
    fn no_symmetry_is_identity_map() {
        let p = tilted();
        assert_eq!(SymmetryFolder::canonicalize(&p, &ObjectSymmetry::None), p);
    }

    #[test]
    fn rotational_class_members_share_canonical_pose() {
        let base = tilted();
        let sym = four_fold_z();
        let reference = SymmetryFolder::canonicalize(&base, &sym);
        for j in 1..4 {
            let rotated = rotate_about_body_axis(&base, Vec3::unit_z(), FRAC_PI_2 * j as f32);
            let canonical = SymmetryFolder::canonicalize(&rotated, &sym);
            assert!(canonical.rotation_distance(&reference) < 1e-3, "j={j}");
            assert_eq!(canonical.translation, reference.translation);
        }
    }

    #[test]
    fn canonical_pose_is_equivalent_to_input() {
        let base = tilted();
        let canonical = SymmetryFolder::canonicalize(&base, &four_fold_z());
        // Some 90° body-axis step maps the input onto its representative.
        let matched = (0..4).any(|j| {
            let r = rotate_about_body_axis(&base, Vec3::unit_z(), FRAC_PI_2 * j as f32);
            r.rotation_distance(&canonical) < 1e-3
        });
        assert!(matched);
    }

    #[test]
    fn continuous_symmetry_discards_twist() {
        let sym = ObjectSymmetry::Continuous {
            axis: Vec3::unit_z(),
        };
        let a = tilted();
        let b = rotate_about_body_axis(&a, Vec3::unit_z(), 1.234);
        let ca = SymmetryFolder::canonicalize(&a, &sym);
        let cb = SymmetryFolder::canonicalize(&b, &sym);
        assert!(ca.rotation_distance(&cb) < 1e-3);
    }

    #[test]
    fn degenerate_descriptors_fall_back_to_identity_map() {
        let p = tilted();
        let zero_axis = ObjectSymmetry::Rotational {
            axis: Vec3::zero(),
            order: 4,
        };
        let order_one = ObjectSymmetry::Rotational {
            axis: Vec3::unit_z(),
            order: 1,
        };
        assert_eq!(SymmetryFolder::canonicalize(&p, &zero_axis), p);
        assert_eq!(SymmetryFolder::canonicalize(&p, &order_one), p);
    }

    // ── fold ────────────────────────────────────────────────────────────────

    #[test]
    fn quarter_turn_of_axis_aligned_pose_is_bit_identical() {
        let a = Pose::from_translation(0.0, 0.0, 0.05);
        let b = rotate_about_body_axis(&a, Vec3::unit_z(), FRAC_PI_2);
        let sym = four_fold_z();
        assert_eq!(
            SymmetryFolder::canonicalize(&a, &sym),
            SymmetryFolder::canonicalize(&b, &sym)
        );
    }

    #[test]
    fn fold_merges_symmetric_duplicates_in_input_order() {
        let a = Pose::from_translation(0.0, 0.0, 0.05);
        let other = Pose::from_translation(0.3, 0.0, 0.05);
        let a_quarter = rotate_about_body_axis(&a, Vec3::unit_z(), FRAC_PI_2);
        let a_half = rotate_about_body_axis(&a, Vec3::unit_z(), PI);

        let classes = SymmetryFolder::default().fold(&[other, a, a_quarter, a_half], &four_fold_z());
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].members, vec![0]);
        assert_eq!(classes[1].members, vec![1, 2, 3]);
        assert_eq!(classes[1].first_index(), 1);
    }

    #[test]
    fn class_boundary_poses_pick_the_same_image() {
        // Yaw 45° sits exactly between two quarter-turn images; 135° is the
        // same class seen from the other side.
        let a = Pose::new(
            Vec3::new(0.0, 0.0, 0.05),
            Quaternion::from_axis_angle(Vec3::unit_z(), FRAC_PI_4),
        );
        let b = rotate_about_body_axis(&a, Vec3::unit_z(), FRAC_PI_2);
        let sym = four_fold_z();
        let ca = SymmetryFolder::canonicalize(&a, &sym);
        let cb = SymmetryFolder::canonicalize(&b, &sym);
        assert!(ca.rotation_distance(&cb) < 1e-3);
        assert!(ca.rotation.z > 0.0 && cb.rotation.z > 0.0);

        let classes = SymmetryFolder::default().fold(&[a, b], &sym);
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].members, vec![0, 1]);
    }

    #[test]
    fn fold_keeps_distinct_orientations_without_symmetry() {
        let a = Pose::from_translation(0.0, 0.0, 0.05);
        let b = rotate_about_body_axis(&a, Vec3::unit_z(), FRAC_PI_2);
        let classes = SymmetryFolder::default().fold(&[a, b], &ObjectSymmetry::None);
        assert_eq!(classes.len(), 2);
    }

    #[test]
    fn two_fold_symmetry_does_not_merge_quarter_turns() {
        let sym = ObjectSymmetry::Rotational {
            axis: Vec3::unit_z(),
            order: 2,
        };
        let a = Pose::from_translation(0.0, 0.0, 0.05);
        let folder = SymmetryFolder::default();
        assert!(!equivalent(
            &a,
            &rotate_about_body_axis(&a, Vec3::unit_z(), FRAC_PI_2),
            &sym,
            &folder
        ));
        assert!(equivalent(
            &a,
            &rotate_about_body_axis(&a, Vec3::unit_z(), PI),
            &sym,
            &folder
        ));
    }
}
