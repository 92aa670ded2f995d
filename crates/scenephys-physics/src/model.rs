//! Reference object models and the all-or-nothing model directory loader.
//!
//! A model directory holds one `<name>.json` file per object model:
//!
//! ```json
//! {
//!   "half_extents": { "x": 0.05, "y": 0.05, "z": 0.05 },
//!   "points": [ { "x": 0.05, "y": 0.0, "z": 0.0 } ]
//! }
//! ```
//!
//! `half_extents` describes the box collision shape handed to the physics
//! engine; `points` is the surface cloud used for recognition scoring and
//! feedback forces.  An empty `points` list is filled with a sampled box
//! surface.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use scenephys_types::{PointCloud, SceneError, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Spacing (metres) of the surface samples generated for models that ship
/// without a point cloud.
const DEFAULT_SURFACE_SPACING: f32 = 0.01;

/// A loaded reference model: collision box plus surface point cloud, both in
/// the model's body frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectModel {
    pub name: String,
    pub half_extents: Vec3,
    pub cloud: PointCloud,
}

#[derive(Deserialize)]
struct ModelFile {
    half_extents: Vec3,
    #[serde(default)]
    points: Vec<Vec3>,
}

impl ObjectModel {
    /// A box model whose surface is sampled every `spacing` metres.
    pub fn box_model(name: impl Into<String>, half_extents: Vec3, spacing: f32) -> Self {
        Self {
            name: name.into(),
            half_extents,
            cloud: sample_box_surface(half_extents, spacing),
        }
    }

    /// Radius of the smallest origin-centred sphere enclosing the model.
    pub fn bounding_radius(&self) -> f32 {
        self.cloud
            .points
            .iter()
            .map(|p| p.norm())
            .fold(self.half_extents.norm(), f32::max)
    }
}

/// Load every model in `names` from `dir`.
///
/// Either all models load or none do: the first missing or malformed file
/// aborts the whole call so a caller never evaluates against a partial model
/// set.
///
/// # Errors
///
/// Returns [`SceneError::ModelLoad`] naming the first model that could not be
/// read, parsed or validated.
pub fn load_object_models(
    dir: &Path,
    names: &[String],
) -> Result<BTreeMap<String, ObjectModel>, SceneError> {
    let mut models = BTreeMap::new();
    for name in names {
        let model = load_one(dir, name)?;
        debug!(model = %name, points = model.cloud.len(), "loaded object model");
        models.insert(name.clone(), model);
    }
    info!(count = models.len(), dir = %dir.display(), "object models loaded");
    Ok(models)
}

fn load_one(dir: &Path, name: &str) -> Result<ObjectModel, SceneError> {
    let fail = |details: String| SceneError::ModelLoad {
        model: name.to_string(),
        details,
    };
    let path = dir.join(format!("{name}.json"));
    let raw = fs::read_to_string(&path)
        .map_err(|e| fail(format!("failed to read {}: {e}", path.display())))?;
    let file: ModelFile =
        serde_json::from_str(&raw).map_err(|e| fail(format!("failed to parse: {e}")))?;

    let h = file.half_extents;
    if !(h.x > 0.0 && h.y > 0.0 && h.z > 0.0) {
        return Err(fail(format!("half_extents must be positive, got {h:?}")));
    }
    let cloud = if file.points.is_empty() {
        sample_box_surface(h, DEFAULT_SURFACE_SPACING)
    } else {
        PointCloud::new(file.points)
    };
    Ok(ObjectModel {
        name: name.to_string(),
        half_extents: h,
        cloud,
    })
}

/// Sample the six faces of an origin-centred box on a regular grid.
fn sample_box_surface(h: Vec3, spacing: f32) -> PointCloud {
    let steps = |extent: f32| ((2.0 * extent / spacing.max(1e-4)).ceil() as usize).max(1);
    let lerp = |extent: f32, i: usize, n: usize| -extent + 2.0 * extent * i as f32 / n as f32;
    let (nx, ny, nz) = (steps(h.x), steps(h.y), steps(h.z));

    let mut points = Vec::new();
    for i in 0..=nx {
        for j in 0..=ny {
            let (x, y) = (lerp(h.x, i, nx), lerp(h.y, j, ny));
            points.push(Vec3::new(x, y, -h.z));
            points.push(Vec3::new(x, y, h.z));
        }
    }
    for i in 0..=nx {
        for k in 1..nz {
            let (x, z) = (lerp(h.x, i, nx), lerp(h.z, k, nz));
            points.push(Vec3::new(x, -h.y, z));
            points.push(Vec3::new(x, h.y, z));
        }
    }
    for j in 1..ny {
        for k in 1..nz {
            let (y, z) = (lerp(h.y, j, ny), lerp(h.z, k, nz));
            points.push(Vec3::new(-h.x, y, z));
            points.push(Vec3::new(h.x, y, z));
        }
    }
    PointCloud::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_model(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(format!("{name}.json")), body).expect("write model");
    }

    #[test]
    fn box_surface_points_lie_on_faces() {
        let h = Vec3::new(0.05, 0.1, 0.02);
        let model = ObjectModel::box_model("box", h, 0.01);
        assert!(!model.cloud.is_empty());
        for p in &model.cloud.points {
            let on_face = (p.x.abs() - h.x).abs() < 1e-5
                || (p.y.abs() - h.y).abs() < 1e-5
                || (p.z.abs() - h.z).abs() < 1e-5;
            assert!(on_face, "{p:?} is not on the box surface");
        }
        assert!(model.bounding_radius() >= h.norm() - 1e-6);
    }

    #[test]
    fn loads_all_requested_models() {
        let dir = tempfile::tempdir().expect("tmp dir");
        write_model(
            dir.path(),
            "cube",
            r#"{"half_extents":{"x":0.05,"y":0.05,"z":0.05}}"#,
        );
        write_model(
            dir.path(),
            "plate",
            r#"{"half_extents":{"x":0.1,"y":0.1,"z":0.01},
                "points":[{"x":0.0,"y":0.0,"z":0.01}]}"#,
        );
        let names = vec!["cube".to_string(), "plate".to_string()];
        let models = load_object_models(dir.path(), &names).expect("load");
        assert_eq!(models.len(), 2);
        assert_eq!(models["plate"].cloud.len(), 1);
        assert!(models["cube"].cloud.len() > 8);
    }

    #[test]
    fn missing_model_aborts_whole_load() {
        let dir = tempfile::tempdir().expect("tmp dir");
        write_model(
            dir.path(),
            "cube",
            r#"{"half_extents":{"x":0.05,"y":0.05,"z":0.05}}"#,
        );
        let names = vec!["cube".to_string(), "ghost".to_string()];
        let err = load_object_models(dir.path(), &names).unwrap_err();
        assert!(matches!(err, SceneError::ModelLoad { ref model, .. } if model == "ghost"));
    }

    #[test]
    fn corrupt_or_degenerate_model_is_rejected() {
        let dir = tempfile::tempdir().expect("tmp dir");
        write_model(dir.path(), "broken", "{ not json");
        write_model(
            dir.path(),
            "flat",
            r#"{"half_extents":{"x":0.05,"y":0.05,"z":0.0}}"#,
        );
        assert!(load_object_models(dir.path(), &["broken".to_string()]).is_err());
        assert!(load_object_models(dir.path(), &["flat".to_string()]).is_err());
    }
}
