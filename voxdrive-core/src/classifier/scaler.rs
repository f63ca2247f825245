//! Per-dimension standardization with statistics frozen at training time.
//!
//! The scaler is fitted once by the dataset tooling, saved as JSON next to
//! the classifier artifact, and loaded read-only at startup. Inference
//! never refits; a skew between live and training statistics is a tooling
//! problem, not something to paper over at runtime.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VoxdriveError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub means: Vec<f32>,
    pub stds: Vec<f32>,
}

impl FeatureScaler {
    /// Fit per-dimension mean and standard deviation over a training set.
    ///
    /// Zero-variance dimensions get a standard deviation of 1.0 so the
    /// transform stays defined.
    pub fn fit(vectors: &[Vec<f32>]) -> Result<Self> {
        let Some(first) = vectors.first() else {
            return Err(VoxdriveError::Scaler("cannot fit on an empty set".into()));
        };
        let dim = first.len();
        if dim == 0 {
            return Err(VoxdriveError::Scaler("cannot fit on zero-length vectors".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(VoxdriveError::Scaler(format!(
                "ragged training set: expected {dim} dimensions, found {}",
                bad.len()
            )));
        }

        let n = vectors.len() as f32;
        let mut means = vec![0.0f32; dim];
        for vector in vectors {
            for (slot, &v) in means.iter_mut().zip(vector) {
                *slot += v;
            }
        }
        for slot in means.iter_mut() {
            *slot /= n;
        }

        let mut stds = vec![0.0f32; dim];
        for vector in vectors {
            for ((slot, &v), &mean) in stds.iter_mut().zip(vector).zip(&means) {
                let d = v - mean;
                *slot += d * d;
            }
        }
        for slot in stds.iter_mut() {
            *slot = (*slot / n).sqrt();
            if *slot == 0.0 {
                *slot = 1.0;
            }
        }

        debug!(dim, rows = vectors.len(), "scaler fitted");
        Ok(Self { means, stds })
    }

    /// Identity transform of the given width, for development and tests.
    pub fn identity(dim: usize) -> Self {
        Self {
            means: vec![0.0; dim],
            stds: vec![1.0; dim],
        }
    }

    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Standardize one vector with the frozen statistics.
    pub fn transform(&self, vector: &[f32]) -> Result<Vec<f32>> {
        if vector.len() != self.dim() {
            return Err(VoxdriveError::Scaler(format!(
                "feature length {} does not match scaler width {}",
                vector.len(),
                self.dim()
            )));
        }
        Ok(vector
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(&v, (&mean, &std))| (v - mean) / std)
            .collect())
    }

    /// Load and validate a scaler artifact.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VoxdriveError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path)?;
        let scaler: Self = serde_json::from_str(&raw)
            .map_err(|e| VoxdriveError::ModelLoad(format!("scaler parse: {e}")))?;
        if scaler.means.len() != scaler.stds.len() {
            return Err(VoxdriveError::ModelLoad(format!(
                "scaler artifact is inconsistent: {} means vs {} stds",
                scaler.means.len(),
                scaler.stds.len()
            )));
        }
        if scaler.stds.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(VoxdriveError::ModelLoad(
                "scaler artifact has a non-positive standard deviation".into(),
            ));
        }
        debug!(dim = scaler.dim(), path = %path.display(), "scaler loaded");
        Ok(scaler)
    }

    /// Write the artifact as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| VoxdriveError::Scaler(format!("serialize: {e}")))?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn fit_computes_population_statistics() {
        let rows = vec![vec![0.0f32, 10.0], vec![2.0, 10.0], vec![4.0, 10.0]];
        let scaler = FeatureScaler::fit(&rows).unwrap();
        assert_abs_diff_eq!(scaler.means[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(scaler.stds[0], (8.0f32 / 3.0).sqrt(), epsilon = 1e-5);
        // Zero-variance dimension keeps the transform defined.
        assert_abs_diff_eq!(scaler.means[1], 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(scaler.stds[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn transform_standardizes_against_frozen_statistics() {
        let rows = vec![vec![0.0f32, 10.0], vec![2.0, 10.0], vec![4.0, 10.0]];
        let scaler = FeatureScaler::fit(&rows).unwrap();
        let out = scaler.transform(&[0.0, 10.0]).unwrap();
        assert_abs_diff_eq!(out[0], -2.0 / (8.0f32 / 3.0).sqrt(), epsilon = 1e-5);
        assert_abs_diff_eq!(out[1], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn transform_rejects_a_length_mismatch() {
        let scaler = FeatureScaler::identity(4);
        assert!(matches!(
            scaler.transform(&[1.0, 2.0]),
            Err(VoxdriveError::Scaler(_))
        ));
    }

    #[test]
    fn fit_rejects_empty_and_ragged_sets() {
        assert!(matches!(
            FeatureScaler::fit(&[]),
            Err(VoxdriveError::Scaler(_))
        ));
        let ragged = vec![vec![1.0f32, 2.0], vec![1.0]];
        assert!(matches!(
            FeatureScaler::fit(&ragged),
            Err(VoxdriveError::Scaler(_))
        ));
    }

    #[test]
    fn artifact_round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        let original = FeatureScaler::fit(&[vec![1.0f32, 5.0], vec![3.0, 9.0]]).unwrap();
        original.save(&path).unwrap();

        let loaded = FeatureScaler::load(&path).unwrap();
        assert_eq!(loaded.means, original.means);
        assert_eq!(loaded.stds, original.stds);
    }

    #[test]
    fn load_rejects_missing_and_malformed_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(
            FeatureScaler::load(&missing),
            Err(VoxdriveError::ModelNotFound { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, r#"{"means":[0.0],"stds":[-1.0]}"#).unwrap();
        assert!(matches!(
            FeatureScaler::load(&bad),
            Err(VoxdriveError::ModelLoad(_))
        ));
    }
}
