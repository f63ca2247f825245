//! Trained-classifier adapter: scale, infer, argmax.
//!
//! The network itself is an opaque artifact produced by the training
//! pipeline (a small dense softmax over the vocabulary, exported to ONNX).
//! [`CommandModel`] keeps the backend swappable; the shipped backend lives
//! behind the `onnx` feature, [`StubModel`] covers development and tests.
//!
//! Prediction never fails. Anything wrong at inference time degrades to
//! "no evidence" with a warning, because one bad cycle must not stop the
//! listening loop.

pub mod scaler;
pub mod stub;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use scaler::FeatureScaler;
pub use stub::StubModel;

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;

use std::path::PathBuf;

use tracing::warn;

use crate::decision::Prediction;
use crate::error::{Result, VoxdriveError};
use crate::features::FEATURE_DIM;

/// Contract for trained command-classifier backends.
pub trait CommandModel: Send + 'static {
    /// One-time warm-up: load weights and run a dummy forward pass so the
    /// first real clip does not pay the load cost.
    fn warm_up(&mut self) -> Result<()>;

    /// Forward pass over one feature vector, returning the class
    /// probability distribution in vocabulary order.
    fn infer(&mut self, features: &[f32]) -> Result<Vec<f32>>;
}

pub struct ClassifierAdapter {
    model: Box<dyn CommandModel>,
    scaler: FeatureScaler,
    n_classes: usize,
}

impl ClassifierAdapter {
    /// # Errors
    ///
    /// `ModelLoad` when the scaler width does not match [`FEATURE_DIM`];
    /// that is an artifact mismatch and must surface at startup.
    pub fn new(model: Box<dyn CommandModel>, scaler: FeatureScaler, n_classes: usize) -> Result<Self> {
        if scaler.dim() != FEATURE_DIM {
            return Err(VoxdriveError::ModelLoad(format!(
                "scaler width {} does not match the {FEATURE_DIM}-dimensional frontend",
                scaler.dim()
            )));
        }
        Ok(Self {
            model,
            scaler,
            n_classes,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.model.warm_up()
    }

    /// Scale, infer, argmax. Degrades to an empty prediction on any
    /// scaling or inference problem.
    pub fn predict(&mut self, features: &[f32]) -> Prediction {
        let scaled = match self.scaler.transform(features) {
            Ok(scaled) => scaled,
            Err(e) => {
                warn!(error = %e, "feature scaling failed");
                return Prediction::none();
            }
        };

        let probs = match self.model.infer(&scaled) {
            Ok(probs) => probs,
            Err(e) => {
                warn!(error = %e, "classifier inference failed");
                return Prediction::none();
            }
        };

        // A distribution of the wrong width means the artifact and the
        // vocabulary disagree; no index in it can be trusted.
        if probs.len() != self.n_classes {
            warn!(
                got = probs.len(),
                expected = self.n_classes,
                "class distribution does not match the vocabulary"
            );
            return Prediction::none();
        }

        let mut best_index = 0;
        let mut best_prob = f32::NEG_INFINITY;
        for (index, &p) in probs.iter().enumerate() {
            if p > best_prob {
                best_index = index;
                best_prob = p;
            }
        }
        if !best_prob.is_finite() {
            warn!("class distribution is not finite");
            return Prediction::none();
        }

        Prediction::with_confidence(best_index, best_prob.clamp(0.0, 1.0))
    }
}

/// Default artifact directory for the classifier and scaler.
///
/// `%APPDATA%\Lattice Labs\Voxdrive\models` on Windows,
/// `$XDG_DATA_HOME/voxdrive/models` (or `~/.local/share/voxdrive/models`)
/// elsewhere.
pub fn default_models_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata)
                .join("Lattice Labs")
                .join("Voxdrive")
                .join("models");
        }
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
            return PathBuf::from(xdg).join("voxdrive").join("models");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join(".local/share")
                .join("voxdrive")
                .join("models");
        }
    }
    PathBuf::from("models")
}
