//! ONNX Runtime classifier backend.
//!
//! The artifact is a small dense softmax network exported by the training
//! pipeline: one f32 input of shape `[1, 60]`, one probability row over
//! the vocabulary. Input and output names are read from the model itself,
//! so export-tool naming differences don't matter.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::ep;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use crate::classifier::CommandModel;
use crate::error::{Result, VoxdriveError};

pub struct OnnxClassifier {
    model_path: PathBuf,
    input_dim: usize,
    session: Option<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    /// Lazily constructed; nothing loads until [`CommandModel::warm_up`].
    pub fn new(model_path: impl Into<PathBuf>, input_dim: usize) -> Self {
        Self {
            model_path: model_path.into(),
            input_dim,
            session: None,
            input_name: String::new(),
            output_name: String::new(),
        }
    }
}

fn create_session(path: &Path) -> Result<Session> {
    // The network is tiny; a couple of threads is already overkill.
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .clamp(1, 4);
    SessionBuilder::new()
        .map_err(|e| VoxdriveError::OnnxSession(e.to_string()))?
        .with_intra_threads(intra_threads)
        .map_err(|e| VoxdriveError::OnnxSession(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::All)
        .map_err(|e| VoxdriveError::OnnxSession(e.to_string()))?
        .with_execution_providers([ep::CPU::default().build()])
        .map_err(|e| VoxdriveError::OnnxSession(e.to_string()))?
        .commit_from_file(path)
        .map_err(|e| VoxdriveError::OnnxSession(e.to_string()))
}

impl CommandModel for OnnxClassifier {
    fn warm_up(&mut self) -> Result<()> {
        if !self.model_path.exists() {
            return Err(VoxdriveError::ModelNotFound {
                path: self.model_path.clone(),
            });
        }
        info!(path = %self.model_path.display(), "loading classifier artifact");
        let session = create_session(&self.model_path)?;

        self.input_name = session
            .inputs()
            .iter()
            .next()
            .map(|input| input.name().to_string())
            .ok_or_else(|| VoxdriveError::ModelLoad("classifier model has no inputs".into()))?;
        self.output_name = session
            .outputs()
            .iter()
            .next()
            .map(|output| output.name().to_string())
            .ok_or_else(|| VoxdriveError::ModelLoad("classifier model has no outputs".into()))?;
        debug!(
            input = %self.input_name,
            output = %self.output_name,
            "classifier tensor names resolved"
        );
        self.session = Some(session);

        // Dummy forward pass so the first real clip pays no load cost.
        let dummy = vec![0.0f32; self.input_dim];
        let classes = self.infer(&dummy)?.len();
        info!(classes, dim = self.input_dim, "classifier ready");
        Ok(())
    }

    fn infer(&mut self, features: &[f32]) -> Result<Vec<f32>> {
        if features.len() != self.input_dim {
            return Err(VoxdriveError::Inference(format!(
                "expected {} features, got {}",
                self.input_dim,
                features.len()
            )));
        }
        let Some(session) = self.session.as_mut() else {
            return Err(VoxdriveError::OnnxSession(
                "model not loaded — call warm_up()".into(),
            ));
        };

        let input = Array2::from_shape_vec((1, features.len()), features.to_vec())
            .map_err(|e| VoxdriveError::Inference(e.to_string()))?;
        let value = Value::from_array(input)
            .map_err(|e: ort::Error| VoxdriveError::OnnxSession(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => value])
            .map_err(|e| VoxdriveError::OnnxSession(e.to_string()))?;
        let (_, data) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| VoxdriveError::OnnxSession(e.to_string()))?;

        // Both [n] and [1, n] exports flatten to the same row.
        Ok(data.to_vec())
    }
}
