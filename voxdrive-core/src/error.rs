use thiserror::Error;

/// All errors produced by voxdrive-core.
#[derive(Debug, Error)]
pub enum VoxdriveError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("clip is silent after trimming")]
    EmptyAudio,

    #[error("feature extraction error: {0}")]
    FeatureExtraction(String),

    #[error("WAV error: {0}")]
    Wav(String),

    #[error("invalid vocabulary: {0}")]
    Vocabulary(String),

    #[error("model file not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("model load error: {0}")]
    ModelLoad(String),

    #[error("scaler error: {0}")]
    Scaler(String),

    #[error("ONNX session error: {0}")]
    OnnxSession(String),

    #[error("inference error: {0}")]
    Inference(String),

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("serial port error: {0}")]
    Serial(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, VoxdriveError>;
