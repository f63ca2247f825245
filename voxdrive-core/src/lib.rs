//! # voxdrive-core
//!
//! Voice-command recognizer for a serial-attached vehicle.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → ClipRecorder → AudioClip (16 kHz mono, fixed length)
//!                                  │
//!                          FeatureExtractor (trim → MFCC+Δ+ΔΔ stats)
//!                            │                │
//!                   ClassifierAdapter   TranscriptMatcher (STT + translate)
//!                            │                │
//!                            └── arbitrate ───┘
//!                                     │
//!                               Dispatcher → serial byte
//! ```
//!
//! Two independent recognizers vote on every clip; the transcript path
//! outranks the classifier, and the classifier only counts when
//! confident. Each stage degrades to "no command" rather than erroring,
//! so a flaky network or a missing model never crashes the loop.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod classifier;
pub mod decision;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod features;
pub mod transcript;
pub mod vocab;

// Convenience re-exports for downstream crates
pub use audio::{AudioClip, ClipRecorder};
pub use classifier::{ClassifierAdapter, CommandModel, FeatureScaler, StubModel};
pub use decision::{arbitrate, Prediction};
pub use dispatch::{CommandLink, DispatchOutcome, Dispatcher, SerialLink};
pub use engine::{CommandEngine, CycleReport, EngineConfig, EngineDiagnostics};
pub use error::{Result, VoxdriveError};
pub use features::{FeatureExtractor, SilencePolicy, FEATURE_DIM};
pub use transcript::{
    GoogleTranslator, SpeechToText, TranscriptMatcher, TranscriptTrace, Translator,
    WhisperApiTranscriber,
};
pub use vocab::{CommandSpec, Vocabulary};

#[cfg(feature = "onnx")]
pub use classifier::OnnxClassifier;
