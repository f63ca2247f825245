//! `CommandEngine` — one clip in, at most one command byte out.
//!
//! ## Cycle
//!
//! ```text
//! AudioClip (16 kHz mono)
//!     └─► FeatureExtractor      trim + MFCC statistics (local, runs first)
//!         ├─► ClassifierAdapter  scaled features → class distribution
//!         └─► TranscriptMatcher  STT → translate → fuzzy vocabulary match
//!             └─► arbitrate      transcript wins; classifier needs confidence
//!                 └─► Dispatcher single byte over the command link
//! ```
//!
//! Feature extraction runs before either recognizer, so a clip that is
//! silent after trimming is rejected without paying for a network round
//! trip. Everything is synchronous: one cycle runs to completion on the
//! caller's thread before the next clip is captured.

use tracing::info;

use crate::{
    audio::AudioClip,
    classifier::{ClassifierAdapter, CommandModel, FeatureScaler},
    decision::{arbitrate, Prediction},
    dispatch::{CommandLink, DispatchOutcome, Dispatcher},
    error::Result,
    features::{FeatureExtractor, SilencePolicy},
    transcript::{SpeechToText, TranscriptMatcher, TranscriptTrace, Translator},
    vocab::Vocabulary,
};

/// Configuration for `CommandEngine`.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Sample rate every clip is expected to arrive at (Hz). Capture and
    /// file loading resample to this before the engine sees the audio.
    /// Default: 16000.
    pub sample_rate: u32,
    /// Length of one take in seconds. Default: 2.0.
    pub clip_seconds: f32,
    /// Trim threshold in dB below the clip peak. Default: 25.0.
    pub trim_top_db: f32,
    /// What to do when trimming finds no signal. Default: `Reject`.
    pub silence_policy: SilencePolicy,
    /// Minimum classifier confidence before its vote counts in
    /// arbitration. Default: 0.7.
    pub confidence_threshold: f32,
    /// Minimum normalized similarity for a transcript to claim a
    /// vocabulary label. Default: 0.6.
    pub match_cutoff: f64,
    /// Language the transcript is translated into before matching.
    /// Default: "tr".
    pub target_lang: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            clip_seconds: 2.0,
            trim_top_db: 25.0,
            silence_policy: SilencePolicy::Reject,
            confidence_threshold: 0.7,
            match_cutoff: 0.6,
            target_lang: "tr".into(),
        }
    }
}

/// Everything one cycle produced, for logging and the CLI's report line.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub classifier: Prediction,
    pub transcript: Prediction,
    pub transcript_trace: TranscriptTrace,
    pub decision: Option<usize>,
    pub dispatch: DispatchOutcome,
}

/// Running totals across the engine's lifetime.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineDiagnostics {
    /// Clips handed to `process_clip`.
    pub cycles: u64,
    /// Clips rejected as silent before recognition.
    pub empty_clips: u64,
    /// Cycles where STT or translation failed and the transcript path
    /// ran degraded.
    pub degraded_transcripts: u64,
    /// Command bytes that actually went out on the link.
    pub commands_dispatched: u64,
}

/// The top-level recognizer handle.
///
/// Owns both recognition paths and the dispatcher. Single-threaded by
/// construction: every method takes `&mut self` and blocks until done.
pub struct CommandEngine {
    config: EngineConfig,
    vocab: Vocabulary,
    extractor: FeatureExtractor,
    classifier: ClassifierAdapter,
    matcher: TranscriptMatcher,
    dispatcher: Dispatcher,
    diagnostics: EngineDiagnostics,
}

impl CommandEngine {
    /// Assemble an engine. Does not touch the model weights or the
    /// network — call `warm_up()` before the first clip.
    ///
    /// # Errors
    /// Fails when the scaler width does not match the feature frontend.
    pub fn new(
        config: EngineConfig,
        vocab: Vocabulary,
        model: Box<dyn CommandModel>,
        scaler: FeatureScaler,
        stt: Box<dyn SpeechToText>,
        translator: Box<dyn Translator>,
        link: Option<Box<dyn CommandLink>>,
    ) -> Result<Self> {
        let classifier = ClassifierAdapter::new(model, scaler, vocab.len())?;
        let matcher = TranscriptMatcher::new(stt, translator, config.target_lang.clone(), config.match_cutoff);
        let extractor = FeatureExtractor::new(config.sample_rate, config.trim_top_db, config.silence_policy);
        let dispatcher = Dispatcher::new(link, vocab.stop_code());

        Ok(Self {
            config,
            vocab,
            extractor,
            classifier,
            matcher,
            dispatcher,
            diagnostics: EngineDiagnostics::default(),
        })
    }

    /// Load the classifier and run a dummy inference.
    ///
    /// Call once at startup so the first real clip is not the one that
    /// pays for session creation.
    pub fn warm_up(&mut self) -> Result<()> {
        info!("warming up command classifier");
        self.classifier.warm_up()?;
        info!("command classifier ready");
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn diagnostics(&self) -> EngineDiagnostics {
        self.diagnostics
    }

    /// Run one full cycle on an already-captured clip.
    ///
    /// Recognition degradation (network down, model missing its guess)
    /// is absorbed into a `none` vote; only an unusable clip is a hard
    /// error, and the caller is expected to keep looping past it.
    pub fn process_clip(&mut self, clip: &AudioClip) -> Result<CycleReport> {
        self.diagnostics.cycles += 1;

        let features = match self.extractor.extract(clip) {
            Ok(v) => v,
            Err(e) => {
                self.diagnostics.empty_clips += 1;
                return Err(e);
            }
        };

        let classifier = self.classifier.predict(&features);
        let (transcript, transcript_trace) = self.matcher.match_clip(clip, &self.vocab);
        if transcript_trace.stt_failed || transcript_trace.translation_failed {
            self.diagnostics.degraded_transcripts += 1;
        }

        let decision = arbitrate(&transcript, &classifier, self.config.confidence_threshold);
        let dispatch = self.dispatcher.dispatch(decision, &self.vocab);
        if matches!(dispatch, DispatchOutcome::Sent(_)) {
            self.diagnostics.commands_dispatched += 1;
        }

        Ok(CycleReport {
            classifier,
            transcript,
            transcript_trace,
            decision,
            dispatch,
        })
    }

    /// Stop the vehicle and release the command link.
    ///
    /// Idempotent; also runs when the engine is dropped.
    pub fn shutdown(&mut self) {
        self.dispatcher.shutdown();
        info!(
            cycles = self.diagnostics.cycles,
            empty_clips = self.diagnostics.empty_clips,
            degraded_transcripts = self.diagnostics.degraded_transcripts,
            commands_dispatched = self.diagnostics.commands_dispatched,
            "engine shut down"
        );
    }
}
