use std::sync::{Arc, Mutex};

use voxdrive_core::{
    AudioClip, CommandEngine, CommandLink, CommandModel, DispatchOutcome, EngineConfig,
    FeatureScaler, Result, SpeechToText, Translator, Vocabulary, VoxdriveError, FEATURE_DIM,
};

struct FixedModel {
    probs: Vec<f32>,
}

impl CommandModel for FixedModel {
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    fn infer(&mut self, _features: &[f32]) -> Result<Vec<f32>> {
        Ok(self.probs.clone())
    }
}

/// `None` simulates the STT service being unreachable.
struct ScriptedStt {
    reply: Option<&'static str>,
}

impl SpeechToText for ScriptedStt {
    fn transcribe(&mut self, _clip: &AudioClip) -> Result<String> {
        match self.reply {
            Some(text) => Ok(text.to_string()),
            None => Err(VoxdriveError::Transcription("service unreachable".into())),
        }
    }
}

/// Looks up scripted pairs and echoes anything else.
struct ScriptedTranslator {
    pairs: Vec<(&'static str, &'static str)>,
}

impl Translator for ScriptedTranslator {
    fn translate(&mut self, text: &str, _target: &str) -> Result<String> {
        for (from, to) in &self.pairs {
            if *from == text {
                return Ok((*to).to_string());
            }
        }
        Ok(text.to_string())
    }
}

/// Fails the test if the engine reaches for translation at all.
struct PanicTranslator;

impl Translator for PanicTranslator {
    fn translate(&mut self, text: &str, _target: &str) -> Result<String> {
        panic!("translation requested for {text:?} but none was expected");
    }
}

#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl SharedSink {
    fn bytes(&self) -> Vec<u8> {
        self.0.lock().unwrap().clone()
    }
}

impl CommandLink for SharedSink {
    fn send(&mut self, code: u8) -> Result<()> {
        self.0.lock().unwrap().push(code);
        Ok(())
    }
}

fn tone_clip() -> AudioClip {
    let samples: Vec<f32> = (0..32_000)
        .map(|i| 0.4 * (i as f32 * 330.0 * 2.0 * std::f32::consts::PI / 16_000.0).sin())
        .collect();
    AudioClip::new(samples, 16_000)
}

fn build_engine(
    probs: Vec<f32>,
    stt: Box<dyn SpeechToText>,
    translator: Box<dyn Translator>,
    sink: SharedSink,
) -> CommandEngine {
    CommandEngine::new(
        EngineConfig::default(),
        Vocabulary::default(),
        Box::new(FixedModel { probs }),
        FeatureScaler::identity(FEATURE_DIM),
        stt,
        translator,
        Some(Box::new(sink)),
    )
    .expect("engine assembly")
}

#[test]
fn transcript_match_overrides_a_confident_classifier() {
    let sink = SharedSink::default();
    let mut probs = vec![0.0; 5];
    probs[0] = 0.99; // classifier is sure the clip says "ileri git"
    let mut engine = build_engine(
        probs,
        Box::new(ScriptedStt { reply: Some("stop") }),
        Box::new(ScriptedTranslator {
            pairs: vec![("stop", "dur")],
        }),
        sink.clone(),
    );

    let report = engine.process_clip(&tone_clip()).expect("cycle");

    assert_eq!(report.transcript.command, Some(4));
    assert_eq!(report.decision, Some(4));
    assert_eq!(report.dispatch, DispatchOutcome::Sent(b'4'));
    assert_eq!(sink.bytes(), vec![b'4']);
    assert!(!report.transcript_trace.translation_skipped);
}

#[test]
fn classifier_carries_the_cycle_when_transcription_fails() {
    let sink = SharedSink::default();
    let mut probs = vec![0.03; 5];
    probs[0] = 0.85;
    let mut engine = build_engine(
        probs,
        Box::new(ScriptedStt { reply: None }),
        Box::new(PanicTranslator),
        sink.clone(),
    );

    let report = engine.process_clip(&tone_clip()).expect("cycle");

    assert!(report.transcript.is_none());
    assert!(report.transcript_trace.stt_failed);
    assert_eq!(report.decision, Some(0));
    assert_eq!(sink.bytes(), vec![b'0']);
    assert_eq!(engine.diagnostics().degraded_transcripts, 1);
}

#[test]
fn low_confidence_classifier_alone_sends_nothing() {
    let sink = SharedSink::default();
    let mut probs = vec![0.15; 5];
    probs[1] = 0.4; // best guess, but below the 0.7 threshold
    let mut engine = build_engine(
        probs,
        Box::new(ScriptedStt { reply: None }),
        Box::new(PanicTranslator),
        sink.clone(),
    );

    let report = engine.process_clip(&tone_clip()).expect("cycle");

    assert_eq!(report.decision, None);
    assert_eq!(report.dispatch, DispatchOutcome::NoDecision);
    assert!(sink.bytes().is_empty());
}

#[test]
fn turkish_transcript_skips_translation_entirely() {
    let sink = SharedSink::default();
    let mut engine = build_engine(
        vec![0.2; 5],
        Box::new(ScriptedStt {
            reply: Some("Sağa dön"),
        }),
        Box::new(PanicTranslator),
        sink.clone(),
    );

    let report = engine.process_clip(&tone_clip()).expect("cycle");

    assert!(report.transcript_trace.translation_skipped);
    // "sağa dön" vs "saga dön" is one substitution: similarity 0.875.
    assert_eq!(report.transcript.command, Some(2));
    assert_eq!(sink.bytes(), vec![b'2']);
}

#[test]
fn rejected_silent_clip_then_a_real_take() {
    let sink = SharedSink::default();
    let mut engine = build_engine(
        vec![0.2; 5],
        Box::new(ScriptedStt { reply: Some("dur") }),
        Box::new(ScriptedTranslator { pairs: vec![] }),
        sink.clone(),
    );

    let err = engine.process_clip(&AudioClip::new(vec![0.0; 32_000], 16_000));
    assert!(matches!(err, Err(VoxdriveError::EmptyAudio)));
    assert!(sink.bytes().is_empty());

    let report = engine.process_clip(&tone_clip()).expect("cycle");
    assert_eq!(report.decision, Some(4));
    assert_eq!(sink.bytes(), vec![b'4']);

    let diag = engine.diagnostics();
    assert_eq!(diag.cycles, 2);
    assert_eq!(diag.empty_clips, 1);
    assert_eq!(diag.commands_dispatched, 1);
}

#[test]
fn shutdown_is_idempotent_across_drop() {
    let sink = SharedSink::default();
    {
        let mut engine = build_engine(
            vec![0.2; 5],
            Box::new(ScriptedStt { reply: None }),
            Box::new(PanicTranslator),
            sink.clone(),
        );
        engine.shutdown();
        engine.shutdown();
        // Dropping after an explicit shutdown must not send a second stop.
    }
    assert_eq!(sink.bytes(), vec![b'4']);
}
