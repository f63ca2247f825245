//! Transcript-based command prediction.
//!
//! The second, independent predictor: transcribe the clip, bring the text
//! into the target language, then fuzzy-match it against the vocabulary.
//! Its evidence is binary: a match is authoritative (confidence 1.0), no
//! match contributes nothing.
//!
//! Both network stages degrade instead of failing the cycle. A dead
//! transcription endpoint downgrades this predictor to "no evidence"; a
//! dead translation endpoint matches the raw transcript instead.

pub mod stt;
pub mod translate;

pub use stt::{SpeechToText, WhisperApiTranscriber};
pub use translate::{GoogleTranslator, Translator};

use strsim::normalized_levenshtein;
use tracing::{debug, warn};

use crate::audio::AudioClip;
use crate::decision::Prediction;
use crate::vocab::Vocabulary;

/// Letters that only occur in Turkish text. A transcript containing any of
/// them is already in the target language, so translation is skipped.
const TURKISH_LETTERS: &str = "ğüşöçİĞÜŞÖÇ";

/// What the transcript path observed for one clip, for display and logs.
#[derive(Debug, Clone, Default)]
pub struct TranscriptTrace {
    /// Raw transcription result (possibly empty).
    pub transcript: String,
    /// Lower-cased text that was matched against the vocabulary.
    pub matched_text: String,
    /// Translation was skipped because the transcript was already Turkish.
    pub translation_skipped: bool,
    pub stt_failed: bool,
    pub translation_failed: bool,
    /// Similarity of the winning label, when one cleared the cutoff.
    pub similarity: Option<f64>,
}

pub struct TranscriptMatcher {
    stt: Box<dyn SpeechToText>,
    translator: Box<dyn Translator>,
    target_lang: String,
    cutoff: f64,
}

impl TranscriptMatcher {
    pub fn new(
        stt: Box<dyn SpeechToText>,
        translator: Box<dyn Translator>,
        target_lang: impl Into<String>,
        cutoff: f64,
    ) -> Self {
        Self {
            stt,
            translator,
            target_lang: target_lang.into(),
            cutoff,
        }
    }

    /// Produce the transcript prediction for one clip.
    pub fn match_clip(&mut self, clip: &AudioClip, vocab: &Vocabulary) -> (Prediction, TranscriptTrace) {
        let mut trace = TranscriptTrace::default();

        let transcript = match self.stt.transcribe(clip) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "transcription failed, continuing without transcript evidence");
                trace.stt_failed = true;
                String::new()
            }
        };
        trace.transcript = transcript.clone();

        if transcript.trim().is_empty() {
            return (Prediction::none(), trace);
        }

        let text = if contains_turkish_letters(&transcript) {
            debug!("transcript already carries Turkish letters, skipping translation");
            trace.translation_skipped = true;
            transcript
        } else {
            match self.translator.translate(&transcript, &self.target_lang) {
                Ok(translated) => translated,
                Err(e) => {
                    warn!(error = %e, "translation failed, matching the raw transcript");
                    trace.translation_failed = true;
                    transcript
                }
            }
        };

        let lowered = text.to_lowercase();
        trace.matched_text = lowered.clone();

        match best_vocab_match(&lowered, vocab, self.cutoff) {
            Some((index, score)) => {
                trace.similarity = Some(score);
                debug!(
                    label = vocab.label(index).unwrap_or("?"),
                    score, "transcript matched a command"
                );
                (Prediction::matched(index), trace)
            }
            None => (Prediction::none(), trace),
        }
    }
}

pub(crate) fn contains_turkish_letters(text: &str) -> bool {
    text.chars().any(|c| TURKISH_LETTERS.contains(c))
}

/// Best label by normalized Levenshtein similarity, if any clears `cutoff`.
fn best_vocab_match(text: &str, vocab: &Vocabulary, cutoff: f64) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, label) in vocab.labels().enumerate() {
        let score = normalized_levenshtein(text, label);
        match best {
            Some((_, held)) if held >= score => {}
            _ => best = Some((index, score)),
        }
    }
    best.filter(|&(_, score)| score >= cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, VoxdriveError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedStt {
        /// None simulates an endpoint failure.
        text: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl SpeechToText for ScriptedStt {
        fn transcribe(&mut self, _clip: &AudioClip) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.text {
                Some(text) => Ok(text.clone()),
                None => Err(VoxdriveError::Transcription("scripted failure".into())),
            }
        }
    }

    struct ScriptedTranslator {
        /// None simulates an endpoint failure.
        output: Option<String>,
        calls: Arc<AtomicUsize>,
    }

    impl Translator for ScriptedTranslator {
        fn translate(&mut self, _text: &str, _target: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.output {
                Some(output) => Ok(output.clone()),
                None => Err(VoxdriveError::Translation("scripted failure".into())),
            }
        }
    }

    fn clip() -> AudioClip {
        AudioClip::new(vec![0.1; 1600], 16_000)
    }

    fn matcher_with(
        stt_text: Option<&str>,
        translation: Option<&str>,
    ) -> (TranscriptMatcher, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let stt_calls = Arc::new(AtomicUsize::new(0));
        let translate_calls = Arc::new(AtomicUsize::new(0));
        let matcher = TranscriptMatcher::new(
            Box::new(ScriptedStt {
                text: stt_text.map(str::to_string),
                calls: Arc::clone(&stt_calls),
            }),
            Box::new(ScriptedTranslator {
                output: translation.map(str::to_string),
                calls: Arc::clone(&translate_calls),
            }),
            "tr",
            0.6,
        );
        (matcher, stt_calls, translate_calls)
    }

    #[test]
    fn translated_text_matches_a_command() {
        let (mut matcher, _, translate_calls) = matcher_with(Some("stop"), Some("dur"));
        let (prediction, trace) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, Some(4));
        assert_eq!(prediction.confidence, 1.0);
        assert_eq!(translate_calls.load(Ordering::SeqCst), 1);
        assert_eq!(trace.matched_text, "dur");
        assert!(trace.similarity.unwrap() >= 0.6);
    }

    #[test]
    fn turkish_letters_skip_translation() {
        let (mut matcher, _, translate_calls) = matcher_with(Some("sola dön"), Some("unused"));
        let (prediction, trace) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, Some(3));
        assert!(trace.translation_skipped);
        assert_eq!(translate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dotted_capital_i_lowercases_and_still_matches() {
        let (mut matcher, _, translate_calls) = matcher_with(Some("İleri git"), Some("unused"));
        let (prediction, _) = matcher.match_clip(&clip(), &Vocabulary::default());
        // İ marks the text as Turkish, so no translation happens, and the
        // Unicode lowercase of İ stays within the similarity cutoff.
        assert_eq!(prediction.command, Some(0));
        assert_eq!(translate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn transcription_failure_degrades_to_no_evidence() {
        let (mut matcher, _, translate_calls) = matcher_with(None, Some("dur"));
        let (prediction, trace) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, None);
        assert_eq!(prediction.confidence, 0.0);
        assert!(trace.stt_failed);
        assert_eq!(translate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_transcript_never_reaches_translation() {
        let (mut matcher, stt_calls, translate_calls) = matcher_with(Some("   "), Some("dur"));
        let (prediction, _) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, None);
        assert_eq!(stt_calls.load(Ordering::SeqCst), 1);
        assert_eq!(translate_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn translation_failure_falls_back_to_the_raw_transcript() {
        let (mut matcher, _, _) = matcher_with(Some("dur"), None);
        let (prediction, trace) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, Some(4));
        assert!(trace.translation_failed);
    }

    #[test]
    fn near_miss_within_cutoff_still_matches() {
        // "durr" vs "dur": similarity 0.75.
        let (mut matcher, _, _) = matcher_with(Some("durr"), None);
        let (prediction, _) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, Some(4));
    }

    #[test]
    fn raising_the_cutoff_never_revives_a_match() {
        // "durr" sits at similarity 0.75 against "dur".
        let cutoffs = [0.0f64, 0.5, 0.7, 0.75, 0.76, 0.9, 1.0];
        let matched: Vec<bool> = cutoffs
            .iter()
            .map(|&cutoff| {
                let mut matcher = TranscriptMatcher::new(
                    Box::new(ScriptedStt {
                        text: Some("durr".into()),
                        calls: Arc::new(AtomicUsize::new(0)),
                    }),
                    Box::new(ScriptedTranslator {
                        output: None,
                        calls: Arc::new(AtomicUsize::new(0)),
                    }),
                    "tr",
                    cutoff,
                );
                let (prediction, _) = matcher.match_clip(&clip(), &Vocabulary::default());
                prediction.command.is_some()
            })
            .collect();

        assert!(matched[0], "cutoff 0.0 must accept the best label");
        assert!(!matched[cutoffs.len() - 1], "cutoff 1.0 must reject a 0.75 match");
        for pair in matched.windows(2) {
            assert!(pair[0] || !pair[1], "match revived as the cutoff rose");
        }
    }

    #[test]
    fn unrelated_text_stays_below_the_cutoff() {
        let (mut matcher, _, _) = matcher_with(Some("şarkı söyle"), Some("unused"));
        let (prediction, trace) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, None);
        assert_eq!(trace.similarity, None);
    }

    #[test]
    fn uppercase_input_is_matched_case_insensitively() {
        let (mut matcher, _, _) = matcher_with(Some("GERI GEL"), None);
        let (prediction, _) = matcher.match_clip(&clip(), &Vocabulary::default());
        assert_eq!(prediction.command, Some(1));
    }

    #[test]
    fn turkish_letter_detection_covers_the_whole_set() {
        assert!(contains_turkish_letters("ağır"));
        assert!(contains_turkish_letters("İstanbul"));
        assert!(contains_turkish_letters("ÜŞÖÇ"));
        assert!(!contains_turkish_letters("plain ascii text"));
        assert!(!contains_turkish_letters(""));
    }
}
