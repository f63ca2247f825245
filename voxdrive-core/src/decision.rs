//! Arbitration between the two predictors.
//!
//! The rule order is a business rule and never changes:
//!
//! 1. A transcript match always wins.
//! 2. Otherwise the classifier fires, but only at or above the confidence
//!    threshold.
//! 3. Otherwise the clip produces no command at all.
//!
//! Dropping a clip is always safer than acting on weak evidence; the
//! vehicle simply keeps doing what it was last told.

use tracing::debug;

/// One predictor's verdict for a clip: a vocabulary index, or nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub command: Option<usize>,
    pub confidence: f32,
}

impl Prediction {
    /// No evidence.
    pub fn none() -> Self {
        Self {
            command: None,
            confidence: 0.0,
        }
    }

    /// Binary evidence from the transcript path.
    pub fn matched(index: usize) -> Self {
        Self {
            command: Some(index),
            confidence: 1.0,
        }
    }

    pub fn with_confidence(index: usize, confidence: f32) -> Self {
        Self {
            command: Some(index),
            confidence,
        }
    }

    pub fn is_none(&self) -> bool {
        self.command.is_none()
    }
}

/// Combine both predictions into at most one final command index.
pub fn arbitrate(transcript: &Prediction, classifier: &Prediction, threshold: f32) -> Option<usize> {
    if let Some(index) = transcript.command {
        debug!(index, "transcript match wins arbitration");
        return Some(index);
    }
    if let Some(index) = classifier.command {
        if classifier.confidence >= threshold {
            debug!(
                index,
                confidence = classifier.confidence,
                "classifier clears the threshold"
            );
            return Some(index);
        }
        debug!(
            index,
            confidence = classifier.confidence,
            threshold, "classifier below threshold, dropping the clip"
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_match_overrides_any_classifier() {
        let transcript = Prediction::matched(4);
        let classifier = Prediction::with_confidence(0, 1.0);
        assert_eq!(arbitrate(&transcript, &classifier, 0.7), Some(4));
    }

    #[test]
    fn classifier_fires_at_or_above_the_threshold() {
        let none = Prediction::none();
        let at = Prediction::with_confidence(2, 0.7);
        let above = Prediction::with_confidence(2, 0.9);
        assert_eq!(arbitrate(&none, &at, 0.7), Some(2));
        assert_eq!(arbitrate(&none, &above, 0.7), Some(2));
    }

    #[test]
    fn classifier_below_the_threshold_is_dropped() {
        let none = Prediction::none();
        let weak = Prediction::with_confidence(3, 0.699);
        assert_eq!(arbitrate(&none, &weak, 0.7), None);
    }

    #[test]
    fn no_evidence_at_all_yields_no_command() {
        assert_eq!(arbitrate(&Prediction::none(), &Prediction::none(), 0.7), None);
        assert!(Prediction::none().is_none());
    }

    #[test]
    fn raising_the_threshold_never_revives_a_dropped_clip() {
        let none = Prediction::none();
        let thresholds = [0.0f32, 0.25, 0.5, 0.75, 1.0];
        for confidence in [0.0f32, 0.2, 0.5, 0.69, 0.7, 0.85, 1.0] {
            let classifier = Prediction::with_confidence(1, confidence);
            let decisions: Vec<bool> = thresholds
                .iter()
                .map(|&t| arbitrate(&none, &classifier, t).is_some())
                .collect();
            // Once a threshold drops the clip, every higher one does too.
            for pair in decisions.windows(2) {
                assert!(pair[0] || !pair[1], "decision revived as the threshold rose");
            }
        }
    }

    #[test]
    fn transcript_wins_regardless_of_threshold() {
        let transcript = Prediction::matched(0);
        for threshold in [0.0f32, 0.7, 1.0] {
            assert_eq!(arbitrate(&transcript, &Prediction::none(), threshold), Some(0));
        }
    }
}
