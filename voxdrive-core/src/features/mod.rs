//! Audio clip → fixed 60-dimensional feature vector.
//!
//! Stage order never changes: silence trim, 20 MFCCs per frame, first and
//! second order deltas, 60-row stack, time average. Whatever the clip
//! duration, the output length is [`FEATURE_DIM`].

pub mod delta;
pub mod mfcc;

use ndarray::Axis;
use tracing::{debug, warn};

pub use mfcc::{MfccFrontend, N_COEFFS};

use crate::audio::AudioClip;
use crate::error::{Result, VoxdriveError};

/// Output vector length: 20 MFCCs plus their deltas and accelerations.
pub const FEATURE_DIM: usize = 3 * N_COEFFS;

/// What to do when silence trimming removes the whole clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SilencePolicy {
    /// Reject the clip; recognition is skipped for this cycle.
    #[default]
    Reject,
    /// Analyze the untrimmed signal instead of rejecting.
    FallBackToUntrimmed,
}

pub struct FeatureExtractor {
    frontend: MfccFrontend,
    top_db: f32,
    policy: SilencePolicy,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32, top_db: f32, policy: SilencePolicy) -> Self {
        Self {
            frontend: MfccFrontend::new(sample_rate),
            top_db,
            policy,
        }
    }

    /// Sample span `[start, end)` that survives trimming, on the same frame
    /// grid as the MFCC analysis. `None` means no frame cleared the
    /// threshold (in practice: digital silence).
    pub fn trim(&self, samples: &[f32]) -> Option<(usize, usize)> {
        if samples.is_empty() {
            return None;
        }
        let half = mfcc::N_FFT / 2;
        let n_frames = samples.len() / mfcc::HOP + 1;

        // Frame RMS over the zero-padded centered grid.
        let mut rms = Vec::with_capacity(n_frames);
        for f in 0..n_frames {
            let center = f * mfcc::HOP;
            let lo = center.saturating_sub(half);
            let hi = (center + half).min(samples.len());
            let sum_sq: f32 = samples[lo..hi].iter().map(|&s| s * s).sum();
            rms.push((sum_sq / mfcc::N_FFT as f32).sqrt());
        }

        let peak = rms.iter().cloned().fold(0.0f32, f32::max);
        if peak <= 0.0 {
            return None;
        }

        // `top_db` below the peak, in amplitude terms.
        let threshold = peak * 10f32.powf(-self.top_db / 20.0);
        let first = rms.iter().position(|&r| r > threshold)?;
        let last = rms.iter().rposition(|&r| r > threshold)?;

        let start = first * mfcc::HOP;
        let end = ((last + 1) * mfcc::HOP).min(samples.len());
        Some((start, end))
    }

    /// Extract the 60-dimensional vector for one clip.
    ///
    /// # Errors
    ///
    /// `EmptyAudio` when the clip has no samples, or when trimming removes
    /// everything under [`SilencePolicy::Reject`].
    pub fn extract(&self, clip: &AudioClip) -> Result<Vec<f32>> {
        if clip.is_empty() {
            return Err(VoxdriveError::EmptyAudio);
        }

        let speech: &[f32] = match self.trim(&clip.samples) {
            Some((start, end)) => {
                debug!(
                    start,
                    end,
                    total = clip.len(),
                    "trimmed clip to the voiced span"
                );
                &clip.samples[start..end]
            }
            None => match self.policy {
                SilencePolicy::Reject => return Err(VoxdriveError::EmptyAudio),
                SilencePolicy::FallBackToUntrimmed => {
                    warn!("clip trimmed to nothing, analyzing it untrimmed");
                    &clip.samples
                }
            },
        };

        let mfcc = self.frontend.compute(speech);
        let d1 = delta::delta(&mfcc);
        let d2 = delta::delta(&d1);

        let n_frames = mfcc.ncols();
        if n_frames == 0 {
            return Err(VoxdriveError::FeatureExtraction(
                "no analysis frames produced".into(),
            ));
        }

        // Stack to 60 rows, then average each row over time.
        let mut vector = Vec::with_capacity(FEATURE_DIM);
        for block in [&mfcc, &d1, &d2] {
            for row in block.axis_iter(Axis(0)) {
                vector.push(row.sum() / n_frames as f32);
            }
        }
        debug_assert_eq!(vector.len(), FEATURE_DIM);
        Ok(vector)
    }
}
