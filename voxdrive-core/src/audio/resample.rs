//! Sample-rate conversion between the capture rate and the analysis rate.
//!
//! Thin wrapper around rubato's `FastFixedIn` that accumulates input into
//! fixed chunks. Polynomial interpolation is plenty for speech; the MFCC
//! frontend only looks below 8 kHz anyway.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::warn;

use crate::error::{Result, VoxdriveError};

pub struct RateConverter {
    /// None when source and target rates match (pure passthrough).
    inner: Option<FastFixedIn<f32>>,
    pending: Vec<f32>,
    scratch: Vec<Vec<f32>>,
    chunk: usize,
}

impl RateConverter {
    pub fn new(source_rate: u32, target_rate: u32, chunk: usize) -> Result<Self> {
        if source_rate == target_rate {
            return Ok(Self {
                inner: None,
                pending: Vec::new(),
                scratch: Vec::new(),
                chunk,
            });
        }
        let ratio = target_rate as f64 / source_rate as f64;
        let inner = FastFixedIn::<f32>::new(ratio, 1.0, PolynomialDegree::Septic, chunk, 1)
            .map_err(|e| VoxdriveError::AudioStream(format!("failed to create resampler: {e}")))?;
        let scratch = inner.output_buffer_allocate(true);
        Ok(Self {
            inner: Some(inner),
            pending: Vec::new(),
            scratch,
            chunk,
        })
    }

    /// Feed samples in; get whatever full chunks produced out.
    ///
    /// Input shorter than one chunk is held until enough accumulates, so a
    /// single call may legitimately return nothing.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(inner) = self.inner.as_mut() else {
            return samples.to_vec();
        };

        self.pending.extend_from_slice(samples);
        let mut out = Vec::new();
        let mut offset = 0;
        while self.pending.len() - offset >= self.chunk {
            let block = &self.pending[offset..offset + self.chunk];
            match inner.process_into_buffer(&[block], &mut self.scratch, None) {
                Ok((_, produced)) => out.extend_from_slice(&self.scratch[0][..produced]),
                Err(e) => warn!(error = %e, "resampler chunk failed, dropping block"),
            }
            offset += self.chunk;
        }
        self.pending.drain(..offset);
        out
    }
}

/// Resample a whole buffer in one call.
///
/// Returns exactly `len * target / source` frames; the converter's partial
/// tail is flushed with silence so no audio at the end is lost.
pub fn resample_all(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }
    let chunk = 1024;
    let mut converter = RateConverter::new(source_rate, target_rate, chunk)?;
    let expected = (samples.len() as u64 * target_rate as u64 / source_rate as u64) as usize;
    let mut out = converter.process(samples);
    let silence = vec![0f32; chunk];
    while out.len() < expected {
        let more = converter.process(&silence);
        if more.is_empty() {
            break;
        }
        out.extend_from_slice(&more);
    }
    out.truncate(expected);
    Ok(out)
}
