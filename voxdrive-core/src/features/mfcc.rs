//! 20-coefficient MFCC frontend.
//!
//! Per frame: reflect-padded centered window → Hann → 2048-point power
//! spectrum → 128-band Slaney mel filterbank → peak-referenced dB (1e-10
//! floor, 80 dB range) → orthonormal DCT-II → first 20 coefficients.
//!
//! | Parameter    | Value      |
//! |--------------|------------|
//! | FFT size     | 2048       |
//! | Hop length   | 512        |
//! | Mel bands    | 128        |
//! | Mel range    | 0 – sr/2   |
//! | Coefficients | 20         |

use std::sync::Arc;

use ndarray::Array2;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

pub const N_FFT: usize = 2048;
pub const HOP: usize = 512;
pub const N_MELS: usize = 128;
pub const N_COEFFS: usize = 20;

const N_FREQS: usize = N_FFT / 2 + 1;
const AMIN: f32 = 1e-10;
const TOP_DB_RANGE: f32 = 80.0;

pub struct MfccFrontend {
    window: Vec<f32>,
    mel_filters: Array2<f32>,
    dct_basis: Array2<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl MfccFrontend {
    pub fn new(sample_rate: u32) -> Self {
        let fmax = sample_rate as f32 / 2.0;
        Self {
            window: build_hann_window(N_FFT),
            mel_filters: build_mel_filters(N_FFT, sample_rate, N_MELS, 0.0, fmax),
            dct_basis: build_dct_basis(N_COEFFS, N_MELS),
            fft: FftPlanner::<f32>::new().plan_fft_forward(N_FFT),
        }
    }

    /// MFCC matrix: `N_COEFFS` rows, one column per frame. Frame count is
    /// `len / HOP + 1` (centered framing).
    pub fn compute(&self, samples: &[f32]) -> Array2<f32> {
        if samples.is_empty() {
            return Array2::zeros((N_COEFFS, 0));
        }

        let n_frames = samples.len() / HOP + 1;
        let padded = reflect_pad(samples, N_FFT / 2);

        let mut fft_buf = vec![Complex::new(0.0f32, 0.0); N_FFT];
        let mut power = Array2::<f32>::zeros((N_FREQS, n_frames));
        for frame in 0..n_frames {
            let start = frame * HOP;
            for (i, slot) in fft_buf.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * self.window[i], 0.0);
            }
            self.fft.process(&mut fft_buf);
            for (k, value) in fft_buf.iter().enumerate().take(N_FREQS) {
                power[[k, frame]] = value.norm_sqr();
            }
        }

        let mut mel = self.mel_filters.dot(&power);

        // Peak-referenced dB. The reference element lands at 0 dB, so the
        // range clamp floors everything at -80 dB.
        let peak = mel.iter().fold(AMIN, |acc, &v| acc.max(v));
        let log_ref = 10.0 * peak.log10();
        mel.mapv_inplace(|v| (10.0 * v.max(AMIN).log10() - log_ref).max(-TOP_DB_RANGE));

        self.dct_basis.dot(&mel)
    }
}

pub(crate) fn build_hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Slaney-style triangular mel filterbank (area-normalized),
/// `n_mels × (fft_size / 2 + 1)`.
fn build_mel_filters(
    fft_size: usize,
    sample_rate: u32,
    n_mels: usize,
    fmin: f32,
    fmax: f32,
) -> Array2<f32> {
    let n_freqs = fft_size / 2 + 1;
    let mel_min = hz_to_mel(fmin);
    let mel_max = hz_to_mel(fmax);

    // n_mels + 2 evenly spaced mel points define the triangle corners.
    let hz_points: Vec<f32> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let bin_width = sample_rate as f32 / fft_size as f32;
    let mut filters = Array2::<f32>::zeros((n_mels, n_freqs));
    for m in 0..n_mels {
        let lower = hz_points[m];
        let center = hz_points[m + 1];
        let upper = hz_points[m + 2];
        let enorm = 2.0 / (upper - lower).max(AMIN);
        for k in 0..n_freqs {
            let freq = k as f32 * bin_width;
            let up = (freq - lower) / (center - lower).max(AMIN);
            let down = (upper - freq) / (upper - center).max(AMIN);
            let weight = up.min(down);
            if weight > 0.0 {
                filters[[m, k]] = weight * enorm;
            }
        }
    }
    filters
}

fn hz_to_mel(freq: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f32.ln() / 27.0;
    if freq >= min_log_hz {
        min_log_mel + (freq / min_log_hz).ln() / logstep
    } else {
        freq / f_sp
    }
}

fn mel_to_hz(mel: f32) -> f32 {
    let f_sp = 200.0 / 3.0;
    let min_log_hz = 1000.0;
    let min_log_mel = min_log_hz / f_sp;
    let logstep = 6.4f32.ln() / 27.0;
    if mel >= min_log_mel {
        min_log_hz * (logstep * (mel - min_log_mel)).exp()
    } else {
        f_sp * mel
    }
}

/// Orthonormal DCT-II rows: `n_coeffs × n_mels`.
fn build_dct_basis(n_coeffs: usize, n_mels: usize) -> Array2<f32> {
    let mut basis = Array2::<f32>::zeros((n_coeffs, n_mels));
    let scale0 = (1.0 / n_mels as f32).sqrt();
    let scale = (2.0 / n_mels as f32).sqrt();
    for c in 0..n_coeffs {
        let s = if c == 0 { scale0 } else { scale };
        for m in 0..n_mels {
            basis[[c, m]] = s
                * (std::f32::consts::PI * c as f32 * (2.0 * m as f32 + 1.0)
                    / (2.0 * n_mels as f32))
                    .cos();
        }
    }
    basis
}

/// Pad both edges by boundary reflection, librosa-style.
fn reflect_pad(samples: &[f32], pad: usize) -> Vec<f32> {
    let len = samples.len();
    let mut padded = Vec::with_capacity(len + 2 * pad);
    if len == 0 {
        padded.resize(2 * pad, 0.0);
        return padded;
    }
    if len == 1 {
        padded.resize(2 * pad + 1, samples[0]);
        return padded;
    }
    for i in 0..pad {
        padded.push(samples[reflect_index(pad - i, len)]);
    }
    padded.extend_from_slice(samples);
    for i in 1..=pad {
        padded.push(samples[reflect_index(len - 1 + i, len)]);
    }
    padded
}

/// Map an out-of-range index back into `[0, len)` by reflection.
fn reflect_index(i: usize, len: usize) -> usize {
    let period = 2 * (len - 1);
    let idx = i % period;
    if idx >= len {
        period - idx
    } else {
        idx
    }
}
