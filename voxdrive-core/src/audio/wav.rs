//! WAV file I/O for dataset takes and clip uploads.
//!
//! Readers accept whatever hound can parse (float or integer PCM, any
//! channel count or rate) and normalize to mono f32 at the requested rate.
//! Writers always emit 16-bit mono PCM, which is what both the training
//! tooling and the transcription endpoint expect.

use std::io::Cursor;
use std::path::Path;

use crate::audio::{resample, AudioClip};
use crate::error::{Result, VoxdriveError};

/// Load a WAV file as a mono clip at `target_rate`.
pub fn load_clip(path: &Path, target_rate: u32) -> Result<AudioClip> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| VoxdriveError::Wav(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| VoxdriveError::Wav(format!("{}: {e}", path.display())))?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample <= 16 {
                reader
                    .samples::<i16>()
                    .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| VoxdriveError::Wav(format!("{}: {e}", path.display())))?
            } else {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| VoxdriveError::Wav(format!("{}: {e}", path.display())))?
            }
        }
    };

    let channels = spec.channels.max(1) as usize;
    let mono: Vec<f32> = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    let samples = resample::resample_all(&mono, spec.sample_rate, target_rate)?;
    Ok(AudioClip::new(samples, target_rate))
}

/// Write a clip as 16-bit mono PCM.
pub fn save_clip(path: &Path, clip: &AudioClip) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut writer = hound::WavWriter::create(path, pcm16_spec(clip.sample_rate))
        .map_err(|e| VoxdriveError::Wav(format!("{}: {e}", path.display())))?;
    write_samples(&mut writer, &clip.samples)
        .map_err(|e| VoxdriveError::Wav(format!("{}: {e}", path.display())))?;
    writer
        .finalize()
        .map_err(|e| VoxdriveError::Wav(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Encode a clip as an in-memory 16-bit mono PCM WAV, ready for upload.
pub fn encode_wav(clip: &AudioClip) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, pcm16_spec(clip.sample_rate))
            .map_err(|e| VoxdriveError::Wav(format!("encode: {e}")))?;
        write_samples(&mut writer, &clip.samples)
            .map_err(|e| VoxdriveError::Wav(format!("encode: {e}")))?;
        writer
            .finalize()
            .map_err(|e| VoxdriveError::Wav(format!("encode: {e}")))?;
    }
    Ok(cursor.into_inner())
}

fn pcm16_spec(sample_rate: u32) -> hound::WavSpec {
    hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

fn write_samples<W>(
    writer: &mut hound::WavWriter<W>,
    samples: &[f32],
) -> std::result::Result<(), hound::Error>
where
    W: std::io::Write + std::io::Seek,
{
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value)?;
    }
    Ok(())
}
