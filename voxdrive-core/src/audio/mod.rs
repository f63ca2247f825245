//! Audio capture and clip handling.
//!
//! # Design constraints
//!
//! The cpal input callback runs on a real-time audio thread. It must not
//! block or do I/O; it downmixes to mono f32 and pushes into a lock-free
//! SPSC ring. The recorder side drains the ring, resamples to the analysis
//! rate and cuts fixed-length clips.
//!
//! # Threading note
//!
//! The stream callback is the only concurrent part of the engine.
//! Everything downstream of [`ClipRecorder::record`] is single-threaded
//! and blocking on purpose: one clip, one recognition cycle, one decision.

pub mod resample;
pub mod wav;

use ringbuf::{traits::Split, HeapRb};
pub use ringbuf::traits::{Consumer, Producer};

#[cfg(feature = "audio-cpal")]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
#[cfg(feature = "audio-cpal")]
use std::time::{Duration, Instant};

#[cfg(feature = "audio-cpal")]
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
#[cfg(feature = "audio-cpal")]
use tracing::{debug, error, info, warn};

use crate::error::Result;
#[cfg(feature = "audio-cpal")]
use crate::error::VoxdriveError;

pub type AudioProducer = ringbuf::HeapProd<f32>;
pub type AudioConsumer = ringbuf::HeapCons<f32>;

/// Ring capacity in samples. Roughly 21 s at 48 kHz, ample headroom for a
/// 2 s take even if the recorder is late to drain.
pub const RING_CAPACITY: usize = 1 << 20;

/// Build the SPSC ring connecting the audio callback to the recorder.
pub fn create_audio_ring() -> (AudioProducer, AudioConsumer) {
    HeapRb::<f32>::new(RING_CAPACITY).split()
}

/// A finished mono recording, ready for analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Mono samples in the range [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// A capture device as shown by `voxdrive devices`.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// Enumerate input devices on the default host.
#[cfg(feature = "audio-cpal")]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = match host.input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!(error = %e, "could not enumerate input devices");
            return Vec::new();
        }
    };
    devices
        .filter_map(|d| d.name().ok())
        .map(|name| DeviceInfo {
            is_default: Some(&name) == default_name.as_ref(),
            name,
        })
        .collect()
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    Vec::new()
}

/// How many capture samples go through the resampler at a time.
#[cfg(feature = "audio-cpal")]
const RECORD_CHUNK: usize = 960;

/// Recorder poll interval while the ring is empty.
#[cfg(feature = "audio-cpal")]
const POLL_SLEEP_MS: u64 = 5;

/// One-shot clip recorder over a persistent cpal input stream.
///
/// The stream runs for the recorder's whole lifetime; the `running` flag
/// gates the callback so the ring only fills while a take is in progress.
#[cfg(feature = "audio-cpal")]
pub struct ClipRecorder {
    _stream: cpal::Stream,
    consumer: AudioConsumer,
    running: Arc<AtomicBool>,
    capture_rate: u32,
    target_rate: u32,
}

#[cfg(feature = "audio-cpal")]
impl ClipRecorder {
    /// Open an input stream on `preferred` (exact device name) or the
    /// system default, capturing at the device's native rate.
    pub fn open(preferred: Option<&str>, target_rate: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = pick_device(&host, preferred)?;
        let device_name = device.name().unwrap_or_else(|_| "<unknown>".into());

        let supported = device
            .default_input_config()
            .map_err(|e| VoxdriveError::AudioDevice(format!("no default input config: {e}")))?;
        let capture_rate = supported.sample_rate().0;
        let channels = supported.channels();
        info!(
            device = %device_name,
            rate = capture_rate,
            channels,
            "opening input device"
        );

        let config: cpal::StreamConfig = supported.config();
        let (producer, consumer) = create_audio_ring();
        let running = Arc::new(AtomicBool::new(false));

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                build_input_stream::<f32>(&device, &config, producer, Arc::clone(&running), |s| s)
            }
            cpal::SampleFormat::I16 => {
                build_input_stream::<i16>(&device, &config, producer, Arc::clone(&running), |s| {
                    s as f32 / 32768.0
                })
            }
            cpal::SampleFormat::U8 => {
                build_input_stream::<u8>(&device, &config, producer, Arc::clone(&running), |s| {
                    (s as f32 - 128.0) / 128.0
                })
            }
            fmt => {
                return Err(VoxdriveError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| VoxdriveError::AudioStream(format!("failed to build input stream: {e}")))?;

        stream
            .play()
            .map_err(|e| VoxdriveError::AudioStream(format!("failed to start stream: {e}")))?;

        Ok(Self {
            _stream: stream,
            consumer,
            running,
            capture_rate,
            target_rate,
        })
    }

    /// Record one fixed-length clip at the analysis rate.
    ///
    /// Stale samples in the ring predate this take and are dropped first.
    pub fn record(&mut self, seconds: f32) -> Result<AudioClip> {
        let wanted = (seconds * self.target_rate as f32).round() as usize;
        if wanted == 0 {
            return Err(VoxdriveError::AudioStream("clip length is zero".into()));
        }

        let mut scratch = vec![0f32; 4096];
        while self.consumer.pop_slice(&mut scratch) > 0 {}

        self.running.store(true, Ordering::Release);

        let mut converter =
            resample::RateConverter::new(self.capture_rate, self.target_rate, RECORD_CHUNK)?;
        let mut samples = Vec::with_capacity(wanted);
        let deadline = Instant::now() + Duration::from_secs_f32(seconds * 4.0 + 2.0);

        while samples.len() < wanted {
            let n = self.consumer.pop_slice(&mut scratch);
            if n == 0 {
                if Instant::now() > deadline {
                    self.running.store(false, Ordering::Release);
                    return Err(VoxdriveError::AudioStream(
                        "capture stalled: no samples arriving".into(),
                    ));
                }
                std::thread::sleep(Duration::from_millis(POLL_SLEEP_MS));
                continue;
            }
            samples.extend_from_slice(&converter.process(&scratch[..n]));
        }

        self.running.store(false, Ordering::Release);
        samples.truncate(wanted);
        debug!(samples = samples.len(), rate = self.target_rate, "clip recorded");
        Ok(AudioClip::new(samples, self.target_rate))
    }
}

#[cfg(feature = "audio-cpal")]
fn pick_device(host: &cpal::Host, preferred: Option<&str>) -> Result<cpal::Device> {
    if let Some(name) = preferred {
        match host.input_devices() {
            Ok(mut devices) => {
                if let Some(device) =
                    devices.find(|d| d.name().map(|n| n == name).unwrap_or(false))
                {
                    return Ok(device);
                }
                warn!(device = name, "requested input device not found, falling back to default");
            }
            Err(e) => warn!(error = %e, "could not enumerate input devices"),
        }
    }
    if let Some(device) = host.default_input_device() {
        return Ok(device);
    }
    host.input_devices()
        .ok()
        .and_then(|mut devices| devices.next())
        .ok_or(VoxdriveError::NoDefaultInputDevice)
}

#[cfg(feature = "audio-cpal")]
fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: AudioProducer,
    running: Arc<AtomicBool>,
    to_f32: fn(T) -> f32,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + 'static,
{
    let channels = config.channels.max(1) as usize;
    let mut mix_buf: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            mix_buf.clear();
            mix_buf.extend(
                data.chunks_exact(channels)
                    .map(|frame| frame.iter().map(|&s| to_f32(s)).sum::<f32>() / channels as f32),
            );
            let written = producer.push_slice(&mix_buf);
            if written < mix_buf.len() {
                warn!("ring buffer full: dropped {} frames", mix_buf.len() - written);
            }
        },
        |err| error!("input stream error: {err}"),
        None,
    )
}

/// Stub recorder used when the crate is built without `audio-cpal`.
#[cfg(not(feature = "audio-cpal"))]
pub struct ClipRecorder;

#[cfg(not(feature = "audio-cpal"))]
impl ClipRecorder {
    pub fn open(_preferred: Option<&str>, _target_rate: u32) -> Result<Self> {
        Err(crate::error::VoxdriveError::AudioDevice(
            "voxdrive-core was built without the `audio-cpal` feature".into(),
        ))
    }

    pub fn record(&mut self, _seconds: f32) -> Result<AudioClip> {
        Err(crate::error::VoxdriveError::AudioDevice(
            "voxdrive-core was built without the `audio-cpal` feature".into(),
        ))
    }
}
