//! WAV file reading and writing.

use crate::{Error, Result};
use hms_model::CalibratedSignal;
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;
use tracing::debug;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

impl From<hound::WavSpec> for WavFormat {
    fn from(spec: hound::WavSpec) -> Self {
        match spec.sample_format {
            SampleFormat::Float => WavFormat::IeeeFloat,
            SampleFormat::Int => WavFormat::Pcm,
        }
    }
}

fn info_from_reader<R: std::io::Read>(reader: &WavReader<R>) -> WavInfo {
    let spec = reader.spec();
    let num_frames = u64::from(reader.duration());
    WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs: num_frames as f64 / f64::from(spec.sample_rate),
        format: WavFormat::from(spec),
    }
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    Ok(info_from_reader(&reader))
}

/// WAV file specification for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample; 32 writes IEEE float, anything else PCM.
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read a WAV file as interleaved samples normalized to [-1, 1].
///
/// Integer PCM of any bit depth is divided by its full-scale value; float
/// files are passed through.
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<(Vec<f64>, WavInfo)> {
    let reader = WavReader::open(path)?;
    let info = info_from_reader(&reader);

    let samples: Vec<f64> = match info.format {
        WavFormat::IeeeFloat => reader
            .into_samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<std::result::Result<Vec<_>, _>>()?,
        WavFormat::Pcm => {
            let full_scale = f64::from(1u32 << (info.bits_per_sample - 1));
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| f64::from(v) / full_scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    Ok((samples, info))
}

/// Write interleaved samples in [-1, 1] to a WAV file.
///
/// PCM output is clamped to the integer range of the bit depth.
pub fn write_wav<P: AsRef<Path>>(path: P, samples: &[f64], spec: WavSpec) -> Result<()> {
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;

    if spec.bits_per_sample == 32 {
        for &sample in samples {
            writer.write_sample(sample as f32)?;
        }
    } else {
        let full_scale = f64::from(1u32 << (spec.bits_per_sample - 1));
        for &sample in samples {
            let int_sample = (sample * full_scale).round().clamp(-full_scale, full_scale - 1.0);
            writer.write_sample(int_sample as i32)?;
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Load a WAV file as a mono [`CalibratedSignal`].
///
/// Channels are averaged; `calibration` converts normalized full scale to
/// pascal.
pub fn load_signal<P: AsRef<Path>>(path: P, calibration: f64) -> Result<CalibratedSignal> {
    let path = path.as_ref();
    let (samples, info) = read_wav(path)?;
    if info.num_frames == 0 || samples.is_empty() {
        return Err(Error::Empty);
    }

    debug!(
        path = %path.display(),
        channels = info.channels,
        sample_rate = info.sample_rate,
        frames = info.num_frames,
        "loaded wav"
    );

    let signal = CalibratedSignal::from_interleaved(
        &samples,
        usize::from(info.channels),
        f64::from(info.sample_rate),
    )?;
    Ok(signal.with_calibration(calibration)?)
}
