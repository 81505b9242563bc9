use std::io::Cursor;
use std::path::Path;

use cpal::traits::{DeviceTrait, HostTrait};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};
use tracing::debug;

use crate::backends::AudioBuffer;
use crate::error::KokoroError;

/// Serialize a buffer into a mono, 16-bit PCM WAV container.
///
/// The header is the canonical 44-byte RIFF layout; samples are clamped
/// to [-1.0, 1.0] before conversion.
pub fn write_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, KokoroError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &buffer.samples {
            let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(value)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Write the buffer to a WAV file on disk.
pub fn save_wav(buffer: &AudioBuffer, path: &Path) -> Result<(), KokoroError> {
    let bytes = write_wav(buffer)?;
    std::fs::write(path, bytes).map_err(|source| KokoroError::Filesystem {
        path: path.to_path_buf(),
        source,
    })
}

/// Enumerate the host's audio output devices as (id, name) pairs.
/// The id is the enumeration index and is what `-d/--device` selects.
pub fn output_devices() -> Result<Vec<(usize, String)>, KokoroError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| KokoroError::Device(e.to_string()))?;

    Ok(devices
        .enumerate()
        .map(|(id, device)| {
            let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
            (id, name)
        })
        .collect())
}

/// Play the buffer through an output device, blocking until playback
/// completes. `None` selects the platform default device.
pub fn play(buffer: &AudioBuffer, device: Option<usize>) -> Result<(), KokoroError> {
    let (_stream, handle) = open_output(device)?;

    let sink = Sink::try_new(&handle).map_err(|e| KokoroError::Device(e.to_string()))?;
    debug!(
        "Playing {:.2}s of audio at {} Hz",
        buffer.duration_secs(),
        buffer.sample_rate
    );

    let source = SamplesBuffer::new(1, buffer.sample_rate, buffer.samples.clone());
    sink.append(source);
    sink.sleep_until_end();
    Ok(())
}

fn open_output(device: Option<usize>) -> Result<(OutputStream, OutputStreamHandle), KokoroError> {
    match device {
        None => OutputStream::try_default().map_err(|e| KokoroError::Device(e.to_string())),
        Some(id) => {
            let host = cpal::default_host();
            let device = host
                .output_devices()
                .map_err(|e| KokoroError::Device(e.to_string()))?
                .nth(id)
                .ok_or(KokoroError::InvalidDevice(id))?;
            OutputStream::try_from_device(&device)
                .map_err(|e| KokoroError::Device(e.to_string()))
        }
    }
}
