use std::sync::mpsc::{sync_channel, Receiver};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use miette::{miette, Context, IntoDiagnostic, Result};

/// Captured mono PCM audio ready for transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    /// Encodes the clip as an in-memory 16-bit mono WAV file.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).into_diagnostic()?;
        for &sample in &self.samples {
            writer.write_sample(sample).into_diagnostic()?;
        }
        writer.finalize().into_diagnostic()?;

        Ok(cursor.into_inner())
    }
}

/// Pull-based source of mono PCM frames.
///
/// Elapsed time is measured in consumed samples, so capture logic behaves
/// the same against a live microphone and recorded input.
pub trait SampleSource {
    fn sample_rate(&self) -> u32;

    /// Blocks until the next frame is available. `None` means the source
    /// has ended.
    fn next_frame(&mut self) -> Option<Vec<i16>>;
}

/// Default input device, wired through cpal's stream callback.
pub struct Microphone {
    _stream: cpal::Stream,
    frames: Receiver<Vec<i16>>,
    sample_rate: u32,
}

impl Microphone {
    pub fn open() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| miette!("No default input device available"))?;
        let config = device
            .default_input_config()
            .into_diagnostic()
            .wrap_err("Could not read default input config")?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        let (tx, frames) = sync_channel::<Vec<i16>>(64);

        let stream = match config.sample_format() {
            cpal::SampleFormat::I16 => {
                let tx = tx.clone();
                device.build_input_stream(
                    &config.into(),
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        let _ = tx.try_send(downmix(data, channels));
                    },
                    |err| tracing::error!("input stream error: {err}"),
                    None,
                )
            }
            cpal::SampleFormat::F32 => {
                let tx = tx.clone();
                device.build_input_stream(
                    &config.into(),
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let data: Vec<i16> = data
                            .iter()
                            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                            .collect();
                        let _ = tx.try_send(downmix(&data, channels));
                    },
                    |err| tracing::error!("input stream error: {err}"),
                    None,
                )
            }
            format => return Err(miette!("Unsupported input sample format: {format:?}")),
        }
        .into_diagnostic()
        .wrap_err("Could not open microphone input stream")?;

        stream.play().into_diagnostic()?;

        Ok(Self {
            _stream: stream,
            frames,
            sample_rate,
        })
    }

    /// Discards frames queued while no one was listening.
    pub fn drain(&mut self) {
        while self.frames.try_recv().is_ok() {}
    }
}

impl SampleSource for Microphone {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn next_frame(&mut self) -> Option<Vec<i16>> {
        self.frames.recv_timeout(Duration::from_secs(30)).ok()
    }
}

fn downmix(data: &[i16], channels: usize) -> Vec<i16> {
    if channels <= 1 {
        return data.to_vec();
    }

    data.chunks(channels)
        .map(|frame| (frame.iter().map(|&s| s as i32).sum::<i32>() / frame.len() as i32) as i16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_encoding_carries_the_sample_rate_and_length() {
        let clip = AudioClip {
            samples: vec![0, 1000, -1000, 0],
            sample_rate: 16_000,
        };

        let wav = clip.to_wav_bytes().unwrap();
        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        let spec = reader.spec();

        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(reader.len(), 4);
    }

    #[test]
    fn downmix_averages_interleaved_channels() {
        assert_eq!(downmix(&[100, 200, -100, -200], 2), vec![150, -150]);
        assert_eq!(downmix(&[1, 2, 3], 1), vec![1, 2, 3]);
    }
}
