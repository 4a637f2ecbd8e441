use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

use crate::audio::{AudioClip, SampleSource};

// Ambient RMS is scaled by this ratio to pick the speech threshold; the
// floor keeps near-silent rooms from triggering on noise.
const ENERGY_RATIO: f64 = 1.5;
const ENERGY_FLOOR: f64 = 300.0;

#[derive(Debug, Clone)]
pub struct ListenConfig {
    pub ambient_calibration: Duration,
    pub timeout: Duration,
    pub pause_threshold: Duration,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            ambient_calibration: Duration::from_secs(5),
            timeout: Duration::from_secs(5),
            pause_threshold: Duration::from_secs(1),
        }
    }
}

#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ListenError {
    #[error("No speech detected within {0} seconds.")]
    NoSpeech(u64),
    #[error("Audio input ended unexpectedly.")]
    SourceClosed,
}

/// Records one utterance from the source.
///
/// First samples the ambient noise level to pick an energy threshold, then
/// waits for speech until the timeout elapses and records it until a pause
/// of the configured length.
pub fn listen(
    source: &mut dyn SampleSource,
    config: &ListenConfig,
) -> Result<AudioClip, ListenError> {
    let sample_rate = source.sample_rate();
    let calibration_samples = duration_samples(config.ambient_calibration, sample_rate);
    let timeout_samples = duration_samples(config.timeout, sample_rate);
    let pause_samples = duration_samples(config.pause_threshold, sample_rate);

    let mut ambient: Vec<i16> = Vec::with_capacity(calibration_samples);
    while ambient.len() < calibration_samples {
        match source.next_frame() {
            Some(frame) => ambient.extend(frame),
            None => return Err(ListenError::SourceClosed),
        }
    }
    let threshold = (rms(&ambient) * ENERGY_RATIO).max(ENERGY_FLOOR);
    tracing::debug!("calibration complete, energy threshold {threshold:.1}");

    let mut waited = 0usize;
    let mut captured: Vec<i16> = Vec::new();
    let mut silence_run = 0usize;
    let mut speaking = false;

    loop {
        let frame = match source.next_frame() {
            Some(frame) => frame,
            None if speaking => break,
            None => return Err(ListenError::SourceClosed),
        };

        let loud = rms(&frame) >= threshold;

        if !speaking {
            if loud {
                speaking = true;
                captured.extend(&frame);
            } else {
                waited += frame.len();
                if waited >= timeout_samples {
                    return Err(ListenError::NoSpeech(config.timeout.as_secs()));
                }
            }
            continue;
        }

        captured.extend(&frame);
        if loud {
            silence_run = 0;
        } else {
            silence_run += frame.len();
            if silence_run >= pause_samples {
                break;
            }
        }
    }

    Ok(AudioClip {
        samples: captured,
        sample_rate,
    })
}

fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

fn duration_samples(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * sample_rate as f64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    // 800 Hz keeps the synthetic clips small; frames are 0.1 s each.
    const RATE: u32 = 800;
    const FRAME: usize = 80;

    struct ScriptedSource {
        frames: std::collections::VecDeque<Vec<i16>>,
    }

    impl ScriptedSource {
        fn new(script: &[(usize, i16)]) -> Self {
            let mut frames = std::collections::VecDeque::new();
            for &(count, amplitude) in script {
                for _ in 0..count {
                    frames.push_back(vec![amplitude; FRAME]);
                }
            }
            Self { frames }
        }
    }

    impl SampleSource for ScriptedSource {
        fn sample_rate(&self) -> u32 {
            RATE
        }

        fn next_frame(&mut self) -> Option<Vec<i16>> {
            self.frames.pop_front()
        }
    }

    #[test]
    fn silence_times_out_with_the_documented_message() {
        // 5 s of calibration audio, then 5 s of silence and nothing more.
        let mut source = ScriptedSource::new(&[(50, 0), (50, 0)]);

        let err = listen(&mut source, &ListenConfig::default()).unwrap_err();
        assert_eq!(err, ListenError::NoSpeech(5));
        assert_eq!(err.to_string(), "No speech detected within 5 seconds.");
    }

    #[test]
    fn speech_is_recorded_until_a_pause() {
        // Calibration, a short silent lead-in, 2 s of speech, then silence.
        let mut source = ScriptedSource::new(&[(50, 0), (5, 0), (20, 3000), (30, 0)]);

        let clip = listen(&mut source, &ListenConfig::default()).unwrap();
        assert_eq!(clip.sample_rate, RATE);
        // 20 speech frames plus the 1 s pause tail.
        assert_eq!(clip.samples.len(), (20 + 10) * FRAME);
        assert_eq!(clip.samples[0], 3000);
    }

    #[test]
    fn source_ending_mid_speech_still_yields_the_clip() {
        let mut source = ScriptedSource::new(&[(50, 0), (8, 3000)]);

        let clip = listen(&mut source, &ListenConfig::default()).unwrap();
        assert_eq!(clip.samples.len(), 8 * FRAME);
    }

    #[test]
    fn source_ending_before_speech_is_an_error() {
        let mut source = ScriptedSource::new(&[(50, 0), (2, 0)]);

        let err = listen(&mut source, &ListenConfig::default()).unwrap_err();
        assert_eq!(err, ListenError::SourceClosed);
    }
}
