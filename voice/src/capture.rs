use shared::TranscriptionResult;

use crate::audio::SampleSource;
use crate::listen::{listen, ListenConfig};
use crate::recognize::Recognizer;

/// Records one utterance and transcribes it.
///
/// Failures come back as `Failed` with a readable reason so the caller can
/// retry the capture instead of aborting the session.
pub async fn capture<R: Recognizer>(
    recognizer: &R,
    source: &mut dyn SampleSource,
    config: &ListenConfig,
) -> TranscriptionResult {
    let clip = match listen(source, config) {
        Ok(clip) => clip,
        Err(err) => {
            return TranscriptionResult::Failed {
                error: err.to_string(),
            }
        }
    };

    match recognizer.recognize(&clip).await {
        Ok(text) => TranscriptionResult::Recognized { text },
        Err(err) => TranscriptionResult::Failed {
            error: err.to_string(),
        },
    }
}
