pub use crate::audio::{AudioClip, Microphone, SampleSource};
pub use crate::capture::capture;
pub use crate::listen::{listen, ListenConfig, ListenError};
pub use crate::recognize::{HttpRecognizer, RecognizeError, Recognizer};

mod audio;
mod capture;
mod listen;
mod recognize;
