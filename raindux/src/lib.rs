use miette::Result;

pub use crate::ollama::chat::{ChatMessage, ChatRequest, ResponseStream, Role};
pub use crate::ollama::{Client as OllamaClient, Config};
pub use crate::prompt::{compose, SYSTEM_PROMPT};

mod ollama;
mod prompt;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Opens a streaming reply for a single already-normalized user message.
///
/// The returned stream is lazy: fragments are fetched from the inference
/// service one pull at a time. Opening the stream fails if the service
/// cannot be reached or rejects the request; once open, failures surface as
/// a final diagnostic fragment instead.
pub async fn stream_response(query: &str) -> Result<ResponseStream> {
    let config = Config::from_env();
    let client = config.client()?;

    let conversation = compose(query);
    let request = ChatRequest::streaming(config.model(), conversation);

    client.chat_stream(request).await
}
