use std::convert::Infallible;
use std::io;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt, TryStreamExt};
use miette::{bail, Context, IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio_util::io::StreamReader;

use super::Client;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

impl ChatRequest {
    pub fn streaming(model: &str, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.to_string(),
            messages,
            stream: true,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Debug, Clone)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Client {
    /// Opens a streaming chat completion against the inference service.
    ///
    /// Failing here is still "clean": no response bytes have been produced,
    /// so callers can turn the error into a status-coded reply.
    pub async fn chat_stream(&self, request: ChatRequest) -> Result<ResponseStream> {
        let response = self
            .http
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await
            .into_diagnostic()
            .wrap_err("Could not reach the inference service")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!(
                "Inference request failed with status {status}: {detail}. \
                 Ensure the '{model}' model is available and Ollama is running",
                model = request.model,
            );
        }

        let body = response
            .bytes_stream()
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
            .boxed();

        Ok(ResponseStream::new(body, request.model))
    }
}

/// Lazy, pull-based sequence of text fragments from one inference call.
///
/// Fragments arrive in generation order and, concatenated, form the full
/// reply. The sequence is finite and not restartable. After the transport
/// has started delivering fragments an error can no longer be raised, so
/// any failure is folded into the sequence as one final human-readable
/// diagnostic fragment.
pub struct ResponseStream {
    lines: Lines<BufReader<StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>>>,
    model: String,
    finished: bool,
}

impl ResponseStream {
    pub(crate) fn new(body: BoxStream<'static, io::Result<Bytes>>, model: String) -> Self {
        Self {
            lines: BufReader::new(StreamReader::new(body)).lines(),
            model,
            finished: false,
        }
    }

    /// Pulls the next non-empty text fragment, blocking on the backend.
    ///
    /// Returns `None` once the reply is complete. Empty increments carry no
    /// content and are skipped.
    pub async fn next_fragment(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(err) => return Some(self.fail_unexpected(&err.to_string())),
            };

            if line.trim().is_empty() {
                continue;
            }

            let chunk: ChatChunk = match serde_json::from_str(&line) {
                Ok(chunk) => chunk,
                Err(err) => return Some(self.fail_unexpected(&err.to_string())),
            };

            if let Some(error) = chunk.error {
                self.finished = true;
                let message = format!(
                    "ERROR: The inference backend reported a failure. \
                     Ensure the '{}' model is available and Ollama is running: {error}",
                    self.model,
                );
                tracing::error!("{message}");
                return Some(message);
            }

            if let Some(message) = chunk.message {
                if !message.content.is_empty() {
                    return Some(message.content);
                }
            }

            if chunk.done {
                self.finished = true;
                return None;
            }
        }
    }

    /// Adapts the fragment sequence into a byte stream for the transport,
    /// preserving strict pull order.
    pub fn into_byte_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send {
        futures::stream::unfold(self, |mut fragments| async move {
            fragments
                .next_fragment()
                .await
                .map(|fragment| (Ok(Bytes::from(fragment)), fragments))
        })
    }

    fn fail_unexpected(&mut self, detail: &str) -> String {
        self.finished = true;
        let message = format!("An unexpected error occurred: {detail}");
        tracing::error!("{message}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(chunks: Vec<io::Result<Bytes>>) -> ResponseStream {
        ResponseStream::new(futures::stream::iter(chunks).boxed(), "tinyllama".to_string())
    }

    fn stream_from_ndjson(body: &'static str) -> ResponseStream {
        stream_of(vec![Ok(Bytes::from_static(body.as_bytes()))])
    }

    async fn collect(stream: &mut ResponseStream) -> Vec<String> {
        let mut fragments = Vec::new();
        while let Some(fragment) = stream.next_fragment().await {
            fragments.push(fragment);
        }
        fragments
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let message = ChatMessage::user("hello");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value, serde_json::json!({"role": "user", "content": "hello"}));
    }

    #[tokio::test]
    async fn fragments_arrive_in_order_and_reassemble() {
        let mut stream = stream_from_ndjson(concat!(
            r#"{"message":{"role":"assistant","content":"A sore "},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"throat can "},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"be soothed."},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
            "\n",
        ));

        let fragments = collect(&mut stream).await;
        assert_eq!(fragments, ["A sore ", "throat can ", "be soothed."]);
        assert_eq!(fragments.concat(), "A sore throat can be soothed.");
    }

    #[tokio::test]
    async fn empty_increments_are_dropped() {
        let mut stream = stream_from_ndjson(concat!(
            r#"{"message":{"role":"assistant","content":""},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"hi"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":""},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"there"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
            "\n",
        ));

        assert_eq!(collect(&mut stream).await, ["hi", "there"]);
    }

    #[tokio::test]
    async fn error_frame_terminates_with_one_diagnostic() {
        let mut stream = stream_from_ndjson(concat!(
            r#"{"message":{"role":"assistant","content":"first"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"second"},"done":false}"#,
            "\n",
            r#"{"error":"model 'tinyllama' not found"}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"never delivered"},"done":false}"#,
            "\n",
        ));

        let fragments = collect(&mut stream).await;
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0], "first");
        assert_eq!(fragments[1], "second");
        assert!(fragments[2].contains("model 'tinyllama' not found"));
        assert!(fragments[2].contains("Ollama is running"));

        assert_eq!(stream.next_fragment().await, None);
    }

    #[tokio::test]
    async fn malformed_frame_terminates_with_one_diagnostic() {
        let mut stream = stream_from_ndjson(concat!(
            r#"{"message":{"role":"assistant","content":"ok"},"done":false}"#,
            "\n",
            "this is not json\n",
        ));

        let fragments = collect(&mut stream).await;
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], "ok");
        assert!(fragments[1].starts_with("An unexpected error occurred:"));
    }

    #[tokio::test]
    async fn transport_failure_terminates_with_one_diagnostic() {
        let mut stream = stream_of(vec![
            Ok(Bytes::from_static(
                b"{\"message\":{\"role\":\"assistant\",\"content\":\"partial\"},\"done\":false}\n",
            )),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
        ]);

        let fragments = collect(&mut stream).await;
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0], "partial");
        assert!(fragments[1].starts_with("An unexpected error occurred:"));
    }

    #[tokio::test]
    async fn byte_stream_preserves_fragment_order() {
        let stream = stream_from_ndjson(concat!(
            r#"{"message":{"role":"assistant","content":"one "},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":"two"},"done":true}"#,
            "\n",
        ));

        let bytes: Vec<Bytes> = stream
            .into_byte_stream()
            .map(|chunk| chunk.unwrap())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(bytes, [Bytes::from("one "), Bytes::from("two")]);
    }
}
