//! Completion client for an Ollama-compatible LLM server.
//!
//! Two request styles are supported:
//!
//! | Style | Endpoint | Body | Non-stream reply |
//! |-------|----------|------|------------------|
//! | completion | `/api/generate` | `{model, prompt, stream}` | `{response}` |
//! | chat | `/api/chat` | `{model, messages, stream}` | `{message: {content}}` |
//!
//! When streaming, the server sends newline-delimited JSON objects. Each
//! line contributes its `message.content` or `response` fragment; lines that
//! do not decode are skipped. The reply is the concatenation of all
//! fragments in arrival order.
//!
//! No retries. Transport errors and non-2xx statuses become
//! [`PipelineError::ServiceUnavailable`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::CompletionConfig;
use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    /// Overrides the configured model for this request.
    pub model: Option<String>,
    pub stream: bool,
}

impl CompletionOptions {
    pub fn streaming() -> Self {
        Self {
            model: None,
            stream: true,
        }
    }
}

/// Anything that can turn a prompt (or a conversation) into text.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> PipelineResult<String>;

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> PipelineResult<String>;
}

/// HTTP implementation of [`CompletionService`].
pub struct CompletionClient {
    http: reqwest::Client,
    model: String,
    endpoint: String,
    chat_endpoint: String,
}

impl CompletionClient {
    pub fn new(config: &CompletionConfig) -> PipelineResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| {
            PipelineError::InvalidConfiguration(format!("http client: {}", e))
        })?;

        Ok(Self {
            http,
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            chat_endpoint: config.chat_endpoint.clone(),
        })
    }

    fn model<'a>(&'a self, options: &'a CompletionOptions) -> &'a str {
        options.model.as_deref().unwrap_or(&self.model)
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> PipelineResult<reqwest::Response> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PipelineError::ServiceUnavailable(format!(
                "{} returned {}: {}",
                url, status, detail
            )));
        }
        Ok(response)
    }

    async fn read_stream(mut response: reqwest::Response) -> PipelineResult<String> {
        let mut acc = StreamAccumulator::default();
        while let Some(bytes) = response
            .chunk()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(format!("stream read: {}", e)))?
        {
            acc.push(&bytes);
        }
        Ok(acc.finish())
    }
}

#[derive(Deserialize)]
struct GenerateReply {
    response: String,
}

#[derive(Deserialize)]
struct ChatReply {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> PipelineResult<String> {
        let body = serde_json::json!({
            "model": self.model(options),
            "prompt": prompt,
            "stream": options.stream,
        });
        tracing::debug!(endpoint = %self.endpoint, stream = options.stream, "completion request");
        let response = self.post(&self.endpoint, &body).await?;

        if options.stream {
            return Self::read_stream(response).await;
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(format!("read body: {}", e)))?;
        let reply: GenerateReply = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;
        Ok(reply.response)
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> PipelineResult<String> {
        let body = serde_json::json!({
            "model": self.model(options),
            "messages": messages,
            "stream": options.stream,
        });
        tracing::debug!(
            endpoint = %self.chat_endpoint,
            messages = messages.len(),
            stream = options.stream,
            "chat request"
        );
        let response = self.post(&self.chat_endpoint, &body).await?;

        if options.stream {
            return Self::read_stream(response).await;
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PipelineError::ServiceUnavailable(format!("read body: {}", e)))?;
        let reply: ChatReply = serde_json::from_slice(&bytes)
            .map_err(|e| PipelineError::MalformedResponse(e.to_string()))?;
        Ok(reply.message.content)
    }
}

// ============ Streaming ============

#[derive(Deserialize)]
struct StreamLine {
    #[serde(default)]
    message: Option<MessageContent>,
    #[serde(default)]
    response: Option<String>,
}

/// Line-buffered NDJSON accumulator. Bytes may arrive split anywhere,
/// including inside a UTF-8 sequence.
#[derive(Default)]
pub struct StreamAccumulator {
    pending: Vec<u8>,
    text: String,
    skipped: usize,
}

impl StreamAccumulator {
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.consume(&line[..line.len() - 1]);
        }
    }

    /// Flush a trailing line without a newline and return the text.
    pub fn finish(mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.consume(&rest);
        if self.skipped > 0 {
            tracing::debug!(skipped = self.skipped, "ignored undecodable stream lines");
        }
        self.text
    }

    fn consume(&mut self, line: &[u8]) {
        if line.iter().all(|b| b.is_ascii_whitespace()) {
            return;
        }
        match serde_json::from_slice::<StreamLine>(line) {
            Ok(parsed) => {
                if let Some(message) = parsed.message {
                    self.text.push_str(&message.content);
                }
                if let Some(response) = parsed.response {
                    self.text.push_str(&response);
                }
            }
            Err(e) => {
                self.skipped += 1;
                tracing::debug!(error = %e, "skipping malformed stream line");
            }
        }
    }
}

/// Accumulate a complete NDJSON body.
pub fn accumulate_stream(body: &str) -> String {
    let mut acc = StreamAccumulator::default();
    acc.push(body.as_bytes());
    acc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};

    #[test]
    fn malformed_lines_are_skipped() {
        let body = "{\"message\":{\"content\":\"Hi\"}}\nnot-json\n{\"message\":{\"content\":\" there\"}}\n";
        assert_eq!(accumulate_stream(body), "Hi there");
    }

    #[test]
    fn generate_style_fragments_accumulate() {
        let body = "{\"response\":\"The \"}\n{\"response\":\"answer\",\"done\":false}\n{\"done\":true}";
        assert_eq!(accumulate_stream(body), "The answer");
    }

    #[test]
    fn split_chunks_are_reassembled() {
        let mut acc = StreamAccumulator::default();
        acc.push(b"{\"message\":{\"con");
        acc.push("tent\":\"caf\u{e9}\"}}\n{\"message\":".as_bytes());
        acc.push(b"{\"content\":\"!\"}}");
        assert_eq!(acc.finish(), "caf\u{e9}!");
    }

    #[test]
    fn empty_stream_is_empty_text() {
        assert_eq!(accumulate_stream(""), "");
        assert_eq!(accumulate_stream("\n\n"), "");
    }

    async fn generate(Json(body): Json<serde_json::Value>) -> (StatusCode, String) {
        let model = body["model"].as_str().unwrap_or_default().to_string();
        if body["stream"].as_bool().unwrap_or(false) {
            let lines = format!(
                "{{\"response\":\"[{}] \"}}\n{{\"response\":\"streamed\"}}\ngarbage\n{{\"done\":true}}\n",
                model
            );
            (StatusCode::OK, lines)
        } else {
            let prompt = body["prompt"].as_str().unwrap_or_default();
            (
                StatusCode::OK,
                serde_json::json!({ "response": format!("[{}] {}", model, prompt) }).to_string(),
            )
        }
    }

    async fn chat(Json(body): Json<serde_json::Value>) -> (StatusCode, String) {
        let count = body["messages"].as_array().map(|m| m.len()).unwrap_or(0);
        (
            StatusCode::OK,
            serde_json::json!({ "message": { "role": "assistant", "content": format!("{} messages", count) } })
                .to_string(),
        )
    }

    async fn broken() -> (StatusCode, String) {
        (StatusCode::OK, "<html>not json</html>".into())
    }

    async fn failing() -> (StatusCode, String) {
        (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded".into())
    }

    async fn mock_server() -> String {
        let app = Router::new()
            .route("/api/generate", post(generate))
            .route("/api/chat", post(chat))
            .route("/broken", post(broken))
            .route("/failing", post(failing));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(base: &str) -> CompletionClient {
        CompletionClient::new(&CompletionConfig {
            model: "llama3".into(),
            endpoint: format!("{}/api/generate", base),
            chat_endpoint: format!("{}/api/chat", base),
            timeout_secs: Some(10),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn non_streaming_completion() {
        let base = mock_server().await;
        let text = client(&base)
            .complete("hello", &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "[llama3] hello");
    }

    #[tokio::test]
    async fn model_override_is_sent() {
        let base = mock_server().await;
        let options = CompletionOptions {
            model: Some("mistral".into()),
            stream: false,
        };
        let text = client(&base).complete("hi", &options).await.unwrap();
        assert_eq!(text, "[mistral] hi");
    }

    #[tokio::test]
    async fn streaming_completion_skips_garbage() {
        let base = mock_server().await;
        let text = client(&base)
            .complete("hello", &CompletionOptions::streaming())
            .await
            .unwrap();
        assert_eq!(text, "[llama3] streamed");
    }

    #[tokio::test]
    async fn chat_sends_all_messages() {
        let base = mock_server().await;
        let messages = vec![
            ChatMessage::system("be brief"),
            ChatMessage::user("one"),
            ChatMessage::assistant("two"),
            ChatMessage::user("three"),
        ];
        let text = client(&base)
            .chat(&messages, &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "4 messages");
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed_response() {
        let base = mock_server().await;
        let mut c = client(&base);
        c.endpoint = format!("{}/broken", base);
        let err = c
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn error_status_is_service_unavailable() {
        let base = mock_server().await;
        let mut c = client(&base);
        c.endpoint = format!("{}/failing", base);
        let err = c
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        match err {
            PipelineError::ServiceUnavailable(msg) => assert!(msg.contains("500")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_service_unavailable() {
        let c = client("http://127.0.0.1:1");
        let err = c
            .complete("x", &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
    }
}
