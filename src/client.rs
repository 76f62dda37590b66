//! Chat protocol client.

use crate::error::Error;
use crate::http::{AuthConfig, HttpClient};
use crate::ndjson;
use crate::types::{ChatCompletion, ChatCompletionDelta, ChatMessage, ChatOptions, ChatRequest};
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::HeaderMap;

/// Client for a chat completion endpoint.
///
/// One logical request per call; retry policy, pooling, and TLS belong
/// to the underlying reqwest stack.
#[derive(Debug)]
pub struct ChatClient {
    http: HttpClient,
}

impl ChatClient {
    /// Create a client for the given completion endpoint URL.
    pub fn new(endpoint: impl Into<String>, auth: AuthConfig) -> Self {
        Self {
            http: HttpClient::new(endpoint, auth),
        }
    }

    /// Attach extra default headers to every request.
    #[must_use]
    pub fn with_extra_headers(self, extra: HeaderMap) -> Self {
        Self {
            http: self.http.with_extra_headers(extra),
        }
    }

    /// Request a complete (non-streaming) chat completion.
    pub async fn get_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<ChatCompletion, Error> {
        let request = ChatRequest {
            messages,
            stream: false,
            context: options.context,
            session_state: options.session_state,
        };

        tracing::debug!(messages = request.messages.len(), "chat completion request");

        self.http.post_json("", &request).await
    }

    /// Request a streamed chat completion.
    ///
    /// Yields one [`ChatCompletionDelta`] per NDJSON line of the
    /// response, in arrival order. The stream is finite and not
    /// restartable; dropping it releases the connection. Supplying
    /// [`ChatOptions::cancel`] lets the caller abort mid-stream.
    pub async fn get_streamed_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> Result<BoxStream<'static, Result<ChatCompletionDelta, Error>>, Error> {
        let request = ChatRequest {
            messages,
            stream: true,
            context: options.context,
            session_state: options.session_state,
        };

        tracing::debug!(
            messages = request.messages.len(),
            "streamed chat completion request"
        );

        let bytes = self.http.post_stream("", &request).await?;
        Ok(ndjson::ndjson_json_stream(bytes, options.cancel).boxed())
    }
}
