//! Client SDK for a simple request/response and streaming
//! chat-completion HTTP protocol.
//!
//! The streaming path decodes newline-delimited JSON ([`ndjson`])
//! incrementally from the live response body, yielding one completion
//! delta per line.
//!
//! # Example
//!
//! ```ignore
//! use chatproto::{AuthConfig, ChatClient, ChatMessage, ChatOptions};
//! use futures::StreamExt;
//!
//! let client = ChatClient::new("http://localhost:8765/chat", AuthConfig::None);
//! let mut stream = client
//!     .get_streamed_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
//!     .await?;
//! while let Some(delta) = stream.next().await {
//!     if let Some(text) = delta?.delta.content {
//!         print!("{text}");
//!     }
//! }
//! ```

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod client;
pub mod error;
pub mod http;
pub mod ndjson;
pub mod types;

pub use client::ChatClient;
pub use error::{Error, Result, format_api_error};
pub use http::{AuthConfig, HttpClient, NDJSON_CONTENT_TYPES};
pub use ndjson::{NdjsonParser, ndjson_json_stream, ndjson_stream};
pub use types::{
    ChatCompletion, ChatCompletionDelta, ChatMessage, ChatMessageDelta, ChatOptions, ChatRequest,
    Role,
};
