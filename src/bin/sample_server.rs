//! Sample chat backend for exercising the SDK.
//!
//! Echoes the last user message back, either as a single JSON
//! completion or as an NDJSON stream of per-token deltas.
//!
//! ```sh
//! sample_server 127.0.0.1:8765
//! ```

use anyhow::{Result, anyhow};
use chatproto::{
    ChatCompletion, ChatCompletionDelta, ChatMessage, ChatMessageDelta, ChatRequest, Role,
};
use std::io::Read;
use tiny_http::{Header, Method, Request, Response, Server};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8765".into());
    let server = Server::http(&addr).map_err(|e| anyhow!("failed to bind {addr}: {e}"))?;
    tracing::info!(%addr, "sample chat backend listening");

    for request in server.incoming_requests() {
        if let Err(e) = handle(request) {
            tracing::warn!(error = %e, "request failed");
        }
    }

    Ok(())
}

fn handle(mut request: Request) -> Result<()> {
    if request.method() != &Method::Post {
        let response = Response::from_string("only POST is supported").with_status_code(405);
        return Ok(request.respond(response)?);
    }

    let mut body = String::new();
    request.as_reader().read_to_string(&mut body)?;

    let chat: ChatRequest = match serde_json::from_str(&body) {
        Ok(chat) => chat,
        Err(e) => {
            tracing::debug!(error = %e, "malformed request body");
            let response =
                Response::from_string(format!("malformed request: {e}")).with_status_code(400);
            return Ok(request.respond(response)?);
        }
    };

    tracing::info!(
        messages = chat.messages.len(),
        stream = chat.stream,
        "chat request"
    );

    let reply = reply_text(&chat.messages);

    if chat.stream {
        let response = Response::from_string(streamed_body(&reply, chat.session_state))
            .with_header(header("Content-Type", "application/x-ndjson")?);
        request.respond(response)?;
    } else {
        let completion = ChatCompletion {
            message: ChatMessage::assistant(reply),
            context: None,
            session_state: chat.session_state,
        };
        let response = Response::from_string(serde_json::to_string(&completion)?)
            .with_header(header("Content-Type", "application/json")?);
        request.respond(response)?;
    }

    Ok(())
}

/// Echo reply for the conversation so far.
fn reply_text(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map_or_else(
            || "Hello! Send a message to get an echo back.".to_string(),
            |m| format!("You said: {}", m.content),
        )
}

/// Build the NDJSON body: one delta per token, role on the first line,
/// session state carried on the final line.
fn streamed_body(reply: &str, session_state: Option<serde_json::Value>) -> String {
    let mut deltas = Vec::new();

    for (i, token) in reply.split_inclusive(' ').enumerate() {
        deltas.push(ChatCompletionDelta {
            delta: ChatMessageDelta {
                role: (i == 0).then_some(Role::Assistant),
                content: Some(token.to_string()),
            },
            context: None,
            session_state: None,
        });
    }

    deltas.push(ChatCompletionDelta {
        delta: ChatMessageDelta::default(),
        context: None,
        session_state,
    });

    let mut body = String::new();
    for delta in &deltas {
        // Serialization of these types cannot fail.
        if let Ok(line) = serde_json::to_string(delta) {
            body.push_str(&line);
            body.push('\n');
        }
    }
    body
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|()| anyhow!("invalid header {name}: {value}"))
}
