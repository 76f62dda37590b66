//! End-to-end tests: `ChatClient` against an in-process HTTP backend.

use chatproto::{AuthConfig, ChatClient, ChatMessage, ChatOptions, Error, Role};
use futures::StreamExt;
use serde_json::json;
use std::io::Read;
use tiny_http::{Header, Request, Response, Server};
use tokio_util::sync::CancellationToken;

/// Run a handler on every request to a local server; returns the
/// endpoint URL. The server thread lives for the rest of the process.
fn serve<F>(handler: F) -> String
where
    F: Fn(Request) + Send + 'static,
{
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server.server_addr().to_ip().expect("ip listener");
    std::thread::spawn(move || {
        for request in server.incoming_requests() {
            handler(request);
        }
    });
    format!("http://{addr}/chat")
}

fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).expect("valid header")
}

fn read_body(request: &mut Request) -> String {
    let mut body = String::new();
    request
        .as_reader()
        .read_to_string(&mut body)
        .expect("read request body");
    body
}

fn respond_ndjson(request: Request, body: &str) {
    let response =
        Response::from_string(body).with_header(header("Content-Type", "application/x-ndjson"));
    let _ = request.respond(response);
}

#[tokio::test]
async fn streamed_completion_end_to_end() {
    let endpoint = serve(|mut request| {
        let body = read_body(&mut request);
        assert!(body.contains("\"stream\":true"), "body: {body}");
        respond_ndjson(
            request,
            concat!(
                "{\"delta\":{\"role\":\"assistant\",\"content\":\"Hello \"}}\n",
                "\n",
                "{\"delta\":{\"content\":\"world\"}}\n",
                "{\"delta\":{\"content\":\"!\"}}\n",
                "\n",
                "{\"delta\":{},\"sessionState\":{\"turn\":1}}\n",
            ),
        );
    });

    let client = ChatClient::new(endpoint, AuthConfig::None);
    let stream = client
        .get_streamed_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
        .await
        .expect("stream request");

    let deltas: Vec<_> = stream
        .map(|r| r.expect("delta"))
        .collect::<Vec<_>>()
        .await;

    assert_eq!(deltas.len(), 4, "blank lines yield nothing");
    assert_eq!(deltas[0].delta.role, Some(Role::Assistant));

    let text: String = deltas
        .iter()
        .filter_map(|d| d.delta.content.as_deref())
        .collect();
    assert_eq!(text, "Hello world!");
    assert_eq!(deltas[3].session_state, Some(json!({"turn": 1})));
}

#[tokio::test]
async fn streamed_final_line_without_terminator() {
    let endpoint = serve(|request| {
        respond_ndjson(
            request,
            "{\"delta\":{\"content\":\"a\"}}\n{\"delta\":{\"content\":\"b\"}}",
        );
    });

    let client = ChatClient::new(endpoint, AuthConfig::None);
    let stream = client
        .get_streamed_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
        .await
        .expect("stream request");

    let deltas: Vec<_> = stream.map(|r| r.expect("delta")).collect::<Vec<_>>().await;
    assert_eq!(deltas.len(), 2);
    assert_eq!(deltas[1].delta.content.as_deref(), Some("b"));
}

#[tokio::test]
async fn streamed_decode_error_aborts() {
    let endpoint = serve(|request| {
        respond_ndjson(
            request,
            "{\"delta\":{\"content\":\"ok\"}}\nnot json\n{\"delta\":{\"content\":\"never\"}}\n",
        );
    });

    let client = ChatClient::new(endpoint, AuthConfig::None);
    let stream = client
        .get_streamed_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
        .await
        .expect("stream request");

    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 2, "nothing after the bad line");
    assert!(items[0].is_ok());
    match &items[1] {
        Err(Error::Decode { content, .. }) => assert_eq!(content, "not json"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn streamed_cancellation() {
    let endpoint = serve(|request| {
        respond_ndjson(request, "{\"delta\":{\"content\":\"ok\"}}\n");
    });

    let cancel = CancellationToken::new();
    cancel.cancel();

    let client = ChatClient::new(endpoint, AuthConfig::None);
    let stream = client
        .get_streamed_completion(
            vec![ChatMessage::user("hi")],
            ChatOptions {
                cancel: Some(cancel),
                ..ChatOptions::default()
            },
        )
        .await
        .expect("stream request");

    let items: Vec<_> = stream.collect().await;
    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(Error::Cancelled)));
}

#[tokio::test]
async fn non_streaming_completion() {
    let endpoint = serve(|mut request| {
        let body = read_body(&mut request);
        assert!(body.contains("\"stream\":false"), "body: {body}");
        let response = Response::from_string(
            json!({
                "message": {"role": "assistant", "content": "You said: hi"},
                "sessionState": {"turn": 1},
            })
            .to_string(),
        )
        .with_header(header("Content-Type", "application/json"));
        let _ = request.respond(response);
    });

    let client = ChatClient::new(endpoint, AuthConfig::None);
    let completion = client
        .get_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
        .await
        .expect("completion");

    assert_eq!(completion.message.role, Role::Assistant);
    assert_eq!(completion.message.content, "You said: hi");
    assert_eq!(completion.session_state, Some(json!({"turn": 1})));
}

#[tokio::test]
async fn non_streaming_404_is_status_error() {
    let endpoint = serve(|request| {
        let response = Response::from_string("no such deployment").with_status_code(404);
        let _ = request.respond(response);
    });

    let client = ChatClient::new(endpoint, AuthConfig::None);
    let err = client
        .get_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
        .await
        .expect_err("404 must fail");

    match err {
        Error::HttpStatus { status, body } => {
            assert_eq!(status.as_u16(), 404);
            assert_eq!(body, "no such deployment");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_streaming_rejects_wrong_content_type() {
    let endpoint = serve(|request| {
        let response = Response::from_string("plain text reply")
            .with_header(header("Content-Type", "text/plain"));
        let _ = request.respond(response);
    });

    let client = ChatClient::new(endpoint, AuthConfig::None);
    let err = client
        .get_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
        .await
        .expect_err("must reject text/plain");

    match err {
        Error::ContentType(Some(ct)) => assert!(ct.starts_with("text/plain"), "got {ct}"),
        other => panic!("expected content type error, got {other:?}"),
    }
}

#[tokio::test]
async fn bearer_credential_is_attached() {
    let endpoint = serve(|request| {
        let authorized = request
            .headers()
            .iter()
            .any(|h| h.field.equiv("Authorization") && h.value.as_str() == "Bearer secret-token");
        if authorized {
            let response = Response::from_string(
                json!({"message": {"role": "assistant", "content": "ok"}}).to_string(),
            )
            .with_header(header("Content-Type", "application/json"));
            let _ = request.respond(response);
        } else {
            let _ = request.respond(Response::from_string("unauthorized").with_status_code(401));
        }
    });

    let client = ChatClient::new(endpoint, AuthConfig::Bearer("secret-token".into()));
    let completion = client
        .get_completion(vec![ChatMessage::user("hi")], ChatOptions::default())
        .await
        .expect("authorized request");
    assert_eq!(completion.message.content, "ok");
}
