//! HTTP client wrapper for chat protocol requests.

use super::{HTTP_CONNECT_TIMEOUT, HTTP_TIMEOUT, NDJSON_CONTENT_TYPES};
use crate::error::Error;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};

/// Authentication configuration.
#[derive(Clone)]
pub enum AuthConfig {
    /// No credential attached (local or pre-authenticated backends).
    None,
    /// Bearer token authentication (Authorization: Bearer {token}).
    Bearer(String),
    /// Custom header authentication (e.g., x-api-key: {key}).
    ApiKey { header: String, key: String },
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
            Self::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .field("key", &"[REDACTED]")
                .finish(),
        }
    }
}

/// HTTP client for the chat completion endpoint.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth: AuthConfig,
}

impl HttpClient {
    /// Create a new HTTP client for the given endpoint.
    pub fn new(base_url: impl Into<String>, auth: AuthConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into(),
            auth,
        }
    }

    /// Build headers including authentication.
    fn build_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &self.auth {
            AuthConfig::None => {}
            AuthConfig::Bearer(token) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                    Error::Config("Bearer token contains invalid header characters".into())
                })?;
                headers.insert(AUTHORIZATION, value);
            }
            AuthConfig::ApiKey { header, key } => {
                let name = reqwest::header::HeaderName::try_from(header.as_str())
                    .map_err(|_| Error::Config("API key header name is invalid".into()))?;
                let value = HeaderValue::from_str(key).map_err(|_| {
                    Error::Config("API key contains invalid header characters".into())
                })?;
                headers.insert(name, value);
            }
        }

        Ok(headers)
    }

    /// Make a POST request with JSON body and deserialize the single
    /// JSON document in the response.
    ///
    /// Any non-2xx status is terminal: the body is captured for
    /// diagnosis, never parsed as a completion. A 2xx response without
    /// a JSON content type is rejected before parsing.
    pub async fn post_json<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, Error> {
        let url = format!("{}{path}", self.base_url);
        let mut headers = self.build_headers()?;
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus { status, body });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        if !content_type
            .as_deref()
            .is_some_and(|ct| media_type(ct).eq_ignore_ascii_case("application/json"))
        {
            return Err(Error::ContentType(content_type));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| Error::Decode {
            content: text,
            source,
        })
    }

    /// Make a POST request for a streaming NDJSON response.
    ///
    /// Sets `Accept` to the NDJSON content types. On success, returns
    /// the raw body byte stream; dropping it releases the connection.
    pub async fn post_stream<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<BoxStream<'static, Result<Bytes, reqwest::Error>>, Error> {
        let url = format!("{}{path}", self.base_url);
        let mut headers = self.build_headers()?;
        headers.insert(ACCEPT, ndjson_accept_value());

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::HttpStatus { status, body });
        }

        Ok(response.bytes_stream().boxed())
    }

    /// Add extra headers to subsequent requests.
    /// Returns a new client with additional default headers.
    #[must_use]
    pub fn with_extra_headers(self, extra: HeaderMap) -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .default_headers(extra)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: self.base_url,
            auth: self.auth,
        }
    }
}

/// Strip parameters (`; charset=...`) from a `Content-Type` value.
pub(crate) fn media_type(value: &str) -> &str {
    value.split(';').next().unwrap_or(value).trim()
}

/// `Accept` header listing every NDJSON content type.
fn ndjson_accept_value() -> HeaderValue {
    HeaderValue::from_str(&NDJSON_CONTENT_TYPES.join(", "))
        .unwrap_or_else(|_| HeaderValue::from_static("application/x-ndjson"))
}
