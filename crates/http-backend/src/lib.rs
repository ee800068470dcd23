//! A support backend speaking the HTTP/JSON session protocol.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, RequestBuilder, Response, Url, header};
use serde::de::DeserializeOwned;
use serde_json::Value;
use support_chat_protocol::{
    Backend, BackendError, ErrorKind, Escalation, Reply, SessionId,
};

pub use config::{DEFAULT_BASE_URL, HttpBackendConfig, HttpBackendConfigBuilder};
pub use proto::{Health, HistoryEntry};
use proto::{CreateSessionResponse, MessageRequest, MessageResponse};

/// Error type for [`HttpBackend`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {}

impl BackendError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_status() {
            ErrorKind::Status
        } else if err.is_decode() {
            ErrorKind::InvalidResponse
        } else {
            ErrorKind::Network
        };
        Self::new(format!("{err}"), kind)
    }
}

/// Support backend reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    config: Arc<HttpBackendConfig>,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` with the given configuration.
    #[inline]
    pub fn new(config: HttpBackendConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }

    /// Returns the configuration of this backend.
    #[inline]
    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    /// Fetches the messages the backend stored for `session`.
    pub async fn history(
        &self,
        session: &SessionId,
    ) -> Result<Vec<HistoryEntry>, Error> {
        let url = self.endpoint(&["sessions", session.as_str(), "history"])?;
        let req = self
            .client
            .get(url)
            .header(header::ACCEPT, mime::APPLICATION_JSON.as_ref());
        decode_json(send(req).await?).await
    }

    /// Asks the backend for its health status.
    pub async fn health(&self) -> Result<Health, Error> {
        let url = self.endpoint(&["health"])?;
        let req = self
            .client
            .get(url)
            .header(header::ACCEPT, mime::APPLICATION_JSON.as_ref());
        decode_json(send(req).await?).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let base_url = &self.config.base_url;
        let mut url = Url::parse(base_url).map_err(|err| {
            Error::new(format!("invalid base url {base_url:?}: {err}"), ErrorKind::Other)
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::new(
                    format!("base url {base_url:?} cannot carry a path"),
                    ErrorKind::Other,
                )
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    #[inline]
    fn post(&self, segments: &[&str]) -> Result<RequestBuilder, Error> {
        let url = self.endpoint(segments)?;
        Ok(self
            .client
            .post(url)
            .header(header::CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
            .header(header::ACCEPT, mime::APPLICATION_JSON.as_ref()))
    }
}

impl Backend for HttpBackend {
    type Error = Error;

    fn create_session(
        &self,
    ) -> impl Future<Output = Result<SessionId, Self::Error>> + Send + 'static
    {
        // The trailing slash is part of the route.
        let req = self.post(&["sessions", ""]);

        async move {
            let resp: CreateSessionResponse = decode_json(send(req?).await?).await?;
            SessionId::new(resp.session_id).ok_or_else(|| {
                Error::new("backend returned an empty session id", ErrorKind::InvalidResponse)
            })
        }
    }

    fn send_message(
        &self,
        session: &SessionId,
        text: &str,
    ) -> impl Future<Output = Result<Reply, Self::Error>> + Send + 'static
    {
        let req = self
            .post(&["sessions", session.as_str(), "message"])
            .map(|req| req.json(&MessageRequest { message: text }));

        async move {
            let resp: MessageResponse = decode_json(send(req?).await?).await?;
            Ok(proto::create_reply(resp))
        }
    }

    fn escalate(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<Escalation, Self::Error>> + Send + 'static
    {
        let req = self.post(&["sessions", session.as_str(), "escalate"]);

        async move {
            let resp = send(req?).await?;
            // Only the status matters, the body is informational.
            let body = resp.bytes().await?;
            let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
            Ok(proto::create_escalation(body))
        }
    }
}

async fn send(req: RequestBuilder) -> Result<Response, Error> {
    let resp = req.send().await?;
    trace!(status = %resp.status(), url = %resp.url(), "got a response");
    Ok(resp.error_for_status()?)
}

async fn decode_json<T: DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let is_json = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .is_some_and(|m: Mime| {
            m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON)
        });
    if !is_json {
        debug!(
            content_type = ?resp.headers().get(header::CONTENT_TYPE),
            "response is not labeled as JSON, decoding anyway"
        );
    }

    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| {
        Error::new(format!("malformed body: {err}"), ErrorKind::InvalidResponse)
    })
}
