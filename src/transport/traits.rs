//! Transport trait abstraction for the command server request/response contract

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// A server reply: status code and raw body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Bytes,
}

/// How the agent interprets a reply status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyClass {
    /// 2xx other than 204
    Success,
    /// 204
    NoContent,
    /// 401 / 403
    CredentialRejected,
    /// 404
    NotFound,
    /// 400 / 409
    AlreadyProcessed,
    /// Anything else
    Unexpected,
}

impl Reply {
    pub fn classify(&self) -> ReplyClass {
        match self.status {
            204 => ReplyClass::NoContent,
            200..=299 => ReplyClass::Success,
            401 | 403 => ReplyClass::CredentialRejected,
            404 => ReplyClass::NotFound,
            400 | 409 => ReplyClass::AlreadyProcessed,
            _ => ReplyClass::Unexpected,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// Body as lossy UTF-8, for logs
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Errors that prevent a reply from being obtained at all
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Connection refused or timed out before any reply
    #[error("server unreachable: {0}")]
    Unreachable(String),
}

/// Request/response access to the command server
///
/// `path` is relative to the API base and already escaped.
#[async_trait]
pub trait ServerTransport: Send + Sync {
    /// Issue a GET, optionally with a bearer credential
    async fn get(&self, path: &str, bearer: Option<&str>) -> Result<Reply, TransportError>;

    /// Issue a POST with an optional JSON body
    async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<Reply, TransportError>;

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}
