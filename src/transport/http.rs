//! HTTP transport backed by reqwest

use crate::transport::traits::{Reply, ServerTransport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use url::Url;

/// Talks to the command server over HTTP(S)
#[derive(Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for an API base such as `http://host:3000/api/v1`
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        bearer: Option<&str>,
    ) -> Result<Reply, TransportError> {
        let request = match bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let res = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                TransportError::Unreachable(e.to_string())
            } else {
                TransportError::Http(e)
            }
        })?;
        let status = res.status().as_u16();
        let body = res.bytes().await?;
        Ok(Reply { status, body })
    }
}

#[async_trait]
impl ServerTransport for HttpTransport {
    async fn get(&self, path: &str, bearer: Option<&str>) -> Result<Reply, TransportError> {
        let url = self.url(path)?;
        self.send(self.http.get(url), bearer).await
    }

    async fn post(
        &self,
        path: &str,
        bearer: Option<&str>,
        body: Option<Bytes>,
    ) -> Result<Reply, TransportError> {
        let url = self.url(path)?;
        let request = match body {
            Some(body) => self
                .http
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body),
            None => self.http.post(url),
        };
        self.send(request, bearer).await
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}
