//! HTTP transport seam
//!
//! `SdsClient` and `TokenManager` never talk to `reqwest` directly; they go
//! through `HttpTransport` so the request flow can be exercised without a
//! network. `ReqwestTransport` is the production implementation.

use super::error::Result;
use async_trait::async_trait;

/// Raw HTTP response: status code plus fully-read body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Minimal HTTP surface needed by the data source
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue a GET with the given headers and read the whole body
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse>;

    /// POST a form-encoded body and read the whole response
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport using the client's default timeouts and redirects
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }

    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<HttpResponse> {
        let response = self.client.post(url).form(form).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse { status, body })
    }
}
