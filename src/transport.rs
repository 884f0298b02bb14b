use anyhow::Context;
use reqwest::Client;
use std::time::Duration;

use crate::error::TransportError;
use crate::models::Operation;

/// Host of the carrier's demo environment, which sits behind basic auth.
pub const DEMO_HOST: &str = "dpd.surflink.ee";
pub const DEMO_CREDENTIALS: (&str, &str) = ("demo", "demo");

/// A form-encoded POST ready to leave the process.
#[derive(Debug, Clone, PartialEq)]
pub struct FormPost {
    pub url: String,
    pub form: Vec<(String, String)>,
    pub basic_auth: Option<(String, String)>,
    pub timeout: Duration,
}

impl FormPost {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_form(&self, request: FormPost) -> Result<HttpResponse, TransportError>;
}

/// `<base><endpoint>.php`
pub fn build_url(base: &str, operation: Operation) -> String {
    format!("{}{}.php", base, operation.endpoint())
}

pub fn demo_auth(url: &str) -> Option<(String, String)> {
    url.contains(DEMO_HOST)
        .then(|| (DEMO_CREDENTIALS.0.to_string(), DEMO_CREDENTIALS.1.to_string()))
}

pub struct ReqwestTransport {
    http_client: Client,
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http_client })
    }

    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_form(&self, request: FormPost) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .http_client
            .post(&request.url)
            .timeout(request.timeout)
            .form(&request.form);

        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(e, request.timeout))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(e, request.timeout))?;

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
