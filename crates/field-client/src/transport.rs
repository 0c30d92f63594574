//! Sending request documents to the endpoint.

use std::fmt::Debug;

use async_trait::async_trait;
use configuration::Configuration;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderName;
use reqwest::header::HeaderValue;
use url::Url;

use crate::FetchError;
use crate::Request;

/// Sends a request document and returns the raw json payload of the answer.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn post(
        &self,
        request: &Request,
        configuration: &Configuration,
    ) -> Result<serde_json::Value, FetchError>;
}

/// A transport posting json over http.
///
/// A json body is returned whatever the status code, since GraphQL servers report
/// request errors in the body.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a preconfigured reqwest client, e.g. one with custom tls settings.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

fn to_header_map(configuration: &Configuration) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::with_capacity(configuration.headers.len());
    for (name, value) in &configuration.headers {
        let invalid = |reason: String| FetchError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|err| invalid(err.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|err| invalid(err.to_string()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        request: &Request,
        configuration: &Configuration,
    ) -> Result<serde_json::Value, FetchError> {
        let url = Url::parse(&configuration.endpoint).map_err(|err| FetchError::InvalidEndpoint {
            endpoint: configuration.endpoint.clone(),
            reason: err.to_string(),
        })?;
        let headers = to_header_map(configuration)?;

        tracing::debug!(endpoint = %url, "posting request");
        tracing::trace!(document = %request.query, "request document");

        let mut builder = self.http_client.post(url).headers(headers).json(request);
        if let Some(timeout) = configuration.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|err| FetchError::HttpError {
            status: err.status().map(|status| status.as_u16()),
            reason: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "endpoint answered with an error status");
        }

        let body = response.bytes().await.map_err(|err| FetchError::HttpError {
            status: Some(status.as_u16()),
            reason: err.to_string(),
        })?;

        match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(payload) => {
                tracing::trace!(%payload, "response payload");
                Ok(payload)
            }
            Err(_) if !status.is_success() => Err(FetchError::HttpError {
                status: Some(status.as_u16()),
                reason: status
                    .canonical_reason()
                    .unwrap_or("unknown status")
                    .to_owned(),
            }),
            Err(err) => Err(FetchError::MalformedResponse {
                reason: err.to_string(),
            }),
        }
    }
}
