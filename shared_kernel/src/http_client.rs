use anyhow::{Context, Error};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Response;
use reqwest_tracing::TracingMiddleware;
use std::collections::HashMap;
use thiserror::Error as ThisError;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

const MAX_RETRIES: u32 = 3;

/// Thin wrapper over reqwest that retries transient failures with an
/// exponential backoff and records a tracing span per request.
#[derive(Clone)]
pub struct HttpClient {
    client: ClientWithMiddleware,
}

#[derive(ThisError, Debug)]
pub enum HttpClientError {
    #[error(transparent)]
    ResponseError(#[from] Error),
    #[error("Unsuccessful response from {url}: {status}")]
    UnsuccessfulStatus { url: Url, status: u16 },
    #[error("Failed to deserialize response from {url}: {message}")]
    InvalidBody { url: Url, message: String },
    #[error("httpBuilderError {0}")]
    HTTPBuilderError(String),
}

impl HttpClientError {
    /// Whether sending the same request again could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            HttpClientError::ResponseError(_) => true,
            HttpClientError::UnsuccessfulStatus { status, .. } => *status == 429 || *status >= 500,
            HttpClientError::InvalidBody { .. } | HttpClientError::HTTPBuilderError(_) => false,
        }
    }
}

struct HeadersMapGenerator(HeaderMap);

impl HeadersMapGenerator {
    fn into_inner(self) -> HeaderMap {
        self.0
    }
}

impl TryFrom<HashMap<&'static str, String>> for HeadersMapGenerator {
    type Error = HttpClientError;

    fn try_from(value: HashMap<&'static str, String>) -> Result<Self, Self::Error> {
        let mut header_map = HeaderMap::new();

        for (key, value) in value.into_iter() {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|err| HttpClientError::HTTPBuilderError(format!("{err} {key}")))?;
            let value = HeaderValue::from_str(&value)
                .map_err(|err| HttpClientError::HTTPBuilderError(format!("{err} {value}")))?;
            header_map.insert(name, value);
        }
        Ok(Self(header_map))
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    pub fn new() -> Self {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(TracingMiddleware::default())
            .build();
        Self { client }
    }

    async fn deserialize<DTO: DeserializeOwned>(response: Response) -> Result<DTO, HttpClientError> {
        let url = response.url().clone();
        let status = response.status();
        if !status.is_success() {
            return Err(HttpClientError::UnsuccessfulStatus {
                url,
                status: status.as_u16(),
            });
        }
        response
            .json::<DTO>()
            .await
            .map_err(|err| HttpClientError::InvalidBody {
                url,
                message: err.to_string(),
            })
    }

    pub async fn get_json<DTO: DeserializeOwned>(
        &self,
        url: Url,
        headers: HashMap<&'static str, String>,
    ) -> Result<DTO, HttpClientError> {
        let header_map = HeadersMapGenerator::try_from(headers)?.into_inner();
        let response = self
            .client
            .get(url.clone())
            .headers(header_map)
            .send()
            .await
            .with_context(|| format!("Failed to fetch request from {url}"))?;

        Self::deserialize(response).await
    }

    pub async fn post_json<DTO: DeserializeOwned, Body: Serialize>(
        &self,
        url: Url,
        headers: HashMap<&'static str, String>,
        body: &Body,
    ) -> Result<DTO, HttpClientError> {
        let mut header_map = HeadersMapGenerator::try_from(headers)?.into_inner();
        header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = serde_json::to_vec(body).map_err(|err| {
            HttpClientError::HTTPBuilderError(format!("Failed to serialize request body {err}"))
        })?;

        let response = self
            .client
            .post(url.clone())
            .headers(header_map)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Failed to post request to {url}"))?;

        Self::deserialize(response).await
    }
}
