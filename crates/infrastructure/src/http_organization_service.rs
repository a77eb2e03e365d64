use std::time::Duration;

use async_trait::async_trait;
use dynakit_application::{ColumnSet, OrganizationService};
use dynakit_core::{AppError, AppResult, UNKNOWN_ERROR_MESSAGE, extract_error_message};
use dynakit_domain::{Record, RecordReference};
use reqwest::{StatusCode, Url, header};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

/// Connection settings for [`HttpOrganizationService`].
#[derive(Debug, Clone)]
pub struct HttpOrganizationServiceConfig {
    /// Service root; record routes are resolved below `records/`.
    pub base_url: Url,
    /// Optional bearer token sent with every request.
    pub bearer_token: Option<String>,
    /// Attempts per request for transient failures.
    pub max_attempts: u8,
    /// Linear backoff step between attempts.
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
struct CreatedRecordResponse {
    id: String,
}

/// HTTP-based organization service speaking a JSON record API.
///
/// Routes: `GET|PATCH {base}/records/{logical_name}/{id}` and `POST {base}/records/{logical_name}`.
pub struct HttpOrganizationService {
    http_client: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpOrganizationService {
    /// Creates a new HTTP organization service.
    #[must_use]
    pub fn new(http_client: reqwest::Client, config: HttpOrganizationServiceConfig) -> Self {
        Self {
            http_client,
            base_url: config.base_url,
            bearer_token: config.bearer_token.filter(|token| !token.trim().is_empty()),
            max_attempts: config.max_attempts.max(1),
            retry_backoff_ms: config.retry_backoff_ms.max(50),
        }
    }

    fn record_url(&self, segments: &[&str]) -> AppResult<Url> {
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(AppError::Validation(format!(
                "record route segments must not be blank: {segments:?}"
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::Validation(format!(
                    "organization service url '{}' cannot carry record paths",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("records")
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header(header::ACCEPT, "application/json");
        match self.bearer_token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_with_retry<F>(
        &self,
        operation: &str,
        mut build: F,
    ) -> AppResult<reqwest::Response>
    where
        F: FnMut(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = self.authorize(build(&self.http_client)).send().await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == StatusCode::TOO_MANY_REQUESTS =>
                {
                    let status = response.status();
                    let message = response_error_message(response).await;
                    warn!(
                        operation,
                        attempt,
                        status = status.as_u16(),
                        error = %message,
                        "transient organization service failure"
                    );
                    last_error = Some(message);
                }
                Ok(response) => {
                    let status = response.status();
                    let message = response_error_message(response).await;
                    return Err(status_error(status, message));
                }
                Err(error) => {
                    warn!(
                        operation,
                        attempt,
                        error = %error,
                        "organization service transport error"
                    );
                    last_error = Some(format!("organization service transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::Internal(last_error.unwrap_or_else(|| {
            format!("organization service {operation} exhausted retries")
        })))
    }
}

#[async_trait]
impl OrganizationService for HttpOrganizationService {
    async fn retrieve(
        &self,
        logical_name: &str,
        id: &str,
        columns: &ColumnSet,
    ) -> AppResult<Record> {
        let mut url = self.record_url(&[logical_name, id])?;
        if let ColumnSet::Columns(selected) = columns {
            url.query_pairs_mut()
                .append_pair("select", selected.join(",").as_str());
        }

        debug!(logical_name, record_id = id, "retrieving record over http");
        let response = self
            .send_with_retry("retrieve", |client| client.get(url.clone()))
            .await?;

        let attributes = response
            .json::<Map<String, Value>>()
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "organization service returned an invalid record body: {error}"
                ))
            })?;

        Ok(Record::new(RecordReference::new(logical_name, id), attributes))
    }

    async fn update(
        &self,
        logical_name: &str,
        id: &str,
        attributes: Map<String, Value>,
    ) -> AppResult<()> {
        let url = self.record_url(&[logical_name, id])?;

        debug!(
            logical_name,
            record_id = id,
            attribute_count = attributes.len(),
            "updating record over http"
        );
        self.send_with_retry("update", |client| {
            client.patch(url.clone()).json(&attributes)
        })
        .await?;

        Ok(())
    }

    async fn create(
        &self,
        logical_name: &str,
        attributes: Map<String, Value>,
    ) -> AppResult<String> {
        let url = self.record_url(&[logical_name])?;

        // Shared by every attempt of this create.
        let idempotency_key = Uuid::new_v4().to_string();

        debug!(logical_name, idempotency_key = %idempotency_key, "creating record over http");
        let response = self
            .send_with_retry("create", |client| {
                client
                    .post(url.clone())
                    .header("Idempotency-Key", idempotency_key.as_str())
                    .json(&attributes)
            })
            .await?;

        let created = response
            .json::<CreatedRecordResponse>()
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "organization service create response is missing the record id: {error}"
                ))
            })?;

        Ok(created.id)
    }
}

async fn response_error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    match serde_json::from_str::<Value>(body.as_str()) {
        Ok(value) => {
            let message = extract_error_message(&value);
            if message == UNKNOWN_ERROR_MESSAGE && !body.trim().is_empty() {
                body
            } else {
                message
            }
        }
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => format!("organization service returned status {}", status.as_u16()),
    }
}

fn status_error(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::UNAUTHORIZED => AppError::Unauthorized(message),
        StatusCode::FORBIDDEN => AppError::Forbidden(message),
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => AppError::Conflict(message),
        status if status.is_client_error() => AppError::Validation(message),
        _ => AppError::Internal(message),
    }
}

#[cfg(test)]
mod tests;
