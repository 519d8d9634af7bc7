//!
//! src/http.rs  Andrew Belles  Oct 7th, 2025
//!
//! Shared reqwest client construction and the retrying request helper
//! every catalog client sends through
//!

use std::time::Duration;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use reqwest::{header, redirect, Client, RequestBuilder, StatusCode};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{HttpConfig, RetryConfig};
use crate::errors::ConvertError;
use crate::types::ServiceKind;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

/// JSON client used by the catalog clients
pub fn json_client(http: &HttpConfig) -> Result<Client, ConvertError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_helper(http)
        .default_headers(h)
        .user_agent(concat!("rs-playlist-converter/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ConvertError::Http(format!("build client: {e}")))
}

/// Exponential backoff plus a random jitter
fn generate_backoff(base: Duration, attempt: u8, rng: &mut SmallRng) -> Duration {
    let exp = (1_u32 << attempt.min(6)) * base;
    let jitter = rng.gen_range(50..=200_u64);
    exp + Duration::from_millis(jitter)
}

/// Seconds the server asked us to wait, if it said so
fn retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Terminal error for a non-success status
fn status_error(service: ServiceKind, status: StatusCode, body: &str) -> ConvertError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ConvertError::AuthenticationFailed(service.to_string())
        }
        _ => {
            let snippet: String = body.chars().take(200).collect();
            ConvertError::unavailable(service.as_str(), format!("status {status}: {snippet}"))
        }
    }
}

fn parse_body(text: &str) -> Result<serde_json::Value, ConvertError> {
    if text.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

/// Sends `request`, retrying throttling, server errors and transport errors
/// up to `retry.max_attempts` times. Returns the decoded JSON body, or
/// `Value::Null` for an empty one.
pub async fn http_with_retry(
    service: ServiceKind,
    request: RequestBuilder,
    retry: &RetryConfig
) -> Result<serde_json::Value, ConvertError> {
    let mut rng = SmallRng::from_entropy();
    let mut attempt = 0_u8;
    loop {
        let response = request.try_clone()
            .ok_or_else(|| ConvertError::Http("non-cloneable request".to_string()))?
            .send()
            .await;
        match response {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    let text = resp.text().await?;
                    return parse_body(&text);
                }
                let wait_hint = retry_after(&resp);
                let body = resp.text().await.unwrap_or_default();
                let retryable = retry.retryable_statuses.contains(&status.as_u16());
                if !retryable || attempt >= retry.max_attempts {
                    debug!(%service, status = %status, attempt, "http.failed");
                    return Err(status_error(service, status, &body));
                }
                let mut backoff = if retry.jitter {
                    generate_backoff(retry.base_backoff, attempt, &mut rng)
                } else {
                    (1_u32 << attempt.min(6)) * retry.base_backoff
                };
                if let Some(hint) = wait_hint {
                    backoff = backoff.max(hint);
                }
                warn!(%service, status = %status, backoff = ?backoff.as_millis(), "http.retry");
                sleep(backoff).await;
                attempt += 1;
            },
            Err(e) => {
                if attempt >= retry.max_attempts {
                    return Err(ConvertError::unavailable(service.as_str(), e.to_string()));
                }
                let backoff = generate_backoff(retry.base_backoff, attempt, &mut rng);
                warn!(%service, error = %e, backoff = ?backoff.as_millis(), "http.retry.error");
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
