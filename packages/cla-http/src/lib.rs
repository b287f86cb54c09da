//! HTTP submitter (spec.md §4.2): one inference request with retry/backoff
//! and a fixed TLS/timeout posture.
//!
//! Grounded on `original_source/daemon/http/{query,adapters}.py` for the
//! exact retry policy (3 total attempts, 0.1s exponential backoff,
//! 502/503/504 only) and on `crab_city`'s reqwest (rustls-tls) usage for
//! crate choice.

mod error;
pub use error::HttpError;

use std::sync::Once;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static VERIFY_SSL_WARNING: Once = Once::new();

#[derive(Debug, Clone, Serialize)]
pub struct StdinInput {
    pub stdin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttachmentInput {
    pub contents: String,
    pub mimetype: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Context {
    pub stdin: StdinInput,
    pub attachments: AttachmentInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub question: String,
    pub context: Context,
}

#[derive(Debug, Deserialize, Default)]
struct InferResponse {
    data: Option<InferData>,
}

#[derive(Debug, Deserialize, Default)]
struct InferData {
    text: Option<String>,
}

/// Configuration this submitter needs from `cla-config`'s `BackendSchema`,
/// kept decoupled so `cla-http` does not depend on `cla-config`.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    pub endpoint: String,
    pub verify_ssl: bool,
}

/// A process-wide HTTP client, constructed once at daemon start (spec.md §5:
/// "the HTTP session and its retry adapter are process-wide").
#[derive(Clone)]
pub struct Submitter {
    client: Client,
}

impl Submitter {
    pub fn new(config: &SubmitterConfig) -> Result<Self, HttpError> {
        if !config.verify_ssl {
            VERIFY_SSL_WARNING.call_once(|| {
                warn!("TLS certificate verification is disabled for the backend connection");
            });
        }

        let client = Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .pool_max_idle_per_host(10)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(HttpError::Build)?;

        Ok(Self { client })
    }

    /// Send one inference request, retrying on network errors and on
    /// `502`/`503`/`504` only, with `0.1, 0.2, 0.4` second backoff. Any other
    /// failure (including exhausted retries) surfaces as the literal
    /// user-visible message from spec.md §4.2.
    pub async fn submit(&self, endpoint: &str, payload: &Payload) -> Result<String, HttpError> {
        let url = format!("{}/infer", endpoint.trim_end_matches('/'));

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self.client.post(&url).json(payload).send().await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let parsed: InferResponse = response
                            .json()
                            .await
                            .unwrap_or_default();
                        let text = parsed
                            .data
                            .and_then(|d| d.text)
                            .unwrap_or_default();
                        return Ok(text);
                    }

                    if is_retryable_status(status) && attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(backoff_for(attempt)).await;
                        continue;
                    }

                    return Err(HttpError::RequestFailed);
                }
                Err(_) if attempt < MAX_ATTEMPTS => {
                    tokio::time::sleep(backoff_for(attempt)).await;
                    continue;
                }
                Err(_) => return Err(HttpError::RequestFailed),
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

fn backoff_for(attempt: u32) -> Duration {
    BACKOFF_BASE * 2u32.pow(attempt - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_payload() -> Payload {
        Payload {
            question: "how do I list files?".to_string(),
            context: Context {
                stdin: StdinInput { stdin: String::new() },
                attachments: AttachmentInput {
                    contents: String::new(),
                    mimetype: String::new(),
                },
            },
        }
    }

    #[tokio::test]
    async fn submit_succeeds_on_first_try() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/infer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "text": "Use ls" }
            })))
            .mount(&server)
            .await;

        let submitter = Submitter::new(&SubmitterConfig {
            endpoint: server.uri(),
            verify_ssl: true,
        })
        .unwrap();

        let reply = submitter.submit(&server.uri(), &test_payload()).await.unwrap();
        assert_eq!(reply, "Use ls");
    }

    #[tokio::test]
    async fn submit_retries_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/infer"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/infer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "text": "ok" }
            })))
            .mount(&server)
            .await;

        let submitter = Submitter::new(&SubmitterConfig {
            endpoint: server.uri(),
            verify_ssl: true,
        })
        .unwrap();

        let reply = submitter.submit(&server.uri(), &test_payload()).await.unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn submit_fails_after_exhausting_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/infer"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let submitter = Submitter::new(&SubmitterConfig {
            endpoint: server.uri(),
            verify_ssl: true,
        })
        .unwrap();

        let err = submitter.submit(&server.uri(), &test_payload()).await.unwrap_err();
        assert!(matches!(err, HttpError::RequestFailed));
    }

    #[tokio::test]
    async fn submit_does_not_retry_4xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/infer"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let submitter = Submitter::new(&SubmitterConfig {
            endpoint: server.uri(),
            verify_ssl: true,
        })
        .unwrap();

        let err = submitter.submit(&server.uri(), &test_payload()).await.unwrap_err();
        assert!(matches!(err, HttpError::RequestFailed));
    }

    #[tokio::test]
    async fn submit_tolerates_missing_response_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/infer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let submitter = Submitter::new(&SubmitterConfig {
            endpoint: server.uri(),
            verify_ssl: true,
        })
        .unwrap();

        let reply = submitter.submit(&server.uri(), &test_payload()).await.unwrap();
        assert_eq!(reply, "");
    }
}
