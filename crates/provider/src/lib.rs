//! HTTP implementation of the provider port.
//!
//! Talks JSON over HTTPS with bearer-token auth:
//! - `POST {base_url}/transfers` with a [`ProviderTransfer`] body
//! - `GET {base_url}/accounts/{account_ref}` for an [`AccountEnquiry`]
//!
//! Any 2xx body is handed back to the caller; deciding success from the
//! provider status code is the caller's job. Server errors, throttling, and
//! timeouts are reported as indeterminate so the ledger can stay PENDING.

use std::time::Duration;

use async_trait::async_trait;
use kudi_core::provider::{
    AccountEnquiry, ProviderClient, ProviderError, ProviderTransfer, ProviderTransferResponse,
};
use kudi_shared::config::ProviderConfig;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Provider client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpProviderClient {
    client: Client,
    base_url: Url,
    api_key: String,
    timeout_ms: u64,
}

impl HttpProviderClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Transport` if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ProviderError::Transport(format!("invalid provider base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::Transport(format!(
                "provider base URL cannot be a base: {base_url}"
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn transport_error(&self, err: &reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout_ms)
        } else {
            ProviderError::Transport(err.to_string())
        }
    }

    async fn read<T: DeserializeOwned>(&self, response: Response) -> Result<T, ProviderError> {
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await.map_err(|e| self.transport_error(&e))?;
            return serde_json::from_slice(&body)
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
        }

        warn!(status = %status, "Provider returned an error status");
        if status.is_server_error()
            || status == StatusCode::REQUEST_TIMEOUT
            || status == StatusCode::TOO_MANY_REQUESTS
        {
            Err(ProviderError::Transport(format!("HTTP {status}")))
        } else {
            Err(ProviderError::Declined {
                status: status.as_str().to_string(),
            })
        }
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn transfer(
        &self,
        request: &ProviderTransfer,
    ) -> Result<ProviderTransferResponse, ProviderError> {
        debug!(
            reference = %request.reference,
            amount = %request.amount,
            "Sending provider transfer"
        );
        let response = self
            .client
            .post(self.url(&["transfers"]))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.read(response).await
    }

    async fn account_enquiry(&self, account_ref: &str) -> Result<AccountEnquiry, ProviderError> {
        let response = self
            .client
            .get(self.url(&["accounts", account_ref]))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        self.read(response).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kudi_shared::types::{Currency, Money, TraceId};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, timeout_ms: u64) -> HttpProviderClient {
        HttpProviderClient::new(&ProviderConfig {
            base_url: format!("{}/v1/", server.uri()),
            api_key: "secret".to_string(),
            timeout_ms,
            success_code: "00".to_string(),
        })
        .unwrap()
    }

    fn instruction() -> ProviderTransfer {
        ProviderTransfer {
            reference: TraceId::new(),
            source_account: "ACC-1".to_string(),
            destination_account: "0123456789".to_string(),
            destination_bank: "058".to_string(),
            amount: Money::new(10_000).unwrap(),
            currency: Currency::Ngn,
            narration: None,
        }
    }

    #[tokio::test]
    async fn test_transfer_posts_json_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transfers"))
            .and(header("authorization", "Bearer secret"))
            .and(body_partial_json(json!({ "amount": 10_000, "currency": "NGN" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "00",
                "provider_txn_id": "PRV-1",
                "session_id": "S-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server, 1_000).transfer(&instruction()).await.unwrap();
        assert!(response.is_success("00"));
        assert_eq!(response.provider_txn_id, "PRV-1");
    }

    #[tokio::test]
    async fn test_non_success_code_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transfers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "51" })))
            .mount(&server)
            .await;

        let response = client(&server, 1_000).transfer(&instruction()).await.unwrap();
        assert!(!response.is_success("00"));
        assert!(response.session_id.is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_indeterminate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(&server, 1_000).transfer(&instruction()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(err.is_indeterminate());
    }

    #[tokio::test]
    async fn test_client_error_is_a_decline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let err = client(&server, 1_000).transfer(&instruction()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Declined { ref status } if status == "422"));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let err = client(&server, 1_000).transfer(&instruction()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "status": "00" }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = client(&server, 50).transfer(&instruction()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(50)));
    }

    #[tokio::test]
    async fn test_account_enquiry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/accounts/ACC-1"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "balance": 250_000,
                "account_id": "ACC-1",
                "client_id": "C-9",
                "account_name": "Ada Obi"
            })))
            .mount(&server)
            .await;

        let enquiry = client(&server, 1_000).account_enquiry("ACC-1").await.unwrap();
        assert_eq!(enquiry.balance, Money::new(250_000).unwrap());
        assert_eq!(enquiry.account_name, "Ada Obi");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = ProviderConfig {
            base_url: "not a url".to_string(),
            ..ProviderConfig::default()
        };
        assert!(HttpProviderClient::new(&config).is_err());
    }
}
