use super::{MulticastMessage, MulticastResponse, ProviderError, PushProvider, SendOutcome};
use crate::config::FcmConfig;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

const FCM_API_URL: &str = "https://fcm.googleapis.com/v1/projects";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Google service-account key, as downloaded from the Firebase console.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(default)]
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, ProviderError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ProviderError::Configuration(format!(
                "Failed to read service account file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            ProviderError::Configuration(format!(
                "Failed to parse service account file {}: {}",
                path.display(),
                e
            ))
        })
    }
}

#[derive(Debug, Serialize)]
struct OauthClaims {
    iss: String,
    sub: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug)]
struct CachedToken {
    access_token: String,
    expires_at: i64,
}

impl CachedToken {
    /// Valid for at least 60 more seconds.
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at > now + 60
    }
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a HashMap<String, String>>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct FcmApiResponse {
    name: Option<String>,
}

/// FCM HTTP v1 client.
///
/// Exchanges the service-account key for a short-lived OAuth2 bearer
/// token (cached until shortly before expiry) and fans a multicast out as
/// one `messages:send` call per token, the same strategy the Admin SDK
/// uses for `sendEachForMulticast`.
pub struct FcmProvider {
    config: FcmConfig,
    credentials: ServiceAccountKey,
    http_client: Client,
    token_cache: Mutex<Option<CachedToken>>,
}

impl FcmProvider {
    pub fn new(config: FcmConfig, credentials: ServiceAccountKey) -> Self {
        Self {
            config,
            credentials,
            http_client: Client::new(),
            token_cache: Mutex::new(None),
        }
    }

    /// Get a bearer token, refreshing through the cache lock so that
    /// concurrent callers trigger at most one exchange.
    async fn access_token(&self) -> Result<String, ProviderError> {
        let mut cache = self.token_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(Utc::now().timestamp()) {
                return Ok(cached.access_token.clone());
            }
        }

        let now = Utc::now();
        let claims = OauthClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: FCM_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| {
                ProviderError::Authentication(format!("Failed to parse private key: {}", e))
            })?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| ProviderError::Authentication(format!("Failed to sign JWT: {}", e)))?;

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];
        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to reach token endpoint: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::Authentication(format!(
                "Token request failed with status {}",
                response.status()
            )));
        }

        let token: GoogleTokenResponse = response.json().await.map_err(|e| {
            ProviderError::Authentication(format!("Failed to parse token response: {}", e))
        })?;

        let expires_at = Utc::now().timestamp() + token.expires_in;
        *cache = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }

    /// One `messages:send` call. Per-token failures are folded into the
    /// outcome rather than aborting the multicast.
    async fn send_one(
        &self,
        access_token: &str,
        token: &str,
        message: &MulticastMessage,
    ) -> SendOutcome {
        let request = FcmRequest {
            message: FcmMessage {
                token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data: message.data.as_ref(),
            },
        };

        let url = format!("{}/{}/messages:send", FCM_API_URL, self.config.project_id);

        let response = match self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return SendOutcome::failed(format!("FCM send request failed: {}", e)),
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return SendOutcome::failed(format!("FCM API error {}: {}", status, body));
        }

        match response.json::<FcmApiResponse>().await {
            Ok(parsed) => SendOutcome::delivered(parsed.name),
            Err(e) => SendOutcome::failed(format!("Failed to parse FCM response: {}", e)),
        }
    }
}

#[async_trait]
impl PushProvider for FcmProvider {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastResponse, ProviderError> {
        if self.config.project_id.is_empty() {
            return Err(ProviderError::Configuration(
                "FCM project_id is not configured".to_string(),
            ));
        }

        let access_token = self.access_token().await?;

        let mut responses = Vec::with_capacity(message.tokens.len());
        for token in &message.tokens {
            responses.push(self.send_one(&access_token, token, message).await);
        }

        let response = MulticastResponse::from_outcomes(responses);
        tracing::info!(
            success_count = response.success_count,
            failure_count = response.failure_count,
            "FCM multicast dispatched"
        );
        Ok(response)
    }
}

/// Mock push provider for tests and disabled-FCM environments.
///
/// Tokens with an `invalid` prefix simulate unregistered devices and
/// report a failed outcome; everything else is delivered.
pub struct MockPushProvider {
    enabled: bool,
    fail_sends: bool,
    send_count: AtomicU64,
}

impl MockPushProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            fail_sends: false,
            send_count: AtomicU64::new(0),
        }
    }

    /// A provider whose every multicast attempt errors out, for
    /// exercising the dispatch-failure path.
    pub fn failing() -> Self {
        Self {
            enabled: true,
            fail_sends: true,
            send_count: AtomicU64::new(0),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send_multicast(
        &self,
        message: &MulticastMessage,
    ) -> Result<MulticastResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock push provider is not enabled".to_string(),
            ));
        }
        if self.fail_sends {
            return Err(ProviderError::SendFailed(
                "Mock push provider rejected the send".to_string(),
            ));
        }

        let call = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;

        let responses = message
            .tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                if token.starts_with("invalid") {
                    SendOutcome::failed("UNREGISTERED".to_string())
                } else {
                    SendOutcome::delivered(Some(format!(
                        "projects/mock/messages/{}-{}",
                        call, i
                    )))
                }
            })
            .collect();

        tracing::info!(
            tokens = message.tokens.len(),
            title = %message.title,
            "[MOCK] push multicast would be sent"
        );

        Ok(MulticastResponse::from_outcomes(responses))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(tokens: &[&str]) -> MulticastMessage {
        MulticastMessage {
            title: "Hi".to_string(),
            body: "There".to_string(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            data: None,
        }
    }

    #[tokio::test]
    async fn mock_reports_one_outcome_per_token() {
        let provider = MockPushProvider::new(true);
        let response = provider
            .send_multicast(&message(&["tok1", "invalid-tok", "tok3"]))
            .await
            .expect("mock send should succeed");

        assert_eq!(response.responses.len(), 3);
        assert_eq!(response.success_count, 2);
        assert_eq!(response.failure_count, 1);
        assert!(response.responses[0].success);
        assert!(!response.responses[1].success);
        assert_eq!(
            response.responses[1].error.as_deref(),
            Some("UNREGISTERED")
        );
    }

    #[tokio::test]
    async fn mock_counts_sends() {
        let provider = MockPushProvider::new(true);
        provider.send_multicast(&message(&["tok1"])).await.unwrap();
        provider.send_multicast(&message(&["tok2"])).await.unwrap();
        assert_eq!(provider.send_count(), 2);
    }

    #[tokio::test]
    async fn disabled_mock_errors() {
        let provider = MockPushProvider::new(false);
        let err = provider.send_multicast(&message(&["tok1"])).await;
        assert!(matches!(err, Err(ProviderError::NotEnabled(_))));
    }

    #[tokio::test]
    async fn failing_mock_errors_on_send() {
        let provider = MockPushProvider::failing();
        let err = provider.send_multicast(&message(&["tok1"])).await;
        assert!(matches!(err, Err(ProviderError::SendFailed(_))));
    }

    #[test]
    fn first_delivered_inspects_only_index_zero() {
        let response = MulticastResponse::from_outcomes(vec![
            SendOutcome::failed("UNREGISTERED".to_string()),
            SendOutcome::delivered(Some("projects/p/messages/1".to_string())),
        ]);
        assert!(!response.first_delivered());

        let empty = MulticastResponse::from_outcomes(vec![]);
        assert!(!empty.first_delivered());
    }

    #[test]
    fn cached_token_freshness_window() {
        let token = CachedToken {
            access_token: "t".to_string(),
            expires_at: 1_000,
        };
        assert!(token.is_fresh(900));
        assert!(!token.is_fresh(940));
        assert!(!token.is_fresh(1_100));
    }

    #[tokio::test]
    async fn fcm_provider_requires_a_project_id() {
        let config = FcmConfig {
            project_id: String::new(),
            credentials_path: "unused.json".to_string(),
            enabled: true,
        };
        let credentials = ServiceAccountKey {
            project_id: String::new(),
            private_key: "not-a-key".to_string(),
            client_email: "svc@test.iam.gserviceaccount.com".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        };

        let provider = FcmProvider::new(config, credentials);
        let err = provider.send_multicast(&message(&["tok1"])).await;
        assert!(matches!(err, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn missing_service_account_file_is_a_configuration_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/serviceAccount.json"));
        assert!(matches!(err, Err(ProviderError::Configuration(_))));
    }
}
