//! External authorization collaborator boundary.
//!
//! The popup login flow itself runs outside this process; what crosses the
//! boundary is modeled here:
//! - [`ClientConfig`] - Application identifier and requested permission scope
//! - [`AuthorizationResult`] - A granted token or an operator cancellation
//! - [`AuthorizationFlow`] - Trait the lifecycle controller drives
//! - [`TokenExchangeFlow`] - Concrete flow that exchanges a short-lived
//!   popup token for a long-lived one (with the `exchange` feature)
//!
//! Cancellation is a distinct, non-error outcome: an operator closing the
//! popup is not a failure and must not render as one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Secret;

/// Permission scopes requested from the advertising platform by default.
pub const DEFAULT_SCOPES: &[&str] = &["ads_read", "leads_retrieval", "business_management"];

/// Configuration handed to the external authorization flow.
///
/// # Example
///
/// ```
/// use adboard_core::auth::ClientConfig;
///
/// let config = ClientConfig::new("1234567890")
///     .with_scopes(vec!["ads_read".to_string()]);
/// assert!(!config.app_id().is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    app_id: String,
    scopes: Vec<String>,
}

impl ClientConfig {
    /// Create a configuration with the default permission scopes.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replace the requested scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// The application identifier registered with the platform.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The requested permission scopes.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Whether the application identifier is missing.
    ///
    /// Checked before any network call; a blank app id is an operator
    /// input error, not something to send to the platform.
    pub fn is_missing_app_id(&self) -> bool {
        self.app_id.trim().is_empty()
    }
}

/// Error type for authorization flow failures.
///
/// Cancellation is not an error; see [`AuthorizationResult::Cancelled`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// The platform rejected the request.
    #[error("platform error: {message}")]
    Platform { message: String },

    /// The flow could not reach the platform.
    #[error("network error: {message}")]
    Network { message: String },
}

/// Outcome of an authorization attempt.
#[derive(Debug)]
pub enum AuthorizationResult {
    /// The operator approved the flow and a token was issued.
    Granted(Secret),

    /// The operator declined or closed the flow.
    Cancelled,
}

/// Trait for the external authorization collaborator.
///
/// Implementations deliver either a token or a cancellation signal; the
/// lifecycle controller turns both into state values and applies the
/// bounded timeout around the whole call.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    /// Run the flow to completion.
    async fn authorize(&self, config: &ClientConfig) -> Result<AuthorizationResult, AuthError>;
}

#[cfg(feature = "exchange")]
pub use exchange::TokenExchangeFlow;

#[cfg(feature = "exchange")]
mod exchange {
    use super::*;
    use url::Url;

    /// Default base URL of the platform's Graph endpoint.
    const DEFAULT_GRAPH_BASE: &str = "https://graph.facebook.com/v18.0/";

    #[derive(Debug, Deserialize)]
    struct ExchangeResponse {
        access_token: String,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }

    #[derive(Debug, Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    /// Exchanges a short-lived popup token for a long-lived token.
    ///
    /// The popup flow in the shell yields a short-lived user token; this
    /// flow upgrades it server-side so the stored credential survives long
    /// enough for the scheduled ingestion job.
    pub struct TokenExchangeFlow {
        http_client: reqwest::Client,
        base_url: Url,
        app_secret: Secret,
        short_lived_token: Secret,
    }

    impl TokenExchangeFlow {
        /// Create a flow against the platform's production endpoint.
        pub fn new(
            app_secret: impl Into<String>,
            short_lived_token: impl Into<String>,
        ) -> Self {
            Self {
                http_client: reqwest::Client::new(),
                base_url: Url::parse(DEFAULT_GRAPH_BASE).expect("default base URL is valid"),
                app_secret: Secret::new(app_secret),
                short_lived_token: Secret::new(short_lived_token),
            }
        }

        /// Override the Graph endpoint base URL.
        ///
        /// The base must end with a trailing slash for path joining.
        pub fn with_base_url(mut self, base_url: Url) -> Self {
            self.base_url = base_url;
            self
        }
    }

    #[async_trait]
    impl AuthorizationFlow for TokenExchangeFlow {
        async fn authorize(
            &self,
            config: &ClientConfig,
        ) -> Result<AuthorizationResult, AuthError> {
            let endpoint = self
                .base_url
                .join("oauth/access_token")
                .map_err(|e| AuthError::Platform {
                    message: format!("invalid exchange endpoint: {}", e),
                })?;

            tracing::info!(app_id = %config.app_id(), "exchanging short-lived token");

            let response = self
                .http_client
                .get(endpoint)
                .query(&[
                    ("grant_type", "fb_exchange_token"),
                    ("client_id", config.app_id()),
                    ("client_secret", self.app_secret.expose()),
                    ("fb_exchange_token", self.short_lived_token.expose()),
                ])
                .send()
                .await
                .map_err(|e| AuthError::Network {
                    message: e.to_string(),
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let message = match response.json::<ErrorBody>().await {
                    Ok(body) => body.error.message,
                    Err(_) => format!("platform returned HTTP {}", status),
                };
                return Err(AuthError::Platform { message });
            }

            let body: ExchangeResponse =
                response.json().await.map_err(|e| AuthError::Platform {
                    message: format!("malformed exchange response: {}", e),
                })?;

            Ok(AuthorizationResult::Granted(Secret::new(body.access_token)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default_scopes() {
        let config = ClientConfig::new("1234567890");
        assert_eq!(config.scopes().len(), 3);
        assert!(config.scopes().contains(&"ads_read".to_string()));
    }

    #[test]
    fn test_missing_app_id() {
        assert!(ClientConfig::new("").is_missing_app_id());
        assert!(ClientConfig::new("   ").is_missing_app_id());
        assert!(!ClientConfig::new("1234567890").is_missing_app_id());
    }
}

#[cfg(all(test, feature = "exchange"))]
mod exchange_tests {
    use super::*;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flow_against(server: &MockServer) -> TokenExchangeFlow {
        let base = Url::parse(&format!("{}/v18.0/", server.uri())).unwrap();
        TokenExchangeFlow::new("app-secret", "short-lived").with_base_url(base)
    }

    #[tokio::test]
    async fn test_exchange_grants_long_lived_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v18.0/oauth/access_token"))
            .and(query_param("grant_type", "fb_exchange_token"))
            .and(query_param("client_id", "1234567890"))
            .and(query_param("fb_exchange_token", "short-lived"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "long-lived-token",
                "token_type": "bearer",
                "expires_in": 5183944,
            })))
            .mount(&server)
            .await;

        let flow = flow_against(&server);
        let config = ClientConfig::new("1234567890");

        let result = flow.authorize(&config).await.unwrap();
        match result {
            AuthorizationResult::Granted(token) => {
                assert_eq!(token.expose(), "long-lived-token");
            }
            AuthorizationResult::Cancelled => panic!("expected a granted token"),
        }
    }

    #[tokio::test]
    async fn test_exchange_surfaces_platform_error_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v18.0/oauth/access_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Invalid OAuth access token." }
            })))
            .mount(&server)
            .await;

        let flow = flow_against(&server);
        let config = ClientConfig::new("1234567890");

        let err = flow.authorize(&config).await.unwrap_err();
        match err {
            AuthError::Platform { message } => {
                assert_eq!(message, "Invalid OAuth access token.");
            }
            other => panic!("expected a platform error, got {:?}", other),
        }
    }
}
