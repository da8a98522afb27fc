//! HTTP client for the Qzone REST API.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::auth::{TokenHolder, TokenPair};
use crate::error::ApiError;
use crate::types::{NearbyQuery, NearbyResponse, ThirdPartyTokenBody};

pub(crate) const LOGIN_PATH: &str = "/api/user/login";
pub(crate) const REGISTER_PATH: &str = "/api/user/register";
pub(crate) const THIRD_PARTY_AUTH_PATH: &str = "/api/auth/third-party";
pub(crate) const NEARBY_PATH: &str = "/api/locations/nearby";

/// Endpoints called before a token exists; they never carry `Authorization`.
const PUBLIC_PATHS: [&str; 3] = [LOGIN_PATH, REGISTER_PATH, THIRD_PARTY_AUTH_PATH];

/// HTTP client for the Qzone backend.
///
/// Every call is attempted exactly once. Non-2xx responses become typed
/// errors; a 401 is reported as [`ApiError::Unauthorized`].
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenHolder,
}

impl ApiClient {
    /// Creates an `ApiClient` rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] if `base_url` does not parse as an
    /// absolute http(s) URL, or [`ApiError::Http`] if the underlying
    /// `reqwest::Client` cannot be constructed.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        user_agent: &str,
        tokens: TokenHolder,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// # Errors
    ///
    /// See [`ApiClient::new`].
    pub fn from_app_config(
        config: &qzone_core::AppConfig,
        tokens: TokenHolder,
    ) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            config.http_timeout_secs,
            &config.user_agent,
            tokens,
        )
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenHolder {
        &self.tokens
    }

    /// Exchange a third-party identity token for a Qzone token pair.
    ///
    /// The returned pair is also stored in the shared [`TokenHolder`].
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or a malformed body.
    pub async fn login(&self, third_party_token: &str) -> Result<TokenPair, ApiError> {
        self.sign_in(LOGIN_PATH, third_party_token).await
    }

    /// Create an account for a third-party identity and sign in.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or a malformed body.
    pub async fn register(&self, third_party_token: &str) -> Result<TokenPair, ApiError> {
        self.sign_in(REGISTER_PATH, third_party_token).await
    }

    /// Federated sign-in that creates the account on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or a malformed body.
    pub async fn third_party_auth(&self, third_party_token: &str) -> Result<TokenPair, ApiError> {
        self.sign_in(THIRD_PARTY_AUTH_PATH, third_party_token)
            .await
    }

    async fn sign_in(&self, path: &str, third_party_token: &str) -> Result<TokenPair, ApiError> {
        let body = ThirdPartyTokenBody {
            token: third_party_token,
        };
        let tokens: TokenPair = self
            .send_json(self.request(Method::POST, path).json(&body), path)
            .await?;
        self.tokens.set(tokens.clone());
        tracing::info!(endpoint = path, "signed in");
        Ok(tokens)
    }

    /// Run one nearby-location search.
    ///
    /// An unsuccessful or empty body is still `Ok`; callers decide whether to
    /// fall back to a coarser precision.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or a malformed body.
    pub async fn nearby_locations(&self, query: &NearbyQuery) -> Result<NearbyResponse, ApiError> {
        let response: NearbyResponse = self
            .send_json(
                self.request(Method::POST, NEARBY_PATH).json(query),
                NEARBY_PATH,
            )
            .await?;
        tracing::debug!(
            precision = query.precision,
            success = response.success,
            count = response.data.len(),
            "nearby search completed"
        );
        Ok(response)
    }

    fn endpoint_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Build a request, attaching the bearer token unless `path` is public.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.endpoint_url(path))
            .header(reqwest::header::ACCEPT, "application/json");

        if requires_auth(path) {
            if let Some(token) = self.tokens.access_token() {
                return builder.bearer_auth(token);
            }
        }
        builder
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        path: &str,
    ) -> Result<T, ApiError> {
        let url = self.endpoint_url(path);
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ApiError::Unauthorized { url });
        }

        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<T>(&body).map_err(|e| ApiError::Deserialize {
            context: format!("response from {path}"),
            source: e,
        })
    }
}

pub(crate) fn requires_auth(path: &str) -> bool {
    !PUBLIC_PATHS.contains(&path)
}

/// Validate `base_url` and strip any trailing slash.
pub(crate) fn normalize_base_url(base_url: &str) -> Result<String, ApiError> {
    let parsed = reqwest::Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl {
        base_url: base_url.to_owned(),
        reason: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: format!("unsupported scheme \"{}\"", parsed.scheme()),
        });
    }

    Ok(base_url.trim_end_matches('/').to_owned())
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
