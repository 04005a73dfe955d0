use anyhow::Context as _;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Tokens are refreshed this long before the provider says they expire.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Google's OAuth2 token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Short-lived OAuth2 access token used as the SMTP XOAUTH2 credential.
pub struct AccessToken {
    pub value: SecretString,
    pub expires_at: DateTime<Utc>,
}

pub(crate) fn is_fresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now + Duration::seconds(REFRESH_MARGIN_SECS) < expires_at
}

/// Exchanges a long-lived refresh token for access tokens.
pub struct OAuthTokenSource {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    refresh_token: SecretString,
}

impl OAuthTokenSource {
    pub fn new(
        client: reqwest::Client,
        token_url: String,
        client_id: String,
        client_secret: SecretString,
        refresh_token: SecretString,
    ) -> Self {
        Self {
            client,
            token_url,
            client_id,
            client_secret,
            refresh_token,
        }
    }

    pub async fn fetch(&self) -> Result<AccessToken, anyhow::Error> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("refresh_token", self.refresh_token.expose_secret()),
            ("grant_type", "refresh_token"),
        ];
        let token: TokenResponse = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .context("request oauth access token")?
            .error_for_status()
            .context("oauth token endpoint rejected refresh")?
            .json()
            .await
            .context("decode oauth token response")?;
        tracing::debug!(expires_in = token.expires_in, "oauth access token refreshed");
        Ok(AccessToken {
            value: SecretString::from(token.access_token),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }
}
