use std::time::Duration;

use anyhow::{Context as _, bail};
use lettre::message::Mailbox;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use happytails_core::config::Config;

use crate::infra::mail::{SmtpAuth, SmtpSettings};
use crate::infra::oauth::{DEFAULT_TOKEN_URL, OAuthTokenSource};

/// OTP service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct OtpConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// TCP port to listen on. Env var: `OTP_PORT`.
    #[serde(default = "default_port")]
    pub otp_port: u16,
    /// Browser origin allowed by CORS (the frontend dev server by default).
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Seconds between expired-record purges; `0` disables the task.
    #[serde(default = "default_purge_interval")]
    pub otp_purge_interval_secs: u64,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// `password` or `oauth2`.
    #[serde(default = "default_smtp_auth")]
    pub smtp_auth: String,
    /// Sender mailbox, e.g. `HappyTails <no-reply@happytails.dev>`.
    pub mail_from: String,
    pub smtp_username: String,
    pub smtp_password: Option<SecretString>,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<SecretString>,
    pub oauth_refresh_token: Option<SecretString>,
    #[serde(default = "default_token_url")]
    pub oauth_token_url: String,
    /// Upper bound on one SMTP exchange or token refresh.
    #[serde(default = "default_mail_timeout")]
    pub mail_timeout_secs: u64,
}

impl Config for OtpConfig {}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:5173".to_owned()
}

fn default_purge_interval() -> u64 {
    600
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_owned()
}

fn default_smtp_auth() -> String {
    "oauth2".to_owned()
}

fn default_token_url() -> String {
    DEFAULT_TOKEN_URL.to_owned()
}

fn default_mail_timeout() -> u64 {
    10
}

impl OtpConfig {
    pub fn mail_timeout(&self) -> Duration {
        Duration::from_secs(self.mail_timeout_secs)
    }

    pub fn purge_interval(&self) -> Option<Duration> {
        (self.otp_purge_interval_secs > 0).then(|| Duration::from_secs(self.otp_purge_interval_secs))
    }

    /// Resolve the flat env settings into a typed SMTP configuration.
    pub fn smtp_settings(&self) -> Result<SmtpSettings, anyhow::Error> {
        let from: Mailbox = self.mail_from.parse().context("invalid MAIL_FROM")?;
        let auth = match self.smtp_auth.as_str() {
            "password" => SmtpAuth::Password {
                username: self.smtp_username.clone(),
                password: required_secret(&self.smtp_password, "SMTP_PASSWORD")?,
            },
            "oauth2" => {
                let client = reqwest::Client::builder()
                    .timeout(self.mail_timeout())
                    .build()
                    .context("build oauth http client")?;
                SmtpAuth::OAuth2 {
                    username: self.smtp_username.clone(),
                    tokens: OAuthTokenSource::new(
                        client,
                        self.oauth_token_url.clone(),
                        self.oauth_client_id
                            .clone()
                            .context("OAUTH_CLIENT_ID is required")?,
                        required_secret(&self.oauth_client_secret, "OAUTH_CLIENT_SECRET")?,
                        required_secret(&self.oauth_refresh_token, "OAUTH_REFRESH_TOKEN")?,
                    ),
                }
            }
            other => bail!("unknown SMTP_AUTH {other:?}, expected password or oauth2"),
        };
        Ok(SmtpSettings {
            host: self.smtp_host.clone(),
            from,
            auth,
            timeout: self.mail_timeout(),
        })
    }
}

fn required_secret(
    value: &Option<SecretString>,
    var: &str,
) -> Result<SecretString, anyhow::Error> {
    value
        .as_ref()
        .map(|s| SecretString::from(s.expose_secret().to_owned()))
        .with_context(|| format!("{var} is required"))
}
