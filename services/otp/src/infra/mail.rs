use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::PoolConfig;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::domain::repository::Mailer;
use crate::domain::types::MailMessage;
use crate::error::OtpServiceError;
use crate::infra::oauth::{OAuthTokenSource, is_fresh};

pub enum SmtpAuth {
    Password {
        username: String,
        password: SecretString,
    },
    /// XOAUTH2 with an access token minted from a refresh token.
    OAuth2 {
        username: String,
        tokens: OAuthTokenSource,
    },
}

pub struct SmtpSettings {
    pub host: String,
    pub from: Mailbox,
    pub auth: SmtpAuth,
    pub timeout: Duration,
}

type Transport = AsyncSmtpTransport<Tokio1Executor>;

struct CachedTransport {
    transport: Arc<Transport>,
    /// `None` for credentials that never expire.
    expires_at: Option<DateTime<Utc>>,
}

impl CachedTransport {
    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|exp| is_fresh(exp, now))
    }
}

struct Inner {
    settings: SmtpSettings,
    cached: Mutex<Option<CachedTransport>>,
}

/// SMTP mailer built once at startup and shared across requests. The pooled
/// transport is reused until its OAuth2 token nears expiry, then rebuilt.
#[derive(Clone)]
pub struct SmtpMailer {
    inner: Arc<Inner>,
}

impl SmtpMailer {
    pub fn new(settings: SmtpSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                cached: Mutex::new(None),
            }),
        }
    }

    async fn transport(&self) -> Result<Arc<Transport>, anyhow::Error> {
        let mut cached = self.inner.cached.lock().await;
        if let Some(current) = cached.as_ref().filter(|c| c.is_fresh_at(Utc::now())) {
            return Ok(Arc::clone(&current.transport));
        }
        let built = self.build_transport().await?;
        let transport = Arc::clone(&built.transport);
        *cached = Some(built);
        Ok(transport)
    }

    async fn invalidate(&self) {
        *self.inner.cached.lock().await = None;
    }

    async fn build_transport(&self) -> Result<CachedTransport, anyhow::Error> {
        let settings = &self.inner.settings;
        let builder = Transport::relay(&settings.host)
            .context("configure smtp relay")?
            .timeout(Some(settings.timeout))
            .pool_config(PoolConfig::new().max_size(4));

        let cached = match &settings.auth {
            SmtpAuth::Password { username, password } => CachedTransport {
                transport: Arc::new(
                    builder
                        .credentials(Credentials::new(
                            username.clone(),
                            password.expose_secret().to_owned(),
                        ))
                        .build(),
                ),
                expires_at: None,
            },
            SmtpAuth::OAuth2 { username, tokens } => {
                let token = tokens.fetch().await?;
                CachedTransport {
                    transport: Arc::new(
                        builder
                            .credentials(Credentials::new(
                                username.clone(),
                                token.value.expose_secret().to_owned(),
                            ))
                            .authentication(vec![Mechanism::Xoauth2])
                            .build(),
                    ),
                    expires_at: Some(token.expires_at),
                }
            }
        };
        info!(host = %settings.host, "smtp transport ready");
        Ok(cached)
    }

    async fn deliver(&self, message: &MailMessage) -> Result<(), anyhow::Error> {
        let email = build_message(&self.inner.settings.from, message)?;
        let transport = self.transport().await?;
        if let Err(e) = transport.send(email).await {
            // Credentials may have been revoked early; rebuild on the next send.
            self.invalidate().await;
            return Err(e).context("smtp send");
        }
        debug!(to = %message.to, "mail sent");
        Ok(())
    }
}

impl Mailer for SmtpMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), OtpServiceError> {
        self.deliver(message)
            .await
            .map_err(OtpServiceError::MailDelivery)
    }
}

pub fn build_message(from: &Mailbox, message: &MailMessage) -> Result<Message, anyhow::Error> {
    let to: Mailbox = message.to.parse().context("invalid recipient address")?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(message.html.clone())
        .context("build mail message")
}
