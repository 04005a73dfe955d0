#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::types::{MailMessage, OtpRecord, UserAccount};
use crate::error::OtpServiceError;

/// Read access to user accounts owned by the auth subsystem.
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, OtpServiceError>;
}

/// Store of pending OTP records, keyed by email.
pub trait OtpRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<OtpRecord>, OtpServiceError>;

    /// Insert `record`, replacing any existing record for the same email in
    /// one atomic write.
    async fn replace(&self, record: &OtpRecord) -> Result<(), OtpServiceError>;

    /// Delete the record only if it still belongs to issuance `id`.
    /// Returns `true` if a row was removed.
    async fn delete_issuance(&self, email: &str, id: Uuid) -> Result<bool, OtpServiceError>;

    /// In one transaction: delete the record for issuance `record.id` and mark
    /// the owning account verified. Returns `false` without touching the
    /// account when the record was already consumed or replaced.
    async fn consume_and_verify(&self, record: &OtpRecord) -> Result<bool, OtpServiceError>;

    /// Delete records whose `expire_at` is before `now`.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, OtpServiceError>;
}

/// Outbound mail transport.
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), OtpServiceError>;
}
