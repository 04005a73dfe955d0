use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Account data this service needs from the users table.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub verified: bool,
}

/// A pending email verification code. At most one exists per email.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    /// Issuance id; a reissue for the same email gets a new one.
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub code_hash: String,
    pub created_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_at
    }
}

/// Outgoing email message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// OTP time-to-live in seconds.
pub const OTP_TTL_SECS: i64 = 3600;

/// Inclusive range codes are drawn from; every value renders as 4 digits.
pub const OTP_MIN: u32 = 1000;
pub const OTP_MAX: u32 = 9999;

pub const OTP_MAIL_SUBJECT: &str = "Verify Your HappyTails account";
