use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::repository::{Mailer, OtpRepository};
use crate::domain::types::{
    MailMessage, OTP_MAIL_SUBJECT, OTP_MAX, OTP_MIN, OTP_TTL_SECS, OtpRecord,
};
use crate::error::OtpServiceError;
use crate::usecase::hashing::hash_code;

/// Uniform 4-digit code in `[OTP_MIN, OTP_MAX]`.
pub fn generate_code() -> SecretString {
    let mut rng = rand::rng();
    SecretString::from(rng.random_range(OTP_MIN..=OTP_MAX).to_string())
}

pub fn otp_mail(to: &str, code: &str) -> MailMessage {
    MailMessage {
        to: to.to_owned(),
        subject: OTP_MAIL_SUBJECT.to_owned(),
        html: format!(
            "<p>Enter <b>{code}</b> in the website to verify your email and complete the signup process.</p>\
             <p>This OTP will expire in 1 hour.</p>"
        ),
    }
}

pub struct IssueOtpInput {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug)]
pub struct IssueOtpOutput {
    pub issuance_id: Uuid,
    pub expire_at: DateTime<Utc>,
}

/// Generate, persist and mail a fresh code, replacing any pending one.
///
/// If the mail cannot be sent the new record is removed again, unless a newer
/// issuance has already replaced it.
pub async fn issue_otp<O, M>(
    otps: &O,
    mailer: &M,
    input: IssueOtpInput,
) -> Result<IssueOtpOutput, OtpServiceError>
where
    O: OtpRepository,
    M: Mailer,
{
    let code = generate_code();
    let code_hash = hash_code(&code).await?;

    let now = Utc::now();
    let record = OtpRecord {
        id: Uuid::new_v4(),
        user_id: input.user_id,
        email: input.email,
        code_hash,
        created_at: now,
        expire_at: now + Duration::seconds(OTP_TTL_SECS),
    };
    otps.replace(&record).await?;

    let message = otp_mail(&record.email, code.expose_secret());
    if let Err(e) = mailer.send(&message).await {
        match otps.delete_issuance(&record.email, record.id).await {
            Ok(removed) => warn!(
                email = %record.email,
                issuance_id = %record.id,
                removed,
                "otp mail failed, issued record withdrawn"
            ),
            Err(cleanup) => error!(
                email = %record.email,
                issuance_id = %record.id,
                error = %cleanup,
                "otp mail failed and record cleanup failed"
            ),
        }
        return Err(e);
    }

    info!(email = %record.email, issuance_id = %record.id, "otp issued");
    Ok(IssueOtpOutput {
        issuance_id: record.id,
        expire_at: record.expire_at,
    })
}
