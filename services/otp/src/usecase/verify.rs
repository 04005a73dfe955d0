use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::domain::repository::OtpRepository;
use crate::error::OtpServiceError;
use crate::usecase::hashing::verify_code;

pub struct VerifyOtpInput {
    pub email: String,
    pub code: SecretString,
}

#[derive(Debug)]
pub struct VerifyOtpOutput {
    pub email: String,
    pub verified: bool,
}

pub struct VerifyOtpUseCase<O: OtpRepository> {
    pub otps: O,
}

impl<O: OtpRepository> VerifyOtpUseCase<O> {
    pub async fn execute(&self, input: VerifyOtpInput) -> Result<VerifyOtpOutput, OtpServiceError> {
        if input.email.trim().is_empty() || input.code.expose_secret().trim().is_empty() {
            return Err(OtpServiceError::MissingFields);
        }

        let record = self
            .otps
            .find_by_email(&input.email)
            .await?
            .ok_or(OtpServiceError::OtpNotFound)?;

        // Only the issuance that was read: a concurrent resend may already
        // have stored a fresh one.
        if record.is_expired_at(Utc::now()) {
            self.otps.delete_issuance(&input.email, record.id).await?;
            info!(email = %input.email, issuance_id = %record.id, "expired otp removed");
            return Err(OtpServiceError::OtpExpired);
        }

        // A wrong code leaves the record in place so the user can retry.
        if !verify_code(&record.code_hash, &input.code).await? {
            return Err(OtpServiceError::InvalidOtp);
        }

        // Lost a race with a concurrent verify or resend.
        if !self.otps.consume_and_verify(&record).await? {
            return Err(OtpServiceError::OtpNotFound);
        }

        info!(email = %input.email, issuance_id = %record.id, "account verified");
        Ok(VerifyOtpOutput {
            email: input.email,
            verified: true,
        })
    }
}
