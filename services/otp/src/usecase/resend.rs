use crate::domain::repository::{Mailer, OtpRepository, UserRepository};
use crate::error::OtpServiceError;
use crate::usecase::issue::{IssueOtpInput, IssueOtpOutput, issue_otp};

pub struct ResendOtpInput {
    pub email: String,
}

pub struct ResendOtpUseCase<U, O, M>
where
    U: UserRepository,
    O: OtpRepository,
    M: Mailer,
{
    pub users: U,
    pub otps: O,
    pub mailer: M,
}

impl<U, O, M> ResendOtpUseCase<U, O, M>
where
    U: UserRepository,
    O: OtpRepository,
    M: Mailer,
{
    /// Issue a new code for an unverified account. The previous pending code,
    /// if any, is replaced and stops validating.
    pub async fn execute(&self, input: ResendOtpInput) -> Result<IssueOtpOutput, OtpServiceError> {
        if input.email.trim().is_empty() {
            return Err(OtpServiceError::MissingFields);
        }

        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or(OtpServiceError::UserNotFound)?;

        if user.verified {
            return Err(OtpServiceError::AlreadyVerified);
        }

        issue_otp(
            &self.otps,
            &self.mailer,
            IssueOtpInput {
                user_id: user.id,
                email: user.email,
            },
        )
        .await
    }
}
