use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::repository::OtpRepository;
use crate::error::OtpServiceError;

/// Removes records that expired without ever being submitted.
pub struct PurgeExpiredOtpsUseCase<O: OtpRepository> {
    pub otps: O,
}

impl<O: OtpRepository> PurgeExpiredOtpsUseCase<O> {
    pub async fn execute(&self, now: DateTime<Utc>) -> Result<u64, OtpServiceError> {
        let purged = self.otps.purge_expired(now).await?;
        if purged > 0 {
            info!(purged, "expired otp records purged");
        }
        Ok(purged)
    }
}
