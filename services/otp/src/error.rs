use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// OTP service error variants. Clients match on `kind`, not on `message`.
#[derive(Debug, thiserror::Error)]
pub enum OtpServiceError {
    #[error("empty otp details")]
    MissingFields,
    /// The body is not JSON, or a field has the wrong type.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("no such user exists")]
    UserNotFound,
    #[error("account already verified")]
    AlreadyVerified,
    /// No pending record: never issued, already consumed, or superseded.
    #[error("account is either invalid or already been verified")]
    OtpNotFound,
    #[error("otp has expired, please request again")]
    OtpExpired,
    #[error("invalid otp, try again")]
    InvalidOtp,
    #[error("failed to send verification email")]
    MailDelivery(#[source] anyhow::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl OtpServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingFields => "MISSING_FIELDS",
            Self::InvalidBody(_) => "INVALID_BODY",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::AlreadyVerified => "ALREADY_VERIFIED",
            Self::OtpNotFound => "OTP_NOT_FOUND",
            Self::OtpExpired => "OTP_EXPIRED",
            Self::InvalidOtp => "INVALID_OTP",
            Self::MailDelivery(_) => "MAIL_DELIVERY",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields
            | Self::InvalidBody(_)
            | Self::OtpNotFound
            | Self::OtpExpired => StatusCode::BAD_REQUEST,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::AlreadyVerified => StatusCode::CONFLICT,
            Self::InvalidOtp => StatusCode::UNAUTHORIZED,
            Self::MailDelivery(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for OtpServiceError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for OtpServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        // 4xx are expected client outcomes and already show up in the trace layer.
        match &self {
            Self::Internal(e) => tracing::error!(error = %e, kind = "INTERNAL", "internal error"),
            Self::MailDelivery(e) => {
                tracing::error!(error = %e, kind = "MAIL_DELIVERY", "mail delivery failed")
            }
            _ => {}
        }
        let body = serde_json::json!({
            "success": false,
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
