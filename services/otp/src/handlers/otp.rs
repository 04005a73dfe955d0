use axum::{
    Json,
    extract::{FromRequest, State},
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::OtpServiceError;
use crate::state::AppState;
use crate::usecase::issue::IssueOtpOutput;
use crate::usecase::resend::{ResendOtpInput, ResendOtpUseCase};
use crate::usecase::verify::{VerifyOtpInput, VerifyOtpOutput, VerifyOtpUseCase};

/// `Json` extractor whose rejections use the service error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(OtpServiceError))]
pub struct JsonBody<T>(pub T);

// ── POST /otp/verify ─────────────────────────────────────────────────────────

/// Absent fields deserialize to empty strings so the use case can answer
/// `MISSING_FIELDS` instead of a framework rejection.
#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "OTP", alias = "otp")]
    pub otp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedUser {
    pub email: String,
    pub is_verified: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: &'static str,
    pub is_verified: bool,
    pub user: VerifiedUser,
}

impl From<VerifyOtpOutput> for VerifyOtpResponse {
    fn from(output: VerifyOtpOutput) -> Self {
        Self {
            success: true,
            message: "verified",
            is_verified: output.verified,
            user: VerifiedUser {
                email: output.email,
                is_verified: output.verified,
            },
        }
    }
}

pub async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<VerifyOtpRequest>,
) -> Result<Json<VerifyOtpResponse>, OtpServiceError> {
    let usecase = VerifyOtpUseCase {
        otps: state.otp_repo(),
    };
    let output = usecase
        .execute(VerifyOtpInput {
            email: body.email,
            code: SecretString::from(body.otp),
        })
        .await?;
    Ok(Json(output.into()))
}

// ── POST /otp/resend ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResendOtpRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendOtpResponse {
    pub success: bool,
    pub message: &'static str,
    #[serde(serialize_with = "happytails_core::serde::to_rfc3339_ms")]
    pub expire_at: DateTime<Utc>,
}

impl From<IssueOtpOutput> for ResendOtpResponse {
    fn from(output: IssueOtpOutput) -> Self {
        Self {
            success: true,
            message: "verification email sent",
            expire_at: output.expire_at,
        }
    }
}

pub async fn resend_otp(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ResendOtpRequest>,
) -> Result<Json<ResendOtpResponse>, OtpServiceError> {
    let usecase = ResendOtpUseCase {
        users: state.user_repo(),
        otps: state.otp_repo(),
        mailer: state.mailer(),
    };
    let output = usecase
        .execute(ResendOtpInput { email: body.email })
        .await?;
    Ok(Json(output.into()))
}
