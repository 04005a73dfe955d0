use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use happytails_core::health::healthz;
use happytails_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    health::readyz,
    otp::{resend_otp, verify_otp},
};
use crate::state::AppState;

pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // OTP
        .route("/otp/verify", post(verify_otp))
        .route("/otp/resend", post(resend_otp))
        .with_state(state)
        .layer(cors)
        .layer(propagate_request_id_layer())
        .layer(trace_layer())
        // Outermost, so the trace span sees the id.
        .layer(request_id_layer())
}
