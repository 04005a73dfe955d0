use std::time::Duration;

use anyhow::Context as _;
use chrono::Utc;
use sea_orm::Database;
use tokio::signal;
use tracing::{error, info};

use happytails_core::config::Config;
use happytails_core::middleware::cors_layer;
use happytails_core::tracing::init_tracing;

use happytails_otp::config::OtpConfig;
use happytails_otp::infra::mail::SmtpMailer;
use happytails_otp::router::build_router;
use happytails_otp::state::AppState;
use happytails_otp::usecase::purge::PurgeExpiredOtpsUseCase;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");

    let config = OtpConfig::from_env().context("load config from environment")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;

    let mailer = SmtpMailer::new(config.smtp_settings()?);
    let cors = cors_layer(&config.cors_origin).context("invalid CORS_ORIGIN")?;

    let state = AppState { db, mailer };

    if let Some(every) = config.purge_interval() {
        spawn_purge_task(state.clone(), every);
    }

    let router = build_router(state, cors);
    let addr = format!("0.0.0.0:{}", config.otp_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    info!("otp service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    info!("otp service stopped");
    Ok(())
}

fn spawn_purge_task(state: AppState, every: Duration) {
    tokio::spawn(async move {
        info!(every_secs = every.as_secs(), "expired otp purge started");
        let usecase = PurgeExpiredOtpsUseCase {
            otps: state.otp_repo(),
        };
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = usecase.execute(Utc::now()).await {
                error!(error = ?e, "expired otp purge failed");
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
