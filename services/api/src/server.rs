use crate::cli::ServeArgs;
use crate::infra::{AppState, LogMailer};
use crate::routes::with_verification_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campus_verify::config::AppConfig;
use campus_verify::error::AppError;
use campus_verify::telemetry;
use campus_verify::workflows::notifications::{EmailDispatch, EmailQueue};
use campus_verify::workflows::verification::{
    run_maintenance, InMemoryVerificationStore, VerificationService, VerificationStore,
};
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryVerificationStore::default());
    let (email_queue, _email_workers) = EmailQueue::spawn(Arc::new(LogMailer), &config.email);
    let verification_service = Arc::new(VerificationService::new(
        store,
        Arc::new(email_queue),
        config.verification.clone(),
    ));

    tokio::spawn(maintenance_loop(
        verification_service.clone(),
        config.verification.maintenance_interval,
    ));

    let app = with_verification_routes(verification_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        email_workers = config.email.workers,
        "document verification service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodic expiry, reminder and retention pass. The first tick fires immediately.
async fn maintenance_loop<S, E>(service: Arc<VerificationService<S, E>>, every: Duration)
where
    S: VerificationStore + 'static,
    E: EmailDispatch + 'static,
{
    let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
    loop {
        interval.tick().await;
        if let Err(err) = run_maintenance(service.as_ref(), Utc::now()) {
            warn!(error = %err, "maintenance pass failed");
        }
    }
}
