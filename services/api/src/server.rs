use crate::cli::ServeArgs;
use crate::infra::{seed_campus, AppState, LoggingEventPublisher};
use crate::routes::with_core_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hostel_allocation::allocation::AllocationCore;
use hostel_allocation::config::AppConfig;
use hostel_allocation::error::AppError;
use hostel_allocation::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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

    let events = Arc::new(LoggingEventPublisher::default());
    let core = Arc::new(AllocationCore::new(&config.allocation.session, events));
    if args.seed {
        if let Err(err) = seed_campus(&core) {
            warn!(%err, "sample campus could not be seeded");
        }
    }

    let app = with_core_routes(core)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, session = %config.allocation.session, "hostel allocation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
