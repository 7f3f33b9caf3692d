use doctormate_service::config::DoctormateConfig;
use doctormate_service::services::metrics::init_metrics;
use doctormate_service::Application;
use service_core::observability::init_tracing;
use tokio::signal;

const SERVICE_NAME: &str = "doctormate-service";

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // Load configuration - fail fast if invalid
    let config = DoctormateConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    init_tracing(
        SERVICE_NAME,
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    tracing::info!(
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        port = config.common.port,
        "Starting DoctorMate AI service"
    );

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!(error = ?e, "Failed to build application");
        std::io::Error::other(e.to_string())
    })?;

    application.run_until_stopped(shutdown_signal()).await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
