//! Application startup and lifecycle management.
//!
//! Every heavy resource (knowledge base, classifier session, LLM client) is
//! built once here and shared read-only through [`AppState`]. A missing model
//! or rules file stops the process before it binds a port.

use crate::config::DoctormateConfig;
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;
use crate::services::{
    load_classifier, DoctorMateClient, KnowledgeBase, LesionClassifier, SkinAnalysisService,
    SymptomAnalysisService,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware, panic::catch_panic_layer,
    security_headers::security_headers_middleware, tracing::request_id_middleware,
};
use service_core::observability::REQUEST_ID_HEADER;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DoctormateConfig>,
    pub skin: SkinAnalysisService,
    pub symptoms: SymptomAnalysisService,
    pub referrals: DoctorMateClient,
}

impl AppState {
    /// Wire already-built components together.
    pub fn new(
        config: DoctormateConfig,
        classifier: Arc<dyn LesionClassifier>,
        knowledge_base: Arc<KnowledgeBase>,
        text_provider: Arc<dyn TextProvider>,
    ) -> Result<Self, AppError> {
        let referrals = DoctorMateClient::new(&config.doctormate_api)
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        let skin = SkinAnalysisService::new(
            classifier,
            knowledge_base,
            config.classifier.input_size,
        );
        let symptoms = SymptomAnalysisService::new(
            text_provider,
            config.gemini.temperature,
            config.gemini.timeout(),
        );

        Ok(Self {
            config: Arc::new(config),
            skin,
            symptoms,
            referrals,
        })
    }

    /// Load the knowledge base, classifier and Gemini provider from `config`.
    pub fn from_config(config: DoctormateConfig) -> Result<Self, AppError> {
        let knowledge_base = KnowledgeBase::load(config.knowledge_base.rules_path.as_deref())
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load skin knowledge base");
                AppError::ConfigError(anyhow::Error::new(e))
            })?;

        let classifier = load_classifier(
            &config.classifier.model_path,
            config.classifier.intra_threads,
        )
        .map_err(|e| {
            tracing::error!(
                error = %e,
                model = %config.classifier.model_path.display(),
                "Failed to load lesion classifier"
            );
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        let gemini_config = GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.model.clone(),
            base_url: config.gemini.api_base.clone(),
            timeout: config.gemini.timeout(),
        };
        let text_provider: Arc<dyn TextProvider> = Arc::new(
            GeminiTextProvider::new(gemini_config).map_err(|e| {
                tracing::error!(error = %e, "Failed to initialize Gemini provider");
                AppError::ConfigError(anyhow::Error::new(e))
            })?,
        );

        tracing::info!(
            classifier = classifier.name(),
            model = %config.gemini.model,
            "Initialized inference backends"
        );

        Self::new(
            config,
            Arc::from(classifier),
            Arc::new(knowledge_base),
            text_provider,
        )
    }
}

pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .route("/ai/skin/check", post(handlers::check_skin))
        .route("/ai/symptoms/check", post(handlers::check_symptoms))
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(catch_panic_layer())
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: DoctormateConfig) -> Result<Self, AppError> {
        let state = AppState::from_config(config)?;
        Self::with_state(state).await
    }

    /// Bind a listener for an already assembled state (port 0 = random port
    /// for testing).
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();
        tracing::info!(port, "Listening");

        Ok(Self {
            port,
            listener,
            router: build_router(state),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await
    }
}
