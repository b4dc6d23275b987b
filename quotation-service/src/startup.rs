use crate::config::{DatabaseBackend, QuotationConfig};
use crate::handlers;
use crate::services::{InMemoryStore, MongoDb, QuotationService};
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    make_request_span, metrics_middleware, request_id_middleware, security_headers_middleware,
};
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::pin::Pin;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: QuotationConfig,
    pub service: QuotationService,
}

type Server = Pin<Box<dyn Future<Output = std::io::Result<()>> + Send>>;

pub struct Application {
    port: u16,
    server: Server,
    state: AppState,
}

impl Application {
    pub async fn build(config: QuotationConfig) -> Result<Self, AppError> {
        let prefix = config.numbering.prefix.clone();

        let service = match config.database.backend {
            DatabaseBackend::Mongodb => {
                let mongo = config.database.mongodb.as_ref().ok_or_else(|| {
                    AppError::ConfigError(anyhow::anyhow!("MongoDB settings are missing"))
                })?;
                let db = MongoDb::connect(&mongo.uri, &mongo.database)
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to connect to MongoDB: {}", e);
                        e
                    })?;
                db.initialize_indexes().await.map_err(|e| {
                    tracing::error!("Failed to initialize database indexes: {}", e);
                    e
                })?;
                QuotationService::with_backend(db, &prefix)
            }
            DatabaseBackend::Memory => {
                tracing::warn!("Using in-memory store; data will not survive a restart");
                QuotationService::with_backend(InMemoryStore::new(), &prefix)
            }
        };

        Self::build_with_service(config, service).await
    }

    /// Serve an already wired service. Numbering and listing limits still
    /// come from `config`.
    pub async fn build_with_service(
        config: QuotationConfig,
        service: QuotationService,
    ) -> Result<Self, AppError> {
        let service = service
            .with_max_attempts(config.numbering.max_attempts)
            .with_max_page_size(config.listing.max_page_size);

        let state = AppState {
            config: config.clone(),
            service,
        };

        let app = router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::pin(server.into_future()),
            state,
        })
    }

    pub fn service(&self) -> &QuotationService {
        &self.state.service
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub fn router(state: AppState) -> Router {
    let quotations = Router::new()
        .route(
            "/",
            get(handlers::list_quotations).post(handlers::create_quotation),
        )
        .route("/preview", post(handlers::preview_quotation))
        .route("/generate-number", get(handlers::generate_number))
        .route("/bulk-delete", post(handlers::bulk_delete))
        .route("/bulk-update", post(handlers::bulk_update))
        .route(
            "/:id",
            get(handlers::get_quotation)
                .put(handlers::update_quotation)
                .delete(handlers::delete_quotation),
        )
        .route("/:id/status", patch(handlers::update_status))
        .route("/:id/convert", post(handlers::convert_quotation));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .nest("/api/quotations", quotations)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
