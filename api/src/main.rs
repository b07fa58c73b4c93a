use std::net::SocketAddr;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod audit;
mod config;
mod error;
mod extract;
mod hcaptcha;
mod middleware;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatehouse API",
        version = "0.1.0",
        description = "Traffic gate that classifies inbound clicks as human or bot through a \
                       layered risk-scoring pipeline and redirects them accordingly."
    ),
    paths(
        routes::health::health_check,
        routes::gate::entry,
        routes::verify::verify_submission,
        routes::admin::reset_suspicious,
        routes::admin::test_log,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::verify::VerifySubmission,
        routes::verify::VerifyResponse,
        routes::admin::ResetResponse,
        routes::admin::TestLogResponse,
        gatehouse_core::error::ApiError,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(
                utoipa::openapi::security::Http::new(
                    utoipa::openapi::security::HttpAuthScheme::Bearer,
                ),
            ),
        );
    }
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatehouse_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let gate_config = config::GateConfig::from_env().expect("invalid configuration");
    let port = gate_config.port;

    let audit = audit::AuditLogger::spawn(gate_config.audit_sink_url.clone());
    let app_state = state::AppState::new(gate_config, audit);

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::gate::router())
        .merge(routes::verify::router().layer(middleware::rate_limit::verify_layer()))
        .merge(routes::admin::router().layer(middleware::rate_limit::admin_layer()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Gatehouse API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
