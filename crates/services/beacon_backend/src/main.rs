// File: services/beacon_backend/src/main.rs
use axum::{routing::get, Router};
use beacon_common::{config_error, internal_error, logging, BeaconError};
use beacon_config::{load_config, AppConfig};
use beacon_firebase::{routes as firebase_routes, FirebaseServiceFactory};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Builds the application router: everything under `/api`, plus Swagger UI
/// with the `openapi` feature.
async fn build_app(config: Arc<AppConfig>) -> Result<Router, BeaconError> {
    let mut router = Router::new().route("/", get(|| async { "Welcome to Beacon API!" }));

    if config.use_firebase {
        let service = FirebaseServiceFactory::new(config.clone())
            .notification_service()
            .await?;
        router = router.merge(firebase_routes(Arc::new(service)));
    } else {
        warn!("use_firebase is off; notification routes are not mounted");
    }

    #[allow(unused_mut)]
    let mut app = Router::new().nest("/api", router);

    #[cfg(feature = "openapi")]
    {
        use beacon_firebase::openapi::FirebaseApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        #[derive(OpenApi)]
        #[openapi(
            info(
                title = "Beacon API",
                version = "0.1.0",
                description = "Beacon push notification API",
                license(name = "MIT", url = "https://opensource.org/licenses/MIT")
            ),
            servers((url = "/api", description = "Main API Prefix")),
        )]
        struct ApiDoc;

        let mut openapi_doc = ApiDoc::openapi();
        openapi_doc.merge(FirebaseApiDoc::openapi());
        info!("Adding Swagger UI at /api/docs");
        app = app.merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc));
    }

    Ok(app.layer(TraceLayer::new_for_http()))
}

#[tokio::main]
async fn main() -> Result<(), BeaconError> {
    logging::init();

    let config = logging::log_result(
        load_config(),
        "Configuration loaded",
        "Failed to load configuration",
    )
    .map_err(config_error)?;
    let config = Arc::new(config);

    let app = build_app(config.clone()).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| internal_error(format!("failed to bind {addr}: {e}")))?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
