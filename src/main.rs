use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;

mod audit;
mod claims;
mod config;
mod middleware;
mod signer;
mod telemetry;
mod token;

pub struct AppState {
    settings: config::Settings,
}

#[tokio::main]
async fn main() {
    let settings = config::load_config();
    let _otel_guard = telemetry::init(&settings.telemetry);

    if !settings.credentials.is_configured() {
        tracing::warn!(
            "signing credentials are not configured; all token requests will be rejected"
        );
    }

    let shared_state = Arc::new(AppState { settings });

    // build our application with a route
    let app = Router::new()
        .route("/", get(root))
        .route("/token", post(token::issue_token))
        .layer(middleware::TraceParentLayer::new())
        .with_state(shared_state.clone());

    // run our app with hyper
    let addr = SocketAddr::from(([127, 0, 0, 1], shared_state.settings.port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

// basic handler that responds with a static string
async fn root() -> &'static str {
    "greenroom is running"
}
