use std::net::SocketAddr;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::metadata::LevelFilter;

mod routes;

#[tokio::main]
async fn main() {
    configure_logging();

    let port = std::env::var("RAINDUX_API_PORT").ok();
    let port = port.and_then(|x| x.parse().ok()).unwrap_or(3000_u16);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app().into_make_service())
        .await
        .unwrap();
}

fn app() -> Router {
    let cors = CorsLayer::new()
        // allow `GET` and `POST` when accessing the resource
        .allow_methods([Method::GET, Method::POST])
        // allow requests from any origin
        .allow_origin(Any);

    Router::new()
        .route("/", get(|| async { "RainDux Health Bot gateway" }))
        .route("/api/v0/chat", post(routes::chat))
        .layer(cors)
}

fn configure_logging() {
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .with_max_level(LevelFilter::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).unwrap();
}
