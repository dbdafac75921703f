use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use converters::{handle_convert, ConvertRequest, ConvertResponse};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/convert", post(convert));

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 8080)).await?;
    tracing::info!("listening on http://127.0.0.1:8080");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn convert(Json(req): Json<ConvertRequest>) -> Result<Json<ConvertResponse>, (StatusCode, Json<serde_json::Value>)> {
    let route = format!("{}->{}", req.from, req.to);
    match handle_convert(req) {
        Ok(resp) => Ok(Json(resp)),
        Err(e) => {
            tracing::warn!(%route, "convert failed: {e:#}");
            Err((StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": format!("{e:#}") }))))
        }
    }
}
