use axum::response::IntoResponse;

// axum handler for the bare root; everything interesting lives under /v1
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
