use axum::{routing::get, Router};

pub mod catalog;
pub mod receiving;
pub mod system;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/receiving", receiving::router())
        .nest("/catalog", catalog::router())
}
