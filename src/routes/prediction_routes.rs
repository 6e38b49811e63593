use axum::{
    Router,
    response::Html,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use crate::api_docs::ApiDoc;
use crate::controllers::prediction_controller::{
    get_prediction_history, health, not_found, predict_solar_power,
};
use crate::shared_state::AppState;

/// Build the `/api/*` sub-router. State is supplied once by [`app`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict_solar_power))
        .route("/history", get(get_prediction_history))
}

/// Full application router: API, health check, API reference UI.
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(health))
        .route("/scalar", get(|| async {
            Html(Scalar::new(ApiDoc::openapi()).to_html())
        }))
        .fallback(not_found)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
