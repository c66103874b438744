use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::{collections::HashMap, sync::Arc};

use crate::predictor::Predictor;
use crate::ui;

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
}

#[derive(Deserialize, Debug, Default)]
pub struct IndexParams {
    // checkbox: present ("on") when ticked, absent otherwise
    pub show_constraints: Option<String>,
}

// ---------- Handlers ----------

pub async fn index(State(state): State<AppState>, Query(params): Query<IndexParams>) -> Html<String> {
    let show = params.show_constraints.is_some();
    Html(ui::render_form(state.predictor.registry(), None, show, None))
}

pub async fn predict(
    State(state): State<AppState>,
    Form(raw): Form<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let predictor = &state.predictor;

    let record = match predictor.build_record_from_form(&raw) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(field = e.field(), "rejected submission: {}", e);
            let html = ui::render_form(predictor.registry(), Some(&raw), false, Some(&e.to_string()));
            return (StatusCode::UNPROCESSABLE_ENTITY, Html(html));
        }
    };

    match predictor.run(record) {
        Ok(outcome) => (StatusCode::OK, Html(ui::render_result(predictor.registry(), &outcome))),
        Err(e) => {
            tracing::error!("prediction failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, Html(ui::render_failure()))
        }
    }
}

pub async fn healthz(State(state): State<AppState>) -> (StatusCode, String) {
    if state.predictor.model().is_ready() {
        (StatusCode::OK, "ok: model loaded\n".to_string())
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded: model unavailable\n".to_string())
    }
}

pub fn router(predictor: Arc<Predictor>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/healthz", get(healthz))
        .with_state(AppState { predictor })
}
