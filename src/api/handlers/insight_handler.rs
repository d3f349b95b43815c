use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};

use crate::api::{app_state::AppState, dto::insight_dto::*};

pub async fn get_weights(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.weights())
}

pub async fn get_top_weights(
    State(state): State<AppState>,
    Query(params): Query<TopWeightsParams>,
) -> impl IntoResponse {
    Json(TopWeightsResponse {
        deviations: state.engine.top_deviations(params.limit()),
    })
}

pub async fn get_probe(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.probe())
}

pub async fn dismiss_question(State(state): State<AppState>) -> impl IntoResponse {
    Json(DismissResponse {
        dismissed: state.engine.dismiss_question(),
    })
}
