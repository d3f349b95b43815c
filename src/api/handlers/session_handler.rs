use axum::{Json, extract::State, response::IntoResponse};
use tracing::debug;

use crate::{
    api::{app_state::AppState, dto::session_dto::*},
    error::AppError,
    services::rating::Decision,
};

pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.overview())
}

pub async fn get_current_profile(State(state): State<AppState>) -> impl IntoResponse {
    let overview = state.engine.overview();
    Json(CurrentProfileResponse {
        profile: overview.current,
        is_replenishing: overview.is_replenishing,
    })
}

pub async fn rate_profile(
    State(state): State<AppState>,
    Json(request): Json<RatingRequest>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Rating current profile: liked={}", request.liked);

    let outcome = state.engine.rate(Decision::from(request.liked))?;
    let next = state.engine.current_profile();

    Ok(Json(RatingResponse::new(&outcome, next)))
}

pub async fn replenish_feed(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    debug!("Explicit feed replenish requested");

    let appended = state.engine.replenish().await?;
    let remaining = state.engine.overview().remaining;

    Ok(Json(ReplenishResponse {
        appended,
        remaining,
    }))
}
