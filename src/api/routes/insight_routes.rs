//! Insight Routes
//!
//! 权重快照与分析探测结果。

use crate::api::handlers::insight_handler::*;
use axum::{
    Router,
    routing::{delete, get},
};

use crate::api::app_state::AppState;

pub fn create_insight_router() -> Router<AppState> {
    Router::new()
        .route("/weights", get(get_weights))
        .route("/weights/top", get(get_top_weights))
        .route("/probe", get(get_probe))
        .route("/probe/question", delete(dismiss_question))
}
