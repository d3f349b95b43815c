//! Session Routes
//!
//! 定义会话、当前画像、评分与补货的 API 路由。

use crate::api::handlers::session_handler::*;
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::app_state::AppState;

/// 创建会话路由器
pub fn create_session_router() -> Router<AppState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/profiles/current", get(get_current_profile))
        .route("/ratings", post(rate_profile))
        .route("/feed/replenish", post(replenish_feed))
}
