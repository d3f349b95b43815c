//! Routes 模块
//!
//! 定义 API 路由。

pub mod event_routes;
pub mod insight_routes;
pub mod session_routes;
