//! DTO 模块
//!
//! 数据传输对象，用于 API 请求和响应的序列化。

pub mod insight_dto;
pub mod session_dto;

pub use insight_dto::*;
pub use session_dto::*;
