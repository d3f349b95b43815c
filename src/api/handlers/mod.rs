//! Handlers 模块
//!
//! HTTP 请求处理程序。处理程序只读取状态和转发用户决定，不包含引擎逻辑。

pub mod event_handler;
pub mod insight_handler;
pub mod session_handler;

pub use event_handler::*;
pub use insight_handler::*;
pub use session_handler::*;
