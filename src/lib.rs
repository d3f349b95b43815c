//! Allure - 偏好权重引擎
//!
//! 用户对生成的候选画像逐个做出喜欢/跳过的决定，引擎据此维护按属性值划分的偏好权重，
//! 保持候选队列充足，并按固定节奏请求外部预言机做更深入的分析。

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod providers;
pub mod services;
