//! 会话 DTO
//!
//! 定义评分与画像队列相关的请求和响应数据结构。

use serde::{Deserialize, Serialize};

use crate::models::profile::Profile;
use crate::services::rating::{Decision, RatingOutcome};

/// 评分请求
#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    /// 是否喜欢当前画像
    pub liked: bool,
}

/// 评分响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingResponse {
    pub profile_id: String,
    pub decision: Decision,
    pub interaction_count: u64,
    pub cursor: usize,
    pub remaining: usize,
    /// 本次评分是否触发了补货
    pub replenish_requested: bool,
    /// 本次评分是否触发了分析探测
    pub probe_started: bool,
    /// 评分后的当前画像
    pub next: Option<Profile>,
}

impl RatingResponse {
    pub fn new(outcome: &RatingOutcome, next: Option<Profile>) -> Self {
        Self {
            profile_id: outcome.profile_id.clone(),
            decision: outcome.decision,
            interaction_count: outcome.interaction_count,
            cursor: outcome.cursor,
            remaining: outcome.remaining,
            replenish_requested: outcome.replenish.is_some(),
            probe_started: outcome.probe.is_some(),
            next,
        }
    }
}

/// 当前画像响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentProfileResponse {
    /// 队列耗尽时为 null
    pub profile: Option<Profile>,
    /// 是否正在补货
    pub is_replenishing: bool,
}

/// 补货响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplenishResponse {
    /// 新追加的画像数量，已有请求在途时为 0
    pub appended: usize,
    pub remaining: usize,
}
