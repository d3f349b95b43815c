//! 分析 DTO

use serde::{Deserialize, Serialize};

use crate::models::weights::WeightDeviation;

const DEFAULT_TOP_LIMIT: usize = 10;

/// 权重偏离查询参数
#[derive(Debug, Deserialize, Default)]
pub struct TopWeightsParams {
    pub limit: Option<usize>,
}

impl TopWeightsParams {
    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_TOP_LIMIT)
    }
}

/// 权重偏离响应
#[derive(Debug, Serialize)]
pub struct TopWeightsResponse {
    pub deviations: Vec<WeightDeviation>,
}

/// 清除追问响应
#[derive(Debug, Serialize)]
pub struct DismissResponse {
    pub dismissed: bool,
}
