//! 分析探测结果模型

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// 预言机未给出问题时使用的默认问题
pub const FALLBACK_QUESTION: &str =
    "What specific detail about your recent likes stands out most to you?";

/// 地理热点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    /// 城市
    pub city: String,
    /// 国家或地区
    pub country: String,
    /// 推荐理由
    pub reason: String,
    /// 匹配度，取值 [0, 1]
    pub match_score: f64,
}

impl Hotspot {
    pub fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(AppError::MalformedResponse(
                "hotspot city must not be empty".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.match_score) {
            return Err(AppError::MalformedResponse(format!(
                "hotspot {} match score {} outside [0, 1]",
                self.city, self.match_score
            )));
        }
        Ok(())
    }
}

/// 洞察报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightReport {
    /// 摘要
    pub summary: String,
    /// 主导特征标签
    pub dominant_traits: Vec<String>,
    /// 心理画像描述
    #[serde(default)]
    pub psychological_profile: Option<String>,
}

impl InsightReport {
    pub fn validate(&self) -> Result<()> {
        if self.summary.trim().is_empty() {
            return Err(AppError::MalformedResponse(
                "insight report summary must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// 将预言机返回的问题文本规范化，空文本回退为默认问题
pub fn normalize_question(text: Option<&str>) -> String {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_QUESTION.to_string())
}

/// 一次探测中三个调用各自的结果
#[derive(Debug)]
pub struct ProbeOutcome {
    pub question: Result<String>,
    pub hotspots: Result<Vec<Hotspot>>,
    pub report: Result<InsightReport>,
}

impl ProbeOutcome {
    /// 失败调用的数量
    pub fn failures(&self) -> usize {
        [
            self.question.is_err(),
            self.hotspots.is_err(),
            self.report.is_err(),
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }
}

/// 最近一次成功的探测结果
///
/// 三个字段彼此独立：首次成功前为空，之后每个字段被整体覆盖，不做合并。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    pub refining_question: Option<String>,
    pub hotspots: Option<Vec<Hotspot>>,
    pub report: Option<InsightReport>,
}

/// 本次合并更新了哪些字段
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProbeFieldsUpdated {
    pub question: bool,
    pub hotspots: bool,
    pub report: bool,
}

impl ProbeResult {
    /// 用探测结果覆盖成功的字段，失败字段保留旧值
    pub fn apply(&mut self, outcome: ProbeOutcome) -> ProbeFieldsUpdated {
        let mut updated = ProbeFieldsUpdated::default();

        if let Ok(question) = outcome.question {
            self.refining_question = Some(question);
            updated.question = true;
        }
        if let Ok(hotspots) = outcome.hotspots {
            self.hotspots = Some(hotspots);
            updated.hotspots = true;
        }
        if let Ok(report) = outcome.report {
            self.report = Some(report);
            updated.report = true;
        }

        updated
    }

    /// 清除当前的问题
    pub fn dismiss_question(&mut self) -> bool {
        self.refining_question.take().is_some()
    }
}
