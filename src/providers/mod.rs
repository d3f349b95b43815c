//! 外部服务提供方
//!
//! 画像源与分析预言机都通过 trait 注入引擎，生命周期由组装它们的应用持有。

pub mod gemini;
pub mod simple;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::config::ProviderConfig;
use crate::error::{AppError, Result};
use crate::models::probe::{Hotspot, InsightReport};
use crate::models::profile::Profile;
use crate::models::weights::WeightSnapshot;

pub use gemini::GeminiClient;
pub use simple::{SimpleAnalysisOracle, SimpleProfileSource};

/// 画像源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// 请求 `count` 个候选画像，返回顺序不作保证
    async fn generate_profiles(&self, count: usize) -> Result<Vec<Profile>>;
}

/// 分析预言机
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisOracle: Send + Sync {
    /// 生成一个帮助区分相关与因果的追问
    async fn refining_question(&self, snapshot: &WeightSnapshot) -> Result<String>;

    /// 推断地理热点
    async fn hotspots(&self, snapshot: &WeightSnapshot) -> Result<Vec<Hotspot>>;

    /// 生成洞察报告
    async fn insight_report(&self, snapshot: &WeightSnapshot) -> Result<InsightReport>;
}

/// 将底层错误归类为画像源错误，schema 错误保持原样
pub(crate) fn source_error(err: AppError) -> AppError {
    match err {
        AppError::MalformedResponse(_) | AppError::SourceUnavailable(_) => err,
        other => AppError::SourceUnavailable(other.to_string()),
    }
}

/// 将底层错误归类为预言机错误，schema 错误保持原样
pub(crate) fn oracle_error(err: AppError) -> AppError {
    match err {
        AppError::MalformedResponse(_) | AppError::OracleUnavailable(_) => err,
        other => AppError::OracleUnavailable(other.to_string()),
    }
}

/// 按配置创建画像源与分析预言机
pub fn create_providers(
    config: &ProviderConfig,
) -> Result<(Arc<dyn ProfileSource>, Arc<dyn AnalysisOracle>)> {
    match config.backend.as_str() {
        "gemini" => {
            let client = Arc::new(GeminiClient::new(config)?);
            Ok((client.clone(), client))
        }
        "simple" => Ok((
            Arc::new(SimpleProfileSource::new()),
            Arc::new(SimpleAnalysisOracle::new()),
        )),
        other => Err(AppError::Config(format!("unknown provider backend: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert_eq!(
            source_error(AppError::Http("502".into())),
            AppError::SourceUnavailable("http error: 502".into())
        );
        assert!(matches!(
            source_error(AppError::MalformedResponse("x".into())),
            AppError::MalformedResponse(_)
        ));
        assert!(matches!(
            oracle_error(AppError::Timeout("slow".into())),
            AppError::OracleUnavailable(_)
        ));
    }

    #[test]
    fn test_unknown_backend() {
        let config = ProviderConfig {
            backend: "carrier-pigeon".into(),
            ..Default::default()
        };
        assert!(matches!(create_providers(&config), Err(AppError::Config(_))));
    }

    #[test]
    fn test_simple_backend_builds() {
        assert!(create_providers(&ProviderConfig::default()).is_ok());
    }
}
