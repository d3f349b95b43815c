//! 可观测性模块
//!
//! 提供 Prometheus 文本格式指标、结构化日志初始化和健康检查。

use axum::{Json, Router, response::IntoResponse, routing::get};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};

// ===== Engine Metrics =====

/// 引擎指标
#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub ratings_total: AtomicU64,
    pub likes_total: AtomicU64,
    pub passes_total: AtomicU64,
    pub replenish_requests_total: AtomicU64,
    pub replenish_failures_total: AtomicU64,
    pub profiles_received_total: AtomicU64,
    pub probes_total: AtomicU64,
    pub oracle_failures_total: AtomicU64,
    pub http_requests_total: AtomicU64,
}

impl EngineMetrics {
    /// 记录评分
    pub fn record_rating(&self, liked: bool) {
        self.ratings_total.fetch_add(1, Ordering::SeqCst);
        if liked {
            self.likes_total.fetch_add(1, Ordering::SeqCst);
        } else {
            self.passes_total.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 记录补货结果
    pub fn record_replenish(&self, received: Option<usize>) {
        self.replenish_requests_total.fetch_add(1, Ordering::SeqCst);
        match received {
            Some(n) => {
                self.profiles_received_total
                    .fetch_add(n as u64, Ordering::SeqCst);
            }
            None => {
                self.replenish_failures_total.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// 记录一次探测及其中失败的调用数
    pub fn record_probe(&self, failures: usize) {
        self.probes_total.fetch_add(1, Ordering::SeqCst);
        self.oracle_failures_total
            .fetch_add(failures as u64, Ordering::SeqCst);
    }

    pub fn record_http_request(&self) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        let counters = [
            ("ratings_total", "Total rating decisions", &self.ratings_total),
            ("likes_total", "Ratings that liked the profile", &self.likes_total),
            ("passes_total", "Ratings that passed on the profile", &self.passes_total),
            (
                "replenish_requests_total",
                "Profile source requests",
                &self.replenish_requests_total,
            ),
            (
                "replenish_failures_total",
                "Failed profile source requests",
                &self.replenish_failures_total,
            ),
            (
                "profiles_received_total",
                "Profiles appended to the feed",
                &self.profiles_received_total,
            ),
            ("probes_total", "Completed analysis probes", &self.probes_total),
            (
                "oracle_failures_total",
                "Failed analysis oracle calls",
                &self.oracle_failures_total,
            ),
            (
                "http_requests_total",
                "Total HTTP requests",
                &self.http_requests_total,
            ),
        ];

        counters
            .iter()
            .map(|(name, help, value)| {
                format!(
                    "# HELP {name} {help}\n# TYPE {name} counter\n{name} {}\n",
                    value.load(Ordering::SeqCst)
                )
            })
            .collect()
    }
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub backend: String,
}

/// 可观测性状态
#[derive(Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<EngineMetrics>,
    pub start_time: DateTime<Utc>,
    pub version: String,
    pub backend: String,
}

impl ObservabilityState {
    pub fn new(version: String, backend: String, metrics: Arc<EngineMetrics>) -> Self {
        Self {
            metrics,
            start_time: Utc::now(),
            version,
            backend,
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

// ===== Health Check Handlers =====

/// 获取完整健康状态
pub async fn health_check(
    state: axum::extract::State<Arc<ObservabilityState>>,
) -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        backend: state.backend.clone(),
    })
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// Prometheus 指标端点
pub async fn metrics(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, state.metrics.gather())
}

/// 版本信息端点
pub async fn version(state: axum::extract::State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "version": state.version,
        "uptimeSeconds": state.uptime_seconds(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(liveness))
        .route("/metrics", get(metrics))
        .route("/version", get(version))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外按天滚动写入文件，
/// 返回的 guard 需要在进程生命周期内持有。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{},allure={}", config.level, config.level)))
        .map_err(|e| AppError::Config(e.to_string()))?;

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "allure.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().json().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    let (json_layer, text_layer) = if config.structured {
        (Some(fmt::layer().json().with_target(true)), None)
    } else {
        (
            None,
            Some(fmt::layer().with_target(true).with_line_number(true)),
        )
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(guard)
}

// ===== Request Metrics Middleware =====

/// 记录请求计数的中间件
pub async fn metrics_middleware(
    axum::extract::State(metrics): axum::extract::State<Arc<EngineMetrics>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    metrics.record_http_request();
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_gather() {
        let metrics = EngineMetrics::default();
        metrics.record_rating(true);
        metrics.record_rating(false);
        metrics.record_replenish(Some(15));
        metrics.record_replenish(None);
        metrics.record_probe(2);

        let output = metrics.gather();
        assert!(output.contains("ratings_total 2"));
        assert!(output.contains("likes_total 1"));
        assert!(output.contains("passes_total 1"));
        assert!(output.contains("replenish_requests_total 2"));
        assert!(output.contains("replenish_failures_total 1"));
        assert!(output.contains("profiles_received_total 15"));
        assert!(output.contains("oracle_failures_total 2"));
        assert!(output.contains("# TYPE probes_total counter"));
    }

    #[test]
    fn test_health_status_structure() {
        let status = HealthStatus {
            status: "healthy".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            version: "1.0.0".to_string(),
            uptime_seconds: 3600.0,
            backend: "simple".to_string(),
        };

        assert_eq!(status.status, "healthy");
        assert_eq!(status.backend, "simple");
    }
}
