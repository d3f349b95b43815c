use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 偏好引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 每次评分的权重增量
    pub weight_increment: f64,
    /// 权重下限
    pub weight_floor: f64,
    /// 未见过的属性值的基线权重
    pub baseline_weight: f64,
    /// 未消费画像低于该值时触发补货
    pub low_water_mark: usize,
    /// 每次补货请求的画像数量
    pub batch_size: usize,
    /// 每隔多少次交互触发一次分析探测
    pub probe_cadence: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weight_increment: 0.2,
            weight_floor: 0.1,
            baseline_weight: 1.0,
            low_water_mark: 5,
            batch_size: 15,
            probe_cadence: 10,
        }
    }
}

/// 外部服务提供方配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// 后端类型: "gemini" 或 "simple"
    pub backend: String,
    /// Gemini API 密钥
    pub api_key: String,
    /// Generative Language API 地址
    pub base_url: String,
    /// 模型名称
    pub model: String,
    /// 外部调用超时（秒）
    pub request_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: "simple".into(),
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-3-flash-preview".into(),
            request_timeout_secs: 30,
        }
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// 引擎配置
    pub engine: EngineConfig,
    /// 外部服务配置
    pub provider: ProviderConfig,
    /// 服务器配置
    pub server: ServerConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}
