use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::PathBuf;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序：
    /// 1. 内置默认值
    /// 2. ./allure.toml
    /// 3. 环境变量（`ALLURE_` 前缀，`__` 分隔层级）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: PathBuf) -> Result<AppConfig, figment::Error> {
        Self::figment(path).extract()
    }

    fn figment(path: PathBuf) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("ALLURE_").split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        let engine = &config.engine;

        if engine.probe_cadence == 0 {
            return Err(ConfigValidationError::InvalidCadence);
        }

        if engine.batch_size == 0 {
            return Err(ConfigValidationError::InvalidBatchSize);
        }

        if !(engine.weight_increment > 0.0) {
            return Err(ConfigValidationError::InvalidIncrement(engine.weight_increment));
        }

        if !(engine.weight_floor > 0.0 && engine.weight_floor <= engine.baseline_weight) {
            return Err(ConfigValidationError::InvalidFloor {
                floor: engine.weight_floor,
                baseline: engine.baseline_weight,
            });
        }

        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.provider.backend == "gemini" && config.provider.api_key.trim().is_empty() {
            return Err(ConfigValidationError::MissingApiKey);
        }

        if config.provider.request_timeout_secs == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("probe cadence must be greater than 0")]
    InvalidCadence,

    #[error("batch size must be greater than 0")]
    InvalidBatchSize,

    #[error("weight increment must be positive, got {0}")]
    InvalidIncrement(f64),

    #[error("weight floor {floor} must lie in (0, {baseline}]")]
    InvalidFloor { floor: f64, baseline: f64 },

    #[error("server port must be greater than 0")]
    InvalidPort,

    #[error("gemini backend requires provider.api_key")]
    MissingApiKey,

    #[error("request timeout must be greater than 0")]
    InvalidTimeout,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("allure.toml")
}

/// 检查配置文件是否存在
pub fn config_exists() -> bool {
    default_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.engine.low_water_mark, 5);
        assert_eq!(config.engine.batch_size, 15);
        assert_eq!(config.engine.probe_cadence, 10);
    }

    #[test]
    fn test_rejects_zero_cadence() {
        let mut config = AppConfig::default();
        config.engine.probe_cadence = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidCadence)
        );
    }

    #[test]
    fn test_rejects_floor_above_baseline() {
        let mut config = AppConfig::default();
        config.engine.weight_floor = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidFloor { .. })
        ));
    }

    #[test]
    fn test_rejects_zero_floor() {
        let mut config = AppConfig::default();
        config.engine.weight_floor = 0.0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidFloor {
                floor: 0.0,
                baseline: 1.0
            })
        );
    }

    #[test]
    fn test_gemini_requires_api_key() {
        let mut config = AppConfig::default();
        config.provider.backend = "gemini".into();
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingApiKey)
        );

        config.provider.api_key = "key".into();
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_load_from_toml_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "allure.toml",
                r#"
                [engine]
                probe_cadence = 4

                [server]
                port = 9090
                "#,
            )?;
            jail.set_env("ALLURE_ENGINE__BATCH_SIZE", "20");

            let config = ConfigLoader::load().expect("config loads");
            assert_eq!(config.engine.probe_cadence, 4);
            assert_eq!(config.engine.batch_size, 20);
            assert_eq!(config.server.port, 9090);
            assert_eq!(config.engine.low_water_mark, 5);
            Ok(())
        });
    }
}
