use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "DIALOG_RESOLVER_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 搜索路径：
    /// 1. ./config.toml
    /// 2. 环境变量（`DIALOG_RESOLVER_RESOLVER__CACHE_TTL_SECONDS=60`）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(figment::providers::Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__").global())
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.server.port == 0 {
            return Err(ConfigValidationError::InvalidPort);
        }

        if config.delivery.base_url.is_empty() {
            return Err(ConfigValidationError::MissingDeliveryUrl);
        }

        let resolver = &config.resolver;
        if resolver.caching_enabled && resolver.cache_ttl_seconds == 0 {
            return Err(ConfigValidationError::InvalidTtl);
        }

        if resolver.default_language.is_empty() {
            return Err(ConfigValidationError::MissingDefaultLanguage);
        }

        if !resolver
            .supported_languages
            .iter()
            .any(|lang| lang == &resolver.default_language)
        {
            return Err(ConfigValidationError::UnsupportedDefaultLanguage(
                resolver.default_language.clone(),
            ));
        }

        if !resolver.spatial_radius.is_finite() || resolver.spatial_radius <= 0.0 {
            return Err(ConfigValidationError::InvalidSpatialRadius(
                resolver.spatial_radius,
            ));
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigValidationError {
    #[error("服务端口无效，必须大于 0")]
    InvalidPort,

    #[error("交付 API 地址未配置")]
    MissingDeliveryUrl,

    #[error("启用缓存时 TTL 必须大于 0")]
    InvalidTtl,

    #[error("默认语言未配置")]
    MissingDefaultLanguage,

    #[error("默认语言不在支持列表中: {0}")]
    UnsupportedDefaultLanguage(String),

    #[error("位置搜索半径无效: {0}")]
    InvalidSpatialRadius(f64),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("config.toml")
}
