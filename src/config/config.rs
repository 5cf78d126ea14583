use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 服务地址
    pub host: String,
    /// 服务端口
    pub port: u16,
    /// 请求超时（秒）
    pub request_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout: 30,
        }
    }
}

/// 内容仓库（交付 API）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// 交付 API 基础地址
    pub base_url: String,
    /// 租户标识
    pub tenant_id: String,
    /// 附件 URL 的主机地址
    pub host_url: String,
    /// 请求超时（秒）
    pub timeout: u64,
    /// User-Agent 请求头
    pub user_agent: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9000/api".into(),
            tenant_id: String::new(),
            host_url: "http://localhost:9000".into(),
            timeout: 10,
            user_agent: concat!("dialog-resolver/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

/// 解析引擎配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// 是否启用响应缓存
    pub caching_enabled: bool,
    /// 缓存 TTL（秒）
    pub cache_ttl_seconds: u64,
    /// 缓存最大条目数（0 表示不限制）
    pub cache_max_entries: usize,
    /// 默认输出语言
    pub default_language: String,
    /// 支持的语言
    pub supported_languages: Vec<String>,
    /// 位置搜索半径
    pub spatial_radius: f64,
    /// 对话查询中角色的权重
    pub persona_weight: u32,
    /// 位置查询中角色的权重
    pub location_persona_weight: u32,
    /// 可选实体的权重
    pub entity_weight: u32,
    /// 对话节点的权重
    pub node_weight: u32,
    /// 后续动作查询中角色的权重
    pub follow_up_persona_weight: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            caching_enabled: true,
            cache_ttl_seconds: 300,
            cache_max_entries: 10_000,
            default_language: "en".into(),
            supported_languages: vec!["en".into()],
            spatial_radius: 2.0,
            persona_weight: 2,
            location_persona_weight: 30,
            entity_weight: 10,
            node_weight: 20,
            follow_up_persona_weight: 30,
        }
    }
}

impl ResolverConfig {
    /// Picks the requested language when supported, otherwise the default.
    pub fn resolve_language(&self, requested: Option<&str>) -> String {
        match requested {
            Some(lang) if self.supported_languages.iter().any(|l| l == lang) => lang.to_string(),
            _ => self.default_language.clone(),
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
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 服务器配置
    pub server: ServerConfig,
    /// 交付 API 配置
    pub delivery: DeliveryConfig,
    /// 解析引擎配置
    pub resolver: ResolverConfig,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            delivery: DeliveryConfig::default(),
            resolver: ResolverConfig::default(),
            logging: LoggingConfig::default(),
            app_name: "dialog-resolver".into(),
            environment: "development".into(),
        }
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        let mut config = Self::default();
        config.logging.level = "debug".into();
        config.logging.log_dir = Some(PathBuf::from("./logs"));
        config
    }

    /// 创建生产环境配置
    pub fn production() -> Self {
        let mut config = Self::default();
        config.environment = "production".into();
        config.logging.level = "info".into();
        config.logging.structured = true;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_resolver_defaults() {
        let config = ResolverConfig::default();
        assert!(config.caching_enabled);
        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.default_language, "en");
        assert_eq!(config.spatial_radius, 2.0);
    }

    #[rstest]
    #[case(Some("en"), "en")]
    #[case(Some("de"), "de")]
    #[case(Some("fr"), "en")]
    #[case(None, "en")]
    fn test_resolve_language(#[case] requested: Option<&str>, #[case] expected: &str) {
        let config = ResolverConfig {
            supported_languages: vec!["en".into(), "de".into()],
            ..ResolverConfig::default()
        };
        assert_eq!(config.resolve_language(requested), expected);
    }

    #[test]
    fn test_production_preset() {
        let config = AppConfig::production();
        assert_eq!(config.environment, "production");
        assert!(config.logging.structured);
    }
}
