//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未设置时退回内存存储（本地运行 / 测试）。
    pub database_url: Option<String>,
    pub eolia_user_id: String,
    pub eolia_password: String,
    pub api_key: Option<String>,
    pub mqtt_enabled: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_base: String,
    pub mqtt_qos: u8,
    pub refresh_interval_seconds: u64,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let eolia_user_id = env::var("EOLIA_USER_ID")
            .map_err(|_| ConfigError::Missing("EOLIA_USER_ID".to_string()))?;
        let eolia_password = env::var("EOLIA_PASSWORD")
            .map_err(|_| ConfigError::Missing("EOLIA_PASSWORD".to_string()))?;
        let http_addr =
            env::var("EOLIA_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("EOLIA_DATABASE_URL");
        let api_key = read_optional("EOLIA_API_KEY");
        let mqtt_enabled = read_bool_with_default("EOLIA_MQTT", true);
        let mqtt_host = env::var("EOLIA_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("EOLIA_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("EOLIA_MQTT_USERNAME");
        let mqtt_password = read_optional("EOLIA_MQTT_PASSWORD");
        let mqtt_topic_base =
            env::var("EOLIA_MQTT_TOPIC_BASE").unwrap_or_else(|_| "eolia-web-api".to_string());
        let mqtt_qos = read_u8_with_default("EOLIA_MQTT_QOS", 1)?;
        let refresh_interval_seconds =
            read_u64_with_default("EOLIA_REFRESH_INTERVAL_SECONDS", 3600)?;

        Ok(Self {
            http_addr,
            database_url,
            eolia_user_id,
            eolia_password,
            api_key,
            mqtt_enabled,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_base,
            mqtt_qos,
            refresh_interval_seconds,
        })
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
