use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Hour (UTC, 0-23) of the daily recalculation pass.
    #[serde(default = "default_daily_run_hour")]
    pub daily_run_hour_utc: u32,
    #[serde(default = "default_expiry_sweep_interval")]
    pub reward_expiry_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            daily_run_hour_utc: default_daily_run_hour(),
            reward_expiry_interval_secs: default_expiry_sweep_interval(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    /// Lifetime of codes bought with points. Tier-promotion codes never expire.
    #[serde(default = "default_redemption_expiry_days")]
    pub redemption_expiry_days: i64,
    /// Cents of discount granted per redeemed point.
    #[serde(default = "default_cents_per_point")]
    pub cents_per_point: i64,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            redemption_expiry_days: default_redemption_expiry_days(),
            cents_per_point: default_cents_per_point(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    /// Shared secret expected in `X-Webhook-Secret`. Empty disables webhooks.
    #[serde(default)]
    pub secret: String,
}

fn default_true() -> bool {
    true
}

fn default_daily_run_hour() -> u32 {
    2
}

fn default_expiry_sweep_interval() -> u64 {
    3600
}

fn default_redemption_expiry_days() -> i64 {
    90
}

fn default_cents_per_point() -> i64 {
    1
}

impl Config {
    pub fn from_toml() -> AppResult<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or_else(|| {
                        AppError::ConfigError(
                            "DATABASE_URL is not set and config.toml was not found".to_string(),
                        )
                    })?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        access_token_expires_in: get_env_parse("JWT_ACCESS_EXPIRES_IN", 7200i64),
                    },
                    scheduler: SchedulerConfig::default(),
                    loyalty: LoyaltyConfig::default(),
                    webhook: WebhookConfig::default(),
                }
            }
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "Cannot read config file {config_path}: {e}"
                )));
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            config.jwt.access_token_expires_in = n;
        }

        // Scheduler
        if let Ok(v) = env::var("SCHEDULER_ENABLED")
            && let Ok(b) = v.parse()
        {
            config.scheduler.enabled = b;
        }
        if let Ok(v) = env::var("SCHEDULER_DAILY_RUN_HOUR_UTC")
            && let Ok(h) = v.parse()
        {
            config.scheduler.daily_run_hour_utc = h;
        }
        if let Ok(v) = env::var("SCHEDULER_REWARD_EXPIRY_INTERVAL_SECS")
            && let Ok(n) = v.parse()
        {
            config.scheduler.reward_expiry_interval_secs = n;
        }

        // Loyalty
        if let Ok(v) = env::var("LOYALTY_REDEMPTION_EXPIRY_DAYS")
            && let Ok(n) = v.parse()
        {
            config.loyalty.redemption_expiry_days = n;
        }
        if let Ok(v) = env::var("LOYALTY_CENTS_PER_POINT")
            && let Ok(n) = v.parse()
        {
            config.loyalty.cents_per_point = n;
        }

        if let Ok(v) = env::var("WEBHOOK_SECRET") {
            config.webhook.secret = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("Failed to parse config file: {e}")))
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.scheduler.daily_run_hour_utc > 23 {
            return Err(AppError::ConfigError(
                "scheduler.daily_run_hour_utc must be between 0 and 23".to_string(),
            ));
        }
        if self.loyalty.redemption_expiry_days <= 0 {
            return Err(AppError::ConfigError(
                "loyalty.redemption_expiry_days must be positive".to_string(),
            ));
        }
        if self.loyalty.cents_per_point <= 0 {
            return Err(AppError::ConfigError(
                "loyalty.cents_per_point must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
host = "127.0.0.1"
port = 9000

[database]
url = "postgres://localhost/loyalty"
max_connections = 5

[jwt]
secret = "s3cret"
access_token_expires_in = 3600
"#;

    #[test]
    fn test_parse_minimal_uses_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.daily_run_hour_utc, 2);
        assert_eq!(config.loyalty.redemption_expiry_days, 90);
        assert!(config.webhook.secret.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_scheduler_section() {
        let raw = format!("{MINIMAL}\n[scheduler]\nenabled = false\ndaily_run_hour_utc = 4\n");
        let config = Config::parse(&raw).unwrap();
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.daily_run_hour_utc, 4);
        assert_eq!(config.scheduler.reward_expiry_interval_secs, 3600);
    }

    #[test]
    fn test_validate_rejects_bad_hour() {
        let raw = format!("{MINIMAL}\n[scheduler]\ndaily_run_hour_utc = 24\n");
        let config = Config::parse(&raw).unwrap();
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn test_parse_error_is_config_error() {
        assert!(matches!(
            Config::parse("[server]\nport = \"not a number\"\n"),
            Err(AppError::ConfigError(_))
        ));
    }
}
