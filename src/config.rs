use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub razorpay: RazorpayConfig,
    #[serde(default)]
    pub mailer: MailerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
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
    pub access_token_expires_in: i64,  // seconds
    pub refresh_token_expires_in: i64, // seconds
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    #[serde(default = "default_razorpay_base_url")]
    pub base_url: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_razorpay_base_url() -> String {
    "https://api.razorpay.com/v1".to_string()
}

fn default_currency() -> String {
    "INR".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MailerConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub from_address: String,
    /// Base URL of the dashboard front-end, used to build set-password links.
    #[serde(default)]
    pub dashboard_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str)
                    .map_err(|e| format!("Failed to parse {config_path}: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build entirely from environment variables.
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL")
                    .ok_or("DATABASE_URL is not set and no config.toml was found")?;

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
                        refresh_token_expires_in: get_env_parse(
                            "JWT_REFRESH_EXPIRES_IN",
                            2_592_000i64,
                        ),
                    },
                    razorpay: RazorpayConfig {
                        key_id: get_env("RAZORPAY_KEY_ID").unwrap_or_default(),
                        key_secret: get_env("RAZORPAY_KEY_SECRET").unwrap_or_default(),
                        base_url: get_env("RAZORPAY_BASE_URL")
                            .unwrap_or_else(default_razorpay_base_url),
                        currency: get_env("RAZORPAY_CURRENCY").unwrap_or_else(default_currency),
                    },
                    mailer: MailerConfig {
                        api_key: get_env("MAILER_API_KEY").unwrap_or_default(),
                        base_url: get_env("MAILER_BASE_URL")
                            .unwrap_or_else(|| "https://api.resend.com".to_string()),
                        from_address: get_env("MAILER_FROM_ADDRESS").unwrap_or_default(),
                        dashboard_url: get_env("DASHBOARD_URL").unwrap_or_default(),
                    },
                    llm: LlmConfig {
                        api_key: get_env("LLM_API_KEY").unwrap_or_default(),
                        base_url: get_env("LLM_BASE_URL")
                            .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                        model: get_env("LLM_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string()),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables win even when the file exists.
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_ACCESS_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.access_token_expires_in = n;
            }
        }
        if let Ok(v) = env::var("JWT_REFRESH_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.refresh_token_expires_in = n;
            }
        }
        if let Ok(v) = env::var("RAZORPAY_KEY_ID") {
            config.razorpay.key_id = v;
        }
        if let Ok(v) = env::var("RAZORPAY_KEY_SECRET") {
            config.razorpay.key_secret = v;
        }
        if let Ok(v) = env::var("RAZORPAY_BASE_URL") {
            config.razorpay.base_url = v;
        }
        if let Ok(v) = env::var("RAZORPAY_CURRENCY") {
            config.razorpay.currency = v;
        }
        if let Ok(v) = env::var("MAILER_API_KEY") {
            config.mailer.api_key = v;
        }
        if let Ok(v) = env::var("MAILER_BASE_URL") {
            config.mailer.base_url = v;
        }
        if let Ok(v) = env::var("MAILER_FROM_ADDRESS") {
            config.mailer.from_address = v;
        }
        if let Ok(v) = env::var("DASHBOARD_URL") {
            config.mailer.dashboard_url = v;
        }
        if let Ok(v) = env::var("LLM_API_KEY") {
            config.llm.api_key = v;
        }
        if let Ok(v) = env::var("LLM_BASE_URL") {
            config.llm.base_url = v;
        }
        if let Ok(v) = env::var("LLM_MODEL") {
            config.llm.model = v;
        }

        Ok(config)
    }
}
