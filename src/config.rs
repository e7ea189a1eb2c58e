use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
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
pub struct SessionConfig {
    pub secret: String,
    pub expires_in: i64, // seconds
}

/// SMS provider credentials. An empty `account_sid` disables delivery and
/// the code is written to the log instead.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Echo the issued code back in the send-code response. Development only.
    #[serde(default)]
    pub expose_dev_code: bool,
    /// Consume every outstanding code for a phone when a new one is issued.
    #[serde(default = "default_true")]
    pub invalidate_previous_codes: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            expose_dev_code: false,
            invalidate_previous_codes: true,
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // a missing file is fine: everything can come from the environment
        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults()?,
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    pub fn parse(config_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        toml::from_str(config_str)
            .map_err(|e| format!("Failed to parse config file: {e}").into())
    }

    fn from_env_defaults() -> Result<Self, Box<dyn std::error::Error>> {
        let database_url = get_env("DATABASE_URL")
            .ok_or("DATABASE_URL is not set and no config.toml was found")?;

        Ok(Config {
            server: ServerConfig {
                host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: get_env_parse("SERVER_PORT", 8080u16),
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
            },
            session: SessionConfig {
                secret: get_env("SESSION_SECRET")
                    .unwrap_or_else(|| "change-me-in-production".to_string()),
                expires_in: get_env_parse("SESSION_EXPIRES_IN", 2_592_000i64),
            },
            sms: SmsConfig {
                account_sid: get_env("SMS_ACCOUNT_SID").unwrap_or_default(),
                auth_token: get_env("SMS_AUTH_TOKEN").unwrap_or_default(),
                from_phone: get_env("SMS_FROM_PHONE").unwrap_or_default(),
            },
            auth: AuthConfig {
                expose_dev_code: get_env_parse("AUTH_EXPOSE_DEV_CODE", false),
                invalidate_previous_codes: get_env_parse("AUTH_INVALIDATE_PREVIOUS_CODES", true),
            },
        })
    }

    // environment wins over the file
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            self.database.max_connections = mc;
        }
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.session.secret = v;
        }
        if let Ok(v) = env::var("SESSION_EXPIRES_IN")
            && let Ok(n) = v.parse()
        {
            self.session.expires_in = n;
        }
        if let Ok(v) = env::var("SMS_ACCOUNT_SID") {
            self.sms.account_sid = v;
        }
        if let Ok(v) = env::var("SMS_AUTH_TOKEN") {
            self.sms.auth_token = v;
        }
        if let Ok(v) = env::var("SMS_FROM_PHONE") {
            self.sms.from_phone = v;
        }
        if let Ok(v) = env::var("AUTH_EXPOSE_DEV_CODE")
            && let Ok(b) = v.parse()
        {
            self.auth.expose_dev_code = b;
        }
        if let Ok(v) = env::var("AUTH_INVALIDATE_PREVIOUS_CODES")
            && let Ok(b) = v.parse()
        {
            self.auth.invalidate_previous_codes = b;
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
