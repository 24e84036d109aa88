use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub geo: GeoConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    File,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Directory holding the flat-file encodings (file backend).
    pub data_dir: String,
    /// Connection string for the relational backend.
    pub database_url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "file".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "sqlite" => StoreBackend::Sqlite,
            "file" => StoreBackend::File,
            other => {
                tracing::warn!(
                    "Unknown STORE_BACKEND '{other}', falling back to 'file'. Supported values: file, sqlite"
                );
                StoreBackend::File
            }
        };

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./beacon.db".to_string());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let geo_enabled = std::env::var("ENABLE_GEO_LOOKUP")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(true);
        let geo_endpoint =
            std::env::var("GEO_API_URL").unwrap_or_else(|_| "http://ip-api.com/json".to_string());
        let geo_timeout_secs = std::env::var("GEO_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(5);

        let notify_flag = std::env::var("ENABLE_TELEGRAM_NOTIFICATIONS")
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        let bot_token = std::env::var("TOKEN_API_TELEGRAM").ok();
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();

        let notify_enabled = if notify_flag && (bot_token.is_none() || chat_id.is_none()) {
            tracing::warn!(
                "ENABLE_TELEGRAM_NOTIFICATIONS is set but TOKEN_API_TELEGRAM or TELEGRAM_CHAT_ID is missing, disabling notifications"
            );
            false
        } else {
            notify_flag
        };

        Ok(Config {
            server: ServerConfig { host, port },
            store: StoreConfig {
                backend,
                data_dir,
                database_url,
                max_connections,
            },
            geo: GeoConfig {
                enabled: geo_enabled,
                endpoint: geo_endpoint,
                timeout_secs: geo_timeout_secs,
            },
            notify: NotifyConfig {
                enabled: notify_enabled,
                bot_token,
                chat_id,
            },
        })
    }
}
