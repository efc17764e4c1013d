use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub slot_granularity_minutes: u32,
    pub default_page_limit: u32,
    pub db_busy_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", 3000),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "barberbook.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            slot_granularity_minutes: env_parse("SLOT_GRANULARITY_MINUTES", 15),
            default_page_limit: env_parse("DEFAULT_PAGE_LIMIT", 20),
            db_busy_timeout_ms: env_parse("DB_BUSY_TIMEOUT_MS", 5000),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "barberbook.db".to_string(),
            admin_token: "changeme".to_string(),
            slot_granularity_minutes: 15,
            default_page_limit: 20,
            db_busy_timeout_ms: 5000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
