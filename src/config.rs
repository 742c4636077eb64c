use anyhow::{Context, Result, anyhow};
use chrono::FixedOffset;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub server_addr: String,
    pub token_ttl: usize,
    pub log_level: tracing::Level,

    /// Offset of the school's wall clock from UTC, used for "today".
    pub tz_offset: FixedOffset,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // WhatsApp gateway
    pub whatsapp_api_url: String,
    pub whatsapp_api_token: Option<String>,

    // Handed to the browser for its realtime client
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let tz_offset_hours: i32 = parse_or(&lookup, "TZ_OFFSET_HOURS", 7)?;
        let tz_offset = tz_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| anyhow!("TZ_OFFSET_HOURS must be between -23 and 23"))?;

        Ok(Self {
            server_addr: optional("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            jwt_secret: required("JWT_SECRET")?,
            token_ttl: parse_or(&lookup, "TOKEN_TTL", 3600)?, // 1 hour
            log_level: parse_or(&lookup, "LOG_LEVEL", tracing::Level::DEBUG)?,
            tz_offset,

            rate_login_per_min: parse_or(&lookup, "RATE_LOGIN_PER_MIN", 60)?,
            rate_protected_per_min: parse_or(&lookup, "RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: optional("API_PREFIX").unwrap_or_else(|| "/api".to_string()),

            whatsapp_api_url: optional("WHATSAPP_API_URL")
                .unwrap_or_else(|| "https://api.fonnte.com/send".to_string()),
            whatsapp_api_token: optional("WHATSAPP_API_TOKEN"),

            supabase_url: optional("SUPABASE_URL"),
            supabase_anon_key: optional("SUPABASE_ANON_KEY"),
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_keys_are_set() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/absensi"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.server_addr, "0.0.0.0:5000");
        assert_eq!(config.token_ttl, 3600);
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.whatsapp_api_url, "https://api.fonnte.com/send");
        assert!(config.whatsapp_api_token.is_none());
        assert!(config.supabase_url.is_none());
        assert_eq!(config.tz_offset.local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn invalid_number_is_reported_with_its_key() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("TOKEN_TTL", "an hour"),
        ]))
        .err()
        .unwrap();
        assert!(err.to_string().contains("TOKEN_TTL"));
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("TZ_OFFSET_HOURS", "30"),
        ]));
        assert!(result.is_err());
    }
}
