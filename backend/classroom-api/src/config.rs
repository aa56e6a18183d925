use serde::Deserialize;
use std::env;

const DEFAULT_ATTEMPT_STATE_TTL_SECONDS: u64 = 86400;
const DEV_JWT_SECRET: &str = "dev-secret-only-for-local-testing";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mongo_uri: String,
    pub mongo_database: String,
    pub redis_uri: String,
    pub jwt_secret: String,
    pub bind_address: String,
    /// Lifetime of an untouched attempt's running score in Redis.
    pub attempt_state_ttl_seconds: u64,
    /// `username:password` for the `/metrics` endpoint.
    pub metrics_auth: String,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        // Determine environment (defaults to dev)
        let env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // Build configuration from config/*.toml + ENV overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables (APP_SECTION__KEY)
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or_else(|_| "mongodb://localhost:27017/?replicaSet=rs0".to_string());

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or_else(|_| "classroom".to_string());

        let redis_uri = settings
            .get_string("redis.uri")
            .or_else(|_| env::var("REDIS_URI"))
            .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string());

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("JWT_SECRET"))
        {
            Ok(secret) => secret,
            Err(_) if env == "prod" => {
                return Err(config::ConfigError::Message(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            Err(_) => {
                tracing::warn!("Using default JWT_SECRET (dev mode only!)");
                DEV_JWT_SECRET.to_string()
            }
        };

        let bind_address = settings
            .get_string("server.bind_address")
            .or_else(|_| env::var("BIND_ADDRESS"))
            .unwrap_or_else(|_| "0.0.0.0:8081".to_string());

        let attempt_state_ttl_seconds = match settings.get_int("session.attempt_state_ttl_seconds")
        {
            Ok(ttl) if ttl > 0 => ttl as u64,
            Ok(ttl) => {
                return Err(config::ConfigError::Message(format!(
                    "session.attempt_state_ttl_seconds must be positive, got {}",
                    ttl
                )))
            }
            Err(_) => env::var("ATTEMPT_STATE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(DEFAULT_ATTEMPT_STATE_TTL_SECONDS),
        };

        let metrics_auth = settings
            .get_string("metrics.auth")
            .or_else(|_| env::var("METRICS_AUTH"))
            .unwrap_or_else(|_| "admin:changeme".to_string());

        Ok(Config {
            mongo_uri,
            mongo_database,
            redis_uri,
            jwt_secret,
            bind_address,
            attempt_state_ttl_seconds,
            metrics_auth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "APP_ENV",
        "APP_AUTH__JWT_SECRET",
        "APP_SERVER__BIND_ADDRESS",
        "APP_SESSION__ATTEMPT_STATE_TTL_SECONDS",
        "JWT_SECRET",
        "BIND_ADDRESS",
        "ATTEMPT_STATE_TTL_SECONDS",
    ];

    fn clear_vars() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_in_dev() {
        clear_vars();

        let config = Config::load().unwrap();

        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.bind_address, "0.0.0.0:8081");
        assert_eq!(
            config.attempt_state_ttl_seconds,
            DEFAULT_ATTEMPT_STATE_TTL_SECONDS
        );
    }

    #[test]
    #[serial]
    fn prefixed_environment_overrides_values() {
        clear_vars();
        env::set_var("APP_AUTH__JWT_SECRET", "from-app-env");
        env::set_var("APP_SERVER__BIND_ADDRESS", "127.0.0.1:9000");
        env::set_var("APP_SESSION__ATTEMPT_STATE_TTL_SECONDS", "120");

        let config = Config::load().unwrap();
        clear_vars();

        assert_eq!(config.jwt_secret, "from-app-env");
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.attempt_state_ttl_seconds, 120);
    }

    #[test]
    #[serial]
    fn prod_requires_jwt_secret() {
        clear_vars();
        env::set_var("APP_ENV", "prod");

        let result = Config::load();
        clear_vars();

        assert!(result.is_err());
    }
}
