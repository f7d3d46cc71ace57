use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Signing secret used when `JWT_SECRET` is absent outside production.
pub const DEVELOPMENT_JWT_SECRET: &str = "weblarek-development-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub filter: FilterConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub csrf: CsrfConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    pub max_limit: u32,
    pub default_limit: u32,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub refresh_token_ttl_days: i64,
    /// Per-IP request budget over `rate_limit_window_secs`.
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    /// Take the client address from the last `X-Forwarded-For` hop.
    pub trust_proxy: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SameSitePolicy {
    Strict,
    Lax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrfConfig {
    pub cookie_name: String,
    pub header_name: String,
    pub field_name: String,
    pub same_site: SameSitePolicy,
    pub secret_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        override_from_env("FILTER_MAX_LIMIT", &mut self.filter.max_limit);
        override_from_env("FILTER_DEFAULT_LIMIT", &mut self.filter.default_limit);
        override_from_env("FILTER_DEBUG_LOGGING", &mut self.filter.debug_logging);

        override_from_env("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_from_env("DATABASE_CONNECTION_TIMEOUT", &mut self.database.connection_timeout);

        override_from_env("API_MAX_REQUEST_SIZE_BYTES", &mut self.api.max_request_size_bytes);

        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        override_from_env("SECURITY_SECURE_COOKIES", &mut self.security.secure_cookies);
        override_from_env("JWT_SECRET", &mut self.security.jwt_secret);
        override_from_env("AUTH_ACCESS_TOKEN_TTL_MINUTES", &mut self.security.access_token_ttl_minutes);
        override_from_env("AUTH_REFRESH_TOKEN_TTL_DAYS", &mut self.security.refresh_token_ttl_days);
        override_from_env("RATE_LIMIT_MAX_REQUESTS", &mut self.security.rate_limit_max_requests);
        override_from_env("RATE_LIMIT_WINDOW_SECS", &mut self.security.rate_limit_window_secs);
        override_from_env("TRUST_PROXY", &mut self.security.trust_proxy);

        override_from_env("CSRF_COOKIE_NAME", &mut self.csrf.cookie_name);
        override_from_env("CSRF_HEADER_NAME", &mut self.csrf.header_name);
        if let Ok(v) = env::var("CSRF_SAME_SITE") {
            self.csrf.same_site = match v.to_ascii_lowercase().as_str() {
                "strict" => SameSitePolicy::Strict,
                "lax" => SameSitePolicy::Lax,
                _ => self.csrf.same_site,
            };
        }

        self
    }

    /// Checks settings that must never fall back to development defaults.
    pub fn validate(&self) -> Result<(), String> {
        if self.security.jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }
        if self.environment == Environment::Production && self.security.jwt_secret == DEVELOPMENT_JWT_SECRET {
            return Err("JWT_SECRET must be set in production".to_string());
        }
        if self.security.rate_limit_max_requests == 0 || self.security.rate_limit_window_secs == 0 {
            return Err("RATE_LIMIT_MAX_REQUESTS and RATE_LIMIT_WINDOW_SECS must be positive".to_string());
        }
        if self.filter.default_limit == 0 || self.filter.default_limit > self.filter.max_limit {
            return Err(format!(
                "FILTER_DEFAULT_LIMIT must be within 1..={}",
                self.filter.max_limit
            ));
        }
        Ok(())
    }

    fn csrf_defaults(same_site: SameSitePolicy) -> CsrfConfig {
        CsrfConfig {
            cookie_name: "_csrf".to_string(),
            header_name: "x-csrf-token".to_string(),
            field_name: "csrfToken".to_string(),
            same_site,
            secret_bytes: 18,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            filter: FilterConfig {
                max_limit: 1000,
                default_limit: 10,
                debug_logging: true,
            },
            database: DatabaseConfig {
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                secure_cookies: false,
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                access_token_ttl_minutes: 10,
                refresh_token_ttl_days: 7,
                rate_limit_max_requests: 300,
                rate_limit_window_secs: 15 * 60,
                trust_proxy: false,
            },
            csrf: Self::csrf_defaults(SameSitePolicy::Lax),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            filter: FilterConfig {
                max_limit: 500,
                default_limit: 10,
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                cors_origins: vec!["https://staging.example.com".to_string()],
                secure_cookies: true,
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                access_token_ttl_minutes: 10,
                refresh_token_ttl_days: 7,
                rate_limit_max_requests: 30,
                rate_limit_window_secs: 15 * 60,
                trust_proxy: true,
            },
            csrf: Self::csrf_defaults(SameSitePolicy::Lax),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            filter: FilterConfig {
                max_limit: 100,
                default_limit: 10,
                debug_logging: false,
            },
            database: DatabaseConfig {
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                cors_origins: vec!["https://app.example.com".to_string()],
                secure_cookies: true,
                jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
                access_token_ttl_minutes: 5,
                refresh_token_ttl_days: 7,
                rate_limit_max_requests: 30,
                rate_limit_window_secs: 15 * 60,
                trust_proxy: true,
            },
            csrf: Self::csrf_defaults(SameSitePolicy::Strict),
        }
    }
}

/// Replaces `slot` with the parsed value of `name`; unset or unparsable values keep the default.
fn override_from_env<T: FromStr>(name: &str, slot: &mut T) {
    match env::var(name).map(|raw| raw.parse::<T>()) {
        Ok(Ok(value)) => *slot = value,
        Ok(Err(_)) => tracing::warn!(variable = name, "Ignoring unparsable configuration value"),
        Err(_) => {}
    }
}

pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.filter.max_limit, 1000);
        assert!(!config.security.secure_cookies);
        assert_eq!(config.csrf.same_site, SameSitePolicy::Lax);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert_eq!(config.filter.max_limit, 100);
        assert!(config.security.secure_cookies);
        assert_eq!(config.csrf.same_site, SameSitePolicy::Strict);
    }

    #[test]
    fn production_rejects_development_secret() {
        let mut config = AppConfig::production();
        assert!(config.validate().is_err());

        config.security.jwt_secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unparsable_override_keeps_default() {
        let mut limit = 10u32;
        std::env::set_var("WEBLAREK_TEST_LIMIT", "ten");
        override_from_env("WEBLAREK_TEST_LIMIT", &mut limit);
        assert_eq!(limit, 10);

        std::env::set_var("WEBLAREK_TEST_LIMIT", "25");
        override_from_env("WEBLAREK_TEST_LIMIT", &mut limit);
        assert_eq!(limit, 25);
    }

    #[test]
    fn production_limits_thirty_requests_per_quarter_hour() {
        let config = AppConfig::production();
        assert_eq!(config.security.rate_limit_max_requests, 30);
        assert_eq!(config.security.rate_limit_window_secs, 900);
        assert!(config.security.trust_proxy);

        let mut config = AppConfig::development();
        config.security.rate_limit_max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_limit_must_fit_max_limit() {
        let mut config = AppConfig::development();
        config.filter.default_limit = config.filter.max_limit + 1;
        assert!(config.validate().is_err());
    }
}
