/**
 * Configuration
 * Environment-driven settings for the server, hosted backend and media host
 */
use std::net::SocketAddr;

/// Fallback secret used only outside production.
pub const DEV_JWT_SECRET: &str = "dev-jwt-secret-change-in-production";

/// Hosted backend (Supabase) connection settings
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: String,
    pub jwt_secret: String,
    pub request_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: env_opt("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            anon_key: std::env::var("SUPABASE_ANON_KEY").unwrap_or_default(),
            jwt_secret: std::env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),
            request_timeout_secs: std::env::var("BACKEND_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Cloudinary credentials
#[derive(Debug, Clone, Default)]
pub struct MediaConfig {
    pub cloud_name: Option<String>,
    pub api_key: String,
    pub api_secret: String,
}

impl MediaConfig {
    pub fn from_env() -> Self {
        Self {
            cloud_name: env_opt("CLOUDINARY_CLOUD_NAME"),
            api_key: std::env::var("CLOUDINARY_API_KEY").unwrap_or_default(),
            api_secret: std::env::var("CLOUDINARY_API_SECRET").unwrap_or_default(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.cloud_name.is_some() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    /// Level for this crate's logs; `RUST_LOG` overrides the whole filter.
    pub log_level: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub cookie_secure: bool,
    pub password_reset_redirect: Option<String>,
    pub backend: BackendConfig,
    pub media: MediaConfig,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        // ALLOWED_ORIGINS (comma-separated) wins over FRONTEND_ORIGIN
        let allowed_origins = env_opt("ALLOWED_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|origins| !origins.is_empty())
            .or_else(|| env_opt("FRONTEND_ORIGIN").map(|o| vec![o]))
            .unwrap_or_else(|| {
                vec![
                    "http://localhost:3000".to_string(),
                    "http://127.0.0.1:3000".to_string(),
                ]
            });

        Self {
            log_level: env_opt("LOG_LEVEL").unwrap_or_else(|| {
                if is_production { "info" } else { "debug" }.to_string()
            }),
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            allowed_origins,
            cookie_secure: std::env::var("SESSION_COOKIE_SECURE")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(is_production),
            password_reset_redirect: env_opt("PASSWORD_RESET_REDIRECT"),
            backend: BackendConfig::default(),
            media: MediaConfig::from_env(),
            environment,
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Settings that make a production deployment unusable.
    pub fn production_problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !self.is_production() {
            return problems;
        }
        if self.backend.url.is_none() {
            problems.push("SUPABASE_URL must be set in production");
        }
        if self.backend.jwt_secret.is_empty() || self.backend.jwt_secret == DEV_JWT_SECRET {
            problems.push("SUPABASE_JWT_SECRET must be set to the project's JWT secret");
        }
        problems
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            cookie_secure: false,
            password_reset_redirect: None,
            backend: BackendConfig {
                url: None,
                anon_key: String::new(),
                jwt_secret: DEV_JWT_SECRET.to_string(),
                request_timeout_secs: 30,
            },
            media: MediaConfig::default(),
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
