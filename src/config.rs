use std::{env, path::PathBuf, time::Duration};

/// Backend API base used when running locally against the development backend.
pub const LOCAL_AUTH_API_URL: &str = "http://localhost:8005/api/v1";

const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 5;
// Matches the backend's access token lifetime (24h).
const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;

/// AppConfig
///
/// Holds the gateway's entire configuration state. Immutable once loaded and pulled
/// into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects log format and which variables are mandatory.
    pub env: Env,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the backend authentication API, including the `/api/v1` prefix.
    pub auth_api_url: String,
    // HS256 secret the backend signs access tokens with. Enables local token checks.
    pub backend_jwt_secret: Option<String>,
    // Durable session file. Sessions are memory-only when unset.
    pub session_file: Option<PathBuf>,
    // Upper bound on the `/auth/me` fallback lookup made by the route guard.
    pub principal_lookup_timeout: Duration,
    // Lifetime of a cached session when neither the backend nor the token states one.
    pub session_ttl: Duration,
}

/// Env
///
/// Defines the runtime context: `Local` for development conveniences and readable
/// logs, `Production` for mandatory secrets and JSON logs.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Safe, non-panicking values for test setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            auth_api_url: LOCAL_AUTH_API_URL.to_string(),
            backend_jwt_secret: None,
            session_file: None,
            principal_lookup_timeout: Duration::from_secs(DEFAULT_LOOKUP_TIMEOUT_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables, failing fast.
    ///
    /// # Panics
    /// Panics in `Production` when `AUTH_API_URL` or `BACKEND_JWT_SECRET` is missing, so
    /// the gateway never starts pointed at a development backend or without token checks.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let principal_lookup_timeout =
            positive_secs("PRINCIPAL_LOOKUP_TIMEOUT_SECS", DEFAULT_LOOKUP_TIMEOUT_SECS);
        let session_ttl = positive_secs("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS);

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let session_file = env::var("SESSION_FILE").ok().map(PathBuf::from);

        match env {
            Env::Local => Self {
                env: Env::Local,
                bind_addr,
                auth_api_url: env::var("AUTH_API_URL")
                    .unwrap_or_else(|_| LOCAL_AUTH_API_URL.to_string()),
                backend_jwt_secret: env::var("BACKEND_JWT_SECRET").ok(),
                session_file,
                principal_lookup_timeout,
                session_ttl,
            },
            Env::Production => Self {
                env: Env::Production,
                bind_addr,
                auth_api_url: env::var("AUTH_API_URL")
                    .expect("FATAL: AUTH_API_URL required in prod"),
                backend_jwt_secret: Some(
                    env::var("BACKEND_JWT_SECRET")
                        .expect("FATAL: BACKEND_JWT_SECRET must be set in production."),
                ),
                session_file,
                principal_lookup_timeout,
                session_ttl,
            },
        }
    }
}

/// A strictly positive number of seconds from the environment, else the default.
fn positive_secs(var: &str, default: u64) -> Duration {
    let secs = env::var(var)
        .ok()
        .and_then(|secs| secs.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}
