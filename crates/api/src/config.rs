use crate::auth::jwt::JwtConfig;

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Parse `LOG_FORMAT`; anything other than `json` falls back to pretty.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long background tasks get to drain after shutdown (default: `5`).
    pub shutdown_timeout_secs: u64,
    /// Token signing secret and lifetimes.
    pub jwt: JwtConfig,
    /// Lifetime of a memorial password-unlock token (default: `120`).
    pub memorial_access_expiry_mins: i64,
    /// Frontend origin used to build checkout return URLs.
    pub app_base_url: String,
    /// Price charged to publish a memorial, in the smallest currency unit.
    pub publish_price_cents: i64,
    /// Lowercase ISO 4217 currency code for the publish price.
    pub publish_currency: String,
    /// Shared secret for verifying payment webhooks. Webhooks are refused
    /// when unset.
    pub stripe_webhook_secret: Option<String>,
    /// CDN folder that memorial media is uploaded into.
    pub media_folder: String,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `5`                     |
    /// | `MEMORIAL_ACCESS_EXPIRY_MINS` | `120`                   |
    /// | `APP_BASE_URL`                | `http://localhost:5173` |
    /// | `PUBLISH_PRICE_CENTS`         | `4999`                  |
    /// | `PUBLISH_CURRENCY`            | `usd`                   |
    /// | `STRIPE_WEBHOOK_SECRET`       | unset                   |
    /// | `CLOUDINARY_FOLDER`           | `gather-memorials`      |
    /// | `LOG_FORMAT`                  | `pretty`                |
    ///
    /// # Panics
    ///
    /// Panics on unparseable numbers or an invalid publish price, so
    /// misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let memorial_access_expiry_mins: i64 = std::env::var("MEMORIAL_ACCESS_EXPIRY_MINS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("MEMORIAL_ACCESS_EXPIRY_MINS must be a valid i64");

        let app_base_url = std::env::var("APP_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .trim_end_matches('/')
            .to_string();

        let publish_price_cents: i64 = std::env::var("PUBLISH_PRICE_CENTS")
            .unwrap_or_else(|_| "4999".into())
            .parse()
            .expect("PUBLISH_PRICE_CENTS must be a valid i64");

        let publish_currency = std::env::var("PUBLISH_CURRENCY")
            .unwrap_or_else(|_| "usd".into())
            .to_ascii_lowercase();

        if let Err(e) =
            gather_core::payment::validate_price(publish_price_cents, &publish_currency)
        {
            panic!("Invalid publish price configuration: {e}");
        }

        let stripe_webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let media_folder =
            std::env::var("CLOUDINARY_FOLDER").unwrap_or_else(|_| "gather-memorials".into());

        let log_format = LogFormat::parse(
            &std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()),
        );

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            memorial_access_expiry_mins,
            app_base_url,
            publish_price_cents,
            publish_currency,
            stripe_webhook_secret,
            media_folder,
            log_format,
        }
    }
}
