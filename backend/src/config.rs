//! # Configuration Module
//!
//! Loads and validates environment variables for the booking platform
//! backend.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default | Required |
//! |----------|-------------|---------|----------|
//! | `DATABASE_URL` | PostgreSQL connection string | - | Yes |
//! | `HOST` | Server bind address | `0.0.0.0` | No |
//! | `PORT` | Server port | `3000` | No |
//! | `MAX_DB_CONNECTIONS` | Database connection pool size | `50` | No |
//! | `CACHE_TTL_SECONDS` | Property cache TTL in seconds | `300` | No |
//! | `PAYMENT_EXPIRY_SECONDS` | Lifetime of a crypto payment intent | `3600` | No |
//! | `SIGNUP_WALLET_CREDIT` | Simulated wallet credit for new accounts | `500.00` | No |

use rust_decimal::Decimal;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind the HTTP server to
    pub host: String,
    /// Port number for the HTTP server
    pub port: u16,
    /// PostgreSQL database connection URL
    pub database_url: String,
    /// Maximum number of database connections in the pool
    pub max_db_connections: u32,
    /// Time-to-live for cached property records in seconds
    pub cache_ttl_seconds: u64,
    /// How long a crypto payment intent is quoted as valid
    pub payment_expiry_seconds: u64,
    /// Wallet balance granted to a freshly registered account
    pub signup_wallet_credit: Decimal,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL"))?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidPort)?;

        let max_db_connections = std::env::var("MAX_DB_CONNECTIONS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("MAX_DB_CONNECTIONS"))?;

        let cache_ttl_seconds = std::env::var("CACHE_TTL_SECONDS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("CACHE_TTL_SECONDS"))?;

        let payment_expiry_seconds = std::env::var("PAYMENT_EXPIRY_SECONDS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidNumber("PAYMENT_EXPIRY_SECONDS"))?;

        let signup_wallet_credit = std::env::var("SIGNUP_WALLET_CREDIT")
            .unwrap_or_else(|_| "500.00".to_string())
            .parse::<Decimal>()
            .map_err(|_| ConfigError::InvalidNumber("SIGNUP_WALLET_CREDIT"))?;

        Ok(Config {
            host,
            port,
            database_url,
            max_db_connections,
            cache_ttl_seconds,
            payment_expiry_seconds,
            signup_wallet_credit,
        })
    }
}

/// Configuration errors that can occur during loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The port number is not valid
    #[error("Invalid port number")]
    InvalidPort,

    /// A numeric environment variable has an invalid value
    #[error("Invalid number for {0}")]
    InvalidNumber(&'static str),
}
