//! [`Config`]-related definitions.

use std::time::Duration;

use config::{builder::DefaultState, ConfigBuilder, ConfigError};
use secrecy::SecretString;
use serde::Deserialize;
use service::crypto::HashFunction;
use smart_default::SmartDefault;

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: Server,

    /// Service configuration.
    pub service: Service,

    /// Revocation store configuration.
    pub store: Store,

    /// Postgres configuration.
    pub postgres: Postgres,

    /// Log configuration.
    pub log: Log,
}

impl Config {
    /// Creates a new [`Config`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(path: impl AsRef<str>) -> Result<Self, ConfigError> {
        ConfigBuilder::<DefaultState>::default()
            .add_source(config::File::with_name(path.as_ref()).required(false))
            .add_source(config::Environment::with_prefix("CONF").separator("."))
            .build()?
            .try_deserialize()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Server {
    /// Host to bind the server to.
    #[default("0.0.0.0".to_owned())]
    pub host: String,

    /// Port to bind the server to.
    #[default(8080)]
    pub port: u16,
}

/// Service configuration.
#[derive(Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Service {
    /// Secret key tokens are signed with.
    #[default(SecretString::from("changeme".to_owned()))]
    pub secret_key: SecretString,

    /// Salt the signing key is derived with.
    #[default(SecretString::from("changeme".to_owned()))]
    pub token_salt: SecretString,

    /// Hash function used for signing.
    pub hash: HashFunction,

    /// IANA time zone name token timestamps are taken in, like
    /// `Europe/Berlin`, or a fixed `±HH:MM` offset.
    #[default("UTC".to_owned())]
    pub time_zone: String,

    /// Host used as a cookie domain.
    #[default("localhost".to_owned())]
    pub site_host: String,

    /// Tokens configuration.
    pub tokens: Tokens,

    /// Sessions configuration.
    pub sessions: Sessions,

    /// Expiration sweeps configuration.
    pub gc: Gc,
}

impl TryFrom<Service> for service::Config {
    type Error = service::time_zone::ParseError;

    fn try_from(value: Service) -> Result<Self, Self::Error> {
        let Service {
            secret_key,
            token_salt,
            hash,
            time_zone,
            site_host,
            tokens:
                Tokens {
                    registration_expiry,
                    password_reset_expiry,
                    csrf_expiry,
                    state_expiry,
                    csrf_cookie_name,
                    state_cookie_name,
                },
            sessions: Sessions {
                cookie_name,
                max_age,
            },
            gc:
                Gc {
                    tokens_interval,
                    sessions_interval,
                },
        } = value;

        Ok(Self {
            secret_key,
            token_salt,
            hash,
            time_zone: time_zone.parse()?,
            site_host,
            tokens: service::tokens::Config {
                registration_expiry,
                password_reset_expiry,
                csrf_expiry,
                state_expiry,
                csrf_cookie_name,
                state_cookie_name,
            },
            sessions: service::sessions::Config {
                cookie_name,
                max_age,
            },
            sweep_expired_tokens: service::task::sweep_expired_tokens::Config {
                interval: tokens_interval,
            },
            sweep_expired_sessions:
                service::task::sweep_expired_sessions::Config {
                    interval: sessions_interval,
                },
        })
    }
}

/// Tokens configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Tokens {
    /// Lifetime of a registration token.
    #[default(Duration::from_secs(72 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub registration_expiry: Duration,

    /// Lifetime of a password reset token.
    #[default(Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub password_reset_expiry: Duration,

    /// Lifetime of a CSRF token.
    #[default(Duration::from_secs(10 * 60))]
    #[serde(with = "humantime_serde")]
    pub csrf_expiry: Duration,

    /// Lifetime of a state-restore token.
    #[default(Duration::from_secs(24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub state_expiry: Duration,

    /// Name of the cookie carrying a CSRF token.
    #[default("X-CSRF-Token".to_owned())]
    pub csrf_cookie_name: String,

    /// Name of the cookie carrying a state-restore token.
    #[default("sfd-user-state-restore".to_owned())]
    pub state_cookie_name: String,
}

/// Sessions configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Sessions {
    /// Name of the cookie carrying a session ID.
    #[default("sfd-session-id".to_owned())]
    pub cookie_name: String,

    /// Lifetime of a session.
    #[default(Duration::from_secs(24 * 60 * 60))]
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
}

/// Expiration sweeps configuration.
#[derive(Clone, Copy, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Gc {
    /// Interval between expired tokens sweeps.
    #[default(Duration::from_secs(60))]
    #[serde(with = "humantime_serde")]
    pub tokens_interval: Duration,

    /// Interval between expired sessions sweeps.
    #[default(Duration::from_secs(60 * 60))]
    #[serde(with = "humantime_serde")]
    pub sessions_interval: Duration,
}

/// Revocation store configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Store {
    /// Kind of the store.
    pub kind: StoreKind,
}

/// Kind of a revocation store.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-memory store, losing everything on restart.
    #[default]
    Memory,

    /// Postgres store.
    Postgres,
}

/// Postgres configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct Postgres {
    /// Host to connect to.
    #[default("127.0.0.1".to_owned())]
    pub host: String,

    /// Port to connect to.
    #[default(5432)]
    pub port: u16,

    /// User to connect as.
    #[default("postgres".to_owned())]
    pub user: String,

    /// Password to connect with.
    #[default("postgres".to_owned())]
    pub password: String,

    /// Database name to connect to.
    #[default("postgres".to_owned())]
    pub dbname: String,
}

impl From<Postgres> for service::infra::postgres::Config {
    fn from(value: Postgres) -> Self {
        let Postgres {
            host,
            port,
            user,
            password,
            dbname,
        } = value;

        Self {
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            dbname: Some(dbname),
            ..Self::default()
        }
    }
}

/// Log configuration.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Log {
    /// Log level.
    pub level: LogLevel,
}

/// Log level.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    /// Designates very low priority, often extremely verbose, information.
    Trace,

    /// Designates lower priority information.
    Debug,

    /// Designates useful information.
    #[default]
    Info,

    /// Designates hazardous situations.
    Warn,

    /// Designates very serious errors.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}
