//! Service contains the token and session authentication core.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod cookies;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod query;
pub mod sessions;
pub mod task;
#[cfg(test)]
mod testing;
pub mod time_zone;
pub mod tokens;

use std::{convert::Infallible, sync::Arc};

use common::operations::{By, Start};
use derive_more::Debug;
use secrecy::SecretString;
use smart_default::SmartDefault;
use tokio::sync::mpsc;

pub use self::{
    command::Command, query::Query, sessions::SessionManager, task::Task,
    time_zone::TimeZone, tokens::TokenManager,
};

/// [`Service`] configuration.
#[derive(Debug, SmartDefault)]
pub struct Config {
    /// Secret key tokens are signed with.
    #[default(SecretString::from("changeme".to_owned()))]
    pub secret_key: SecretString,

    /// Salt the signing key is derived with.
    #[default(SecretString::from("changeme".to_owned()))]
    pub token_salt: SecretString,

    /// [`crypto::HashFunction`] used for signing.
    pub hash: crypto::HashFunction,

    /// [`TimeZone`] token timestamps are taken in.
    pub time_zone: TimeZone,

    /// Host used as a cookie domain when none is requested explicitly.
    #[default("localhost".to_owned())]
    pub site_host: String,

    /// [`TokenManager`] configuration.
    pub tokens: tokens::Config,

    /// [`SessionManager`] configuration.
    pub sessions: sessions::Config,

    /// [`task::SweepExpiredTokens`] configuration.
    pub sweep_expired_tokens: task::sweep_expired_tokens::Config,

    /// [`task::SweepExpiredSessions`] configuration.
    pub sweep_expired_sessions: task::sweep_expired_sessions::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// [`TokenManager`] of this [`Service`].
    tokens: TokenManager<Db>,

    /// [`SessionManager`] of this [`Service`].
    sessions: SessionManager<Db>,
}

impl<Db> Service<Db> {
    /// Capacity of the channel collecting [`task::SweepError`]s.
    const SWEEP_ERRORS_CAPACITY: usize = 16;

    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// Both expiration sweeps run in the returned [`task::Background`] until
    /// the provided [`task::Shutdown`] is requested.
    pub fn new(
        config: Config,
        database: Db,
        shutdown: task::Shutdown,
    ) -> (Self, task::Background)
    where
        Db: Clone + 'static,
        TokenManager<Db>: Task<
            Start<By<task::SweepExpiredTokens<TokenManager<Db>>, task::Gc>>,
            Ok = (),
            Err = Infallible,
        >,
        SessionManager<Db>: Task<
            Start<
                By<task::SweepExpiredSessions<SessionManager<Db>>, task::Gc>,
            >,
            Ok = (),
            Err = Infallible,
        >,
    {
        let tokens_interval = config.sweep_expired_tokens.interval;
        let sessions_interval = config.sweep_expired_sessions.interval;

        let config = Arc::new(config);
        let this = Self {
            tokens: TokenManager::new(Arc::clone(&config), database.clone()),
            sessions: SessionManager::new(config, database),
        };

        let (errors, errors_rx) = mpsc::channel(Self::SWEEP_ERRORS_CAPACITY);
        let mut bg = task::Background::default();

        let tokens = this.tokens.clone();
        let gc = task::Gc {
            interval: tokens_interval,
            errors: errors.clone(),
            shutdown: shutdown.clone(),
        };
        bg.spawn("SweepExpiredTokens", async move {
            tokens.execute(Start(By::new(gc))).await
        });

        let sessions = this.sessions.clone();
        let gc = task::Gc {
            interval: sessions_interval,
            errors,
            shutdown,
        };
        bg.spawn("SweepExpiredSessions", async move {
            sessions.execute(Start(By::new(gc))).await
        });

        bg.spawn("DrainSweepErrors", task::drain_sweep_errors(errors_rx));

        (this, bg)
    }

    /// Returns the [`TokenManager`] of this [`Service`].
    #[must_use]
    pub fn tokens(&self) -> &TokenManager<Db> {
        &self.tokens
    }

    /// Returns the [`SessionManager`] of this [`Service`].
    #[must_use]
    pub fn sessions(&self) -> &SessionManager<Db> {
        &self.sessions
    }

    /// Returns the [`Config`] of this [`Service`].
    #[must_use]
    pub fn config(&self) -> &Config {
        self.tokens.config()
    }
}
