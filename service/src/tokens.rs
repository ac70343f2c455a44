//! [`TokenManager`] definitions.

use std::{sync::Arc, time::Duration};

use derive_more::Debug;
use smart_default::SmartDefault;
use tokio::sync::RwLock;

#[cfg(doc)]
use crate::domain::Token;
use crate::{crypto::Signer, domain::token};

/// [`TokenManager`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Lifetime of a [`token::Kind::Registration`] [`Token`].
    #[default(Duration::from_secs(72 * 60 * 60))]
    pub registration_expiry: Duration,

    /// Lifetime of a [`token::Kind::PasswordReset`] [`Token`].
    #[default(Duration::from_secs(60 * 60))]
    pub password_reset_expiry: Duration,

    /// Lifetime of a [`token::Kind::Csrf`] [`Token`].
    #[default(Duration::from_secs(10 * 60))]
    pub csrf_expiry: Duration,

    /// Lifetime of a [`token::Kind::State`] [`Token`] issued along with its
    /// cookie, unless an explicit expiration is requested.
    #[default(Duration::from_secs(24 * 60 * 60))]
    pub state_expiry: Duration,

    /// Name of the cookie carrying a [`token::Kind::Csrf`] [`Token`].
    #[default("X-CSRF-Token".to_owned())]
    pub csrf_cookie_name: String,

    /// Name of the cookie carrying a [`token::Kind::State`] [`Token`].
    #[default("sfd-user-state-restore".to_owned())]
    pub state_cookie_name: String,
}

impl Config {
    /// Returns the default lifetime of a [`Token`] of the provided
    /// [`token::Kind`], if it has one.
    #[must_use]
    pub fn expiry(&self, kind: token::Kind) -> Option<Duration> {
        use token::Kind as K;

        match kind {
            K::Registration => Some(self.registration_expiry),
            K::PasswordReset => Some(self.password_reset_expiry),
            K::Csrf => Some(self.csrf_expiry),
            K::Redirect | K::State => None,
        }
    }
}

/// Issuer and verifier of signed [`Token`]s.
#[derive(Clone, Debug)]
pub struct TokenManager<Db> {
    /// [`crate::Config`] shared with the rest of the [`crate::Service`].
    pub(crate) config: Arc<crate::Config>,

    /// [`Signer`] of [`Token`] digests.
    #[debug(skip)]
    pub(crate) signer: Arc<Signer>,

    /// Database storing issued [`Token`]s.
    pub(crate) database: Db,

    /// Lock serializing store mutations of this [`TokenManager`].
    #[debug(skip)]
    pub(crate) lock: Arc<RwLock<()>>,
}

impl<Db> TokenManager<Db> {
    /// Creates a new [`TokenManager`] with the provided parameters.
    #[must_use]
    pub fn new(config: Arc<crate::Config>, database: Db) -> Self {
        let signer =
            Signer::new(config.hash, &config.token_salt, &config.secret_key);
        Self {
            config,
            signer: Arc::new(signer),
            database,
            lock: Arc::default(),
        }
    }

    /// Returns the [`crate::Config`] of this [`TokenManager`].
    #[must_use]
    pub fn config(&self) -> &crate::Config {
        &self.config
    }

    /// Returns the database of this [`TokenManager`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

#[cfg(test)]
mod spec {
    use super::Config;
    use crate::domain::token::Kind;

    #[test]
    fn has_default_expiry_only_for_some_kinds() {
        let config = Config::default();

        assert!(config.expiry(Kind::Registration).is_some());
        assert!(config.expiry(Kind::PasswordReset).is_some());
        assert!(config.expiry(Kind::Csrf).is_some());
        assert_eq!(config.expiry(Kind::Redirect), None);
        assert_eq!(config.expiry(Kind::State), None);
    }
}
