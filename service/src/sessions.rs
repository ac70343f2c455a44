//! [`SessionManager`] definitions.

use std::{sync::Arc, time::Duration};

use common::DateTime;
use derive_more::Debug;
use smart_default::SmartDefault;
use tokio::sync::RwLock;

use crate::domain::{session, Session};

/// [`SessionManager`] configuration.
#[derive(Clone, Debug, SmartDefault)]
pub struct Config {
    /// Name of the cookie carrying a [`session::Id`].
    #[default("sfd-session-id".to_owned())]
    pub cookie_name: String,

    /// Lifetime of a [`Session`].
    #[default(Duration::from_secs(24 * 60 * 60))]
    pub max_age: Duration,
}

/// Issuer and keeper of [`Session`]s.
#[derive(Clone, Debug)]
pub struct SessionManager<Db> {
    /// [`crate::Config`] shared with the rest of the [`crate::Service`].
    pub(crate) config: Arc<crate::Config>,

    /// Database storing [`Session`]s.
    pub(crate) database: Db,

    /// Lock serializing store mutations of this [`SessionManager`].
    #[debug(skip)]
    pub(crate) lock: Arc<RwLock<()>>,
}

impl<Db> SessionManager<Db> {
    /// Creates a new [`SessionManager`] with the provided parameters.
    #[must_use]
    pub fn new(config: Arc<crate::Config>, database: Db) -> Self {
        Self {
            config,
            database,
            lock: Arc::default(),
        }
    }

    /// Returns the [`crate::Config`] of this [`SessionManager`].
    #[must_use]
    pub fn config(&self) -> &crate::Config {
        &self.config
    }

    /// Returns the database of this [`SessionManager`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }

    /// Rebuilds a [`Session`] from its [`session::Id`] and
    /// [`session::EncodedValues`].
    ///
    /// The encoded bytes carry no timestamps, so the rebuilt [`Session`] is
    /// stamped as freshly created.
    ///
    /// # Errors
    ///
    /// If the [`session::EncodedValues`] are malformed.
    pub fn rebuild(
        &self,
        id: session::Id,
        values: &session::EncodedValues,
    ) -> Result<Session, session::CodecError> {
        let now = DateTime::now();
        Ok(Session {
            id,
            values: session::Values::decode(values)?,
            created_at: now.coerce(),
            updated_at: None,
            expires_at: (now + self.config.sessions.max_age).coerce(),
        })
    }
}
