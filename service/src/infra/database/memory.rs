//! In-memory [`Database`] implementation.

use std::{collections::HashMap, sync::Arc};

use common::operations::{By, Delete, Insert, Select, Update};
use tokio::sync::RwLock;
use tracerr::Traced;

use crate::{
    domain::{session, token, Token},
    infra::{database, Database},
};

/// In-memory [`Database`] keeping [`Token`]s and [`session::Record`]s in
/// shared maps.
///
/// Clones share the same maps. Reads always observe the latest write.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    /// Stored [`Token`]s by their [`token::Digest`] and [`token::Kind`].
    tokens: Arc<RwLock<HashMap<(token::Digest, token::Kind), Token>>>,

    /// Stored [`session::Record`]s by their [`session::Id`].
    sessions: Arc<RwLock<HashMap<session::Id, session::Record>>>,
}

impl Memory {
    /// Creates a new empty [`Memory`] database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Database<Insert<Token>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(token): Insert<Token>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut tokens = self.tokens.write().await;
        let key = (token.digest.clone(), token.kind);
        let token = match tokens.remove(&key) {
            Some(existing) => Token {
                created_at: existing.created_at,
                ..token
            },
            None => token,
        };
        drop(tokens.insert(key, token));
        Ok(())
    }
}

impl Database<Select<By<Option<Token>, (token::Digest, token::Kind)>>>
    for Memory
{
    type Ok = Option<Token>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Token>, (token::Digest, token::Kind)>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.tokens.read().await.get(by.inner()).cloned())
    }
}

impl Database<Delete<By<Token, token::Digest>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Token, token::Digest>>,
    ) -> Result<Self::Ok, Self::Err> {
        let digest = by.into_inner();
        self.tokens.write().await.retain(|(d, _), _| *d != digest);
        Ok(())
    }
}

impl Database<Delete<By<Token, token::ExpirationDateTime>>> for Memory {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Token, token::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.expires_at >= deadline);
        Ok(u64::try_from(before - tokens.len()).unwrap_or(u64::MAX))
    }
}

impl Database<Insert<session::Record>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(record): Insert<session::Record>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.sessions.write().await.insert(record.id.clone(), record));
        Ok(())
    }
}

impl Database<Select<By<Option<session::Record>, session::Id>>> for Memory {
    type Ok = Option<session::Record>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<session::Record>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self.sessions.read().await.get(by.inner()).cloned())
    }
}

impl Database<Update<session::Record>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(record): Update<session::Record>,
    ) -> Result<Self::Ok, Self::Err> {
        let mut sessions = self.sessions.write().await;
        Ok(match sessions.get_mut(&record.id) {
            Some(stored) => {
                stored.values = record.values;
                stored.updated_at = record.updated_at;
                stored.expires_at = record.expires_at;
                true
            }
            None => false,
        })
    }
}

impl Database<Delete<By<session::Record, session::Id>>> for Memory {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<session::Record, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        drop(self.sessions.write().await.remove(by.inner()));
        Ok(())
    }
}

impl Database<Delete<By<session::Record, session::ExpirationDateTime>>>
    for Memory
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<session::Record, session::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.expires_at >= deadline);
        Ok(u64::try_from(before - sessions.len()).unwrap_or(u64::MAX))
    }
}
