//! [`Query`] for loading a [`Session`].

use common::{
    operations::{By, Select},
    DateTime,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{session, Session},
    infra::{database, Database},
    SessionManager,
};

use super::Query;

/// [`Query`] for loading a live [`Session`] by its [`session::Id`].
#[derive(Clone, Debug)]
pub struct GetSession {
    /// [`session::Id`] of the [`Session`] to load.
    pub id: session::Id,
}

impl<Db> Query<GetSession> for SessionManager<Db>
where
    Db: Database<
        Select<By<Option<session::Record>, session::Id>>,
        Ok = Option<session::Record>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        GetSession { id }: GetSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let record = {
            let _guard = self.lock.read().await;
            self.database()
                .execute(Select(By::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
        }
        .filter(|r| DateTime::now().coerce() <= r.expires_at)
        .ok_or_else(|| tracerr::new!(E::NotFound))?;

        let session::Record {
            id,
            values,
            created_at,
            updated_at,
            expires_at,
        } = record;
        let session = self
            .rebuild(id, &values)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        Ok(Session {
            created_at,
            updated_at,
            expires_at,
            ..session
        })
    }
}

/// Error of [`GetSession`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Stored [`session::Values`] cannot be decoded.
    #[display("Failed to decode `Session` values: {_0}")]
    #[from]
    Codec(session::CodecError),

    /// [`Session`] doesn't exist or is expired.
    #[display("`Session` not found")]
    NotFound,
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{operations::Insert, DateTime};

    use crate::{
        command::CreateSession,
        domain::{session, user},
        infra::{Database as _, Memory},
        testing, Command as _, Query as _,
    };

    use super::{ExecutionError, GetSession};

    #[tokio::test]
    async fn loads_stored_session() {
        let sessions = testing::sessions(Memory::new());
        let identity = user::Identity {
            id: testing::user_id(),
            username: user::Username::from("alice".to_owned()),
        };
        let mut values = session::Values::default();
        values.set(session::Key::USER, &identity).unwrap();
        let created = sessions
            .execute(CreateSession { values })
            .await
            .unwrap();

        let loaded = sessions
            .execute(GetSession {
                id: created.id().clone(),
            })
            .await
            .unwrap();

        assert_eq!(loaded.identity().unwrap(), identity);
        assert_eq!(loaded.created_at(), created.created_at());
        assert_eq!(loaded.expires_at(), created.expires_at());
    }

    #[tokio::test]
    async fn hides_expired_session() {
        let sessions = testing::sessions(Memory::new());
        let created = sessions.execute(CreateSession::default()).await.unwrap();
        let mut record = session::Record::encode(&created).unwrap();
        record.expires_at = (DateTime::now() - Duration::from_secs(1)).coerce();
        sessions.database().execute(Insert(record)).await.unwrap();

        let err = sessions
            .execute(GetSession {
                id: created.id().clone(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err.as_ref(), ExecutionError::NotFound));
    }

    #[tokio::test]
    async fn isolates_sessions() {
        let sessions = testing::sessions(Memory::new());
        let mut first =
            sessions.execute(CreateSession::default()).await.unwrap();
        let second =
            sessions.execute(CreateSession::default()).await.unwrap();
        first.set("cart", &[1, 2, 3]).unwrap();
        let first = sessions
            .execute(crate::command::SaveSession(first))
            .await
            .unwrap();

        let loaded = sessions
            .execute(GetSession {
                id: second.id().clone(),
            })
            .await
            .unwrap();

        assert!(loaded.values().is_empty());
        assert_ne!(loaded.id(), first.id());
    }
}
