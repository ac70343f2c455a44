//! [`Command`] for creating a new [`Session`].

use common::{operations::Insert, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{session, Session},
    infra::{database, Database},
    SessionManager,
};

use super::Command;

/// [`Command`] for creating a new [`Session`] with a fresh random
/// [`session::Id`].
#[derive(Clone, Debug, Default)]
pub struct CreateSession {
    /// Initial [`session::Values`] of the [`Session`].
    pub values: session::Values,
}

impl<Db> Command<CreateSession> for SessionManager<Db>
where
    Db: Database<
        Insert<session::Record>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        CreateSession { values }: CreateSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let now = DateTime::now();
        let session = Session {
            id: session::Id::random(),
            values,
            created_at: now.coerce(),
            updated_at: None,
            expires_at: (now + self.config.sessions.max_age).coerce(),
        };
        let record = session::Record::encode(&session)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        {
            let _guard = self.lock.write().await;
            self.database()
                .execute(Insert(record))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?;
        }

        log::debug!("Created new `Session`");

        Ok(session)
    }
}

/// Error of [`CreateSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// [`session::Values`] cannot be encoded.
    #[display("Failed to encode `Session` values: {_0}")]
    Codec(session::CodecError),
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Select},
        DateTime,
    };

    use crate::{
        domain::session,
        infra::{Database as _, Memory},
        testing, Command as _,
    };

    use super::CreateSession;

    #[tokio::test]
    async fn stores_new_session() {
        let sessions = testing::sessions(Memory::new());
        let mut values = session::Values::default();
        values.set("theme", "dark").unwrap();

        let session = sessions
            .execute(CreateSession { values })
            .await
            .unwrap();

        assert_eq!(session.id().as_ref().len(), session::Id::LENGTH);
        assert!(session.updated_at().is_none());
        let lifetime = session
            .expires_at()
            .saturating_duration_since(session.created_at());
        assert_eq!(lifetime, Duration::from_secs(24 * 60 * 60));

        let record = sessions
            .database()
            .execute(Select(By::new(session.id().clone())))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            session::Values::decode(&record.values).unwrap(),
            *session.values(),
        );
        assert!(!session.is_expired_at(DateTime::now()));
    }

    #[tokio::test]
    async fn generates_distinct_ids() {
        let sessions = testing::sessions(Memory::new());

        let first = sessions.execute(CreateSession::default()).await.unwrap();
        let second = sessions.execute(CreateSession::default()).await.unwrap();

        assert_ne!(first.id(), second.id());
    }
}
