//! [`Command`] for persisting changes of a [`Session`].

use common::{operations::Update, DateTime};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{session, Session},
    infra::{database, Database},
    SessionManager,
};

use super::Command;

/// [`Command`] for persisting the [`session::Values`] of an existing
/// [`Session`].
///
/// Saving never brings back a [`Session`] deleted in the meantime.
#[derive(Clone, Debug)]
pub struct SaveSession(pub Session);

impl<Db> Command<SaveSession> for SessionManager<Db>
where
    Db: Database<
        Update<session::Record>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Session;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        SaveSession(mut session): SaveSession,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        session.updated_at = Some(DateTime::now().coerce());
        let record = session::Record::encode(&session)
            .map_err(tracerr::from_and_wrap!(=> E))?;

        let found = {
            let _guard = self.lock.write().await;
            self.database()
                .execute(Update(record))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
        };
        if !found {
            return Err(tracerr::new!(E::NotFound));
        }

        Ok(session)
    }
}

/// Error of [`SaveSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`session::Values`] cannot be encoded.
    #[display("Failed to encode `Session` values: {_0}")]
    #[from]
    Codec(session::CodecError),

    /// [`Session`] doesn't exist anymore.
    #[display("`Session` not found")]
    NotFound,
}
