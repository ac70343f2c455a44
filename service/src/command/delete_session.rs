//! [`Command`] for deleting a [`Session`].

use common::operations::{By, Delete};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::session,
    infra::{database, Database},
    SessionManager,
};

use super::Command;

/// [`Command`] for deleting a [`Session`] by its [`session::Id`].
///
/// Deleting a missing [`Session`] is not an error.
///
/// [`Session`]: crate::domain::Session
#[derive(Clone, Debug)]
pub struct DeleteSession {
    /// [`session::Id`] of the [`Session`] to delete.
    ///
    /// [`Session`]: crate::domain::Session
    pub id: session::Id,
}

impl<Db> Command<DeleteSession> for SessionManager<Db>
where
    Db: Database<
        Delete<By<session::Record, session::Id>>,
        Ok = (),
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DeleteSession { id }: DeleteSession,
    ) -> Result<Self::Ok, Self::Err> {
        let _guard = self.lock.write().await;
        self.database()
            .execute(Delete(By::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> ExecutionError))
    }
}

/// Error of [`DeleteSession`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),
}
