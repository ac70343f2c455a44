//! Runtime-selected [`Database`] implementation.

use derive_more::From;
use tracerr::Traced;

use crate::infra::{database, Database, Memory, Postgres};

/// [`Database`] chosen at startup.
#[derive(Clone, Debug, From)]
pub enum Store {
    /// [`Memory`] database, losing everything on restart.
    Memory(Memory),

    /// [`Postgres`] database.
    Postgres(Postgres),
}

impl<Op, T> Database<Op> for Store
where
    Memory: Database<Op, Ok = T, Err = Traced<database::Error>>,
    Postgres: Database<Op, Ok = T, Err = Traced<database::Error>>,
{
    type Ok = T;
    type Err = Traced<database::Error>;

    async fn execute(&self, op: Op) -> Result<Self::Ok, Self::Err> {
        match self {
            Self::Memory(db) => db.execute(op).await,
            Self::Postgres(db) => db.execute(op).await,
        }
    }
}
