//! [`session::Record`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select, Update};
use tracerr::Traced;

use crate::{
    domain::session,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

impl<C> Database<Insert<session::Record>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(record): Insert<session::Record>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::Record {
            id,
            values,
            created_at,
            updated_at,
            expires_at,
        } = record;

        const SQL: &str = "\
            INSERT INTO sessions (id, data, \
                                  created_at, updated_at, expires_at) \
            VALUES ($1, $2, \
                    $3, $4, $5)";
        self.exec(
            SQL,
            &[&id, &values.as_ref(), &created_at, &updated_at, &expires_at],
        )
        .await
        .map(drop)
        .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Option<session::Record>, session::Id>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<session::Record>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<session::Record>, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            SELECT id, data, \
                   created_at, updated_at, expires_at \
            FROM sessions \
            WHERE id = $1::VARCHAR \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&id])
            .await
            .map_err(tracerr::wrap!())?
            .map(|row| session::Record {
                id: row.get("id"),
                values: row.get::<_, Vec<u8>>("data").into(),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
                expires_at: row.get("expires_at"),
            }))
    }
}

impl<C> Database<Update<session::Record>> for Postgres<C>
where
    C: Connection,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(record): Update<session::Record>,
    ) -> Result<Self::Ok, Self::Err> {
        let session::Record {
            id,
            values,
            created_at: _,
            updated_at,
            expires_at,
        } = record;

        const SQL: &str = "\
            UPDATE sessions \
            SET data = $2, \
                updated_at = $3, \
                expires_at = $4 \
            WHERE id = $1::VARCHAR";
        self.exec(SQL, &[&id, &values.as_ref(), &updated_at, &expires_at])
            .await
            .map(|updated| updated > 0)
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Delete<By<session::Record, session::Id>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<session::Record, session::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE id = $1::VARCHAR";
        self.exec(SQL, &[&id])
            .await
            .map(drop)
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Delete<By<session::Record, session::ExpirationDateTime>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<session::Record, session::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        const SQL: &str = "\
            DELETE FROM sessions \
            WHERE expires_at < $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
    }
}
