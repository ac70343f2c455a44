//! [`Token`]-related [`Database`] implementations.

use common::operations::{By, Delete, Insert, Select};
use tokio_postgres::Row;
use tracerr::Traced;

use crate::{
    domain::{token, Token},
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
};

/// Restores a [`Token`] from the provided [`Row`].
fn from_row(row: &Row) -> Token {
    let kind = row.get("kind");
    Token {
        digest: row.get("digest"),
        kind,
        user_id: row.get("user_id"),
        binding: token::Binding::from_material(kind, row.get("binding")),
        last_login: row.get("last_login"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl<C> Database<Insert<Token>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(token): Insert<Token>,
    ) -> Result<Self::Ok, Self::Err> {
        let Token {
            digest,
            kind,
            user_id,
            binding,
            last_login,
            expires_at,
            created_at,
            updated_at,
        } = token;

        const SQL: &str = "\
            INSERT INTO tokens (digest, kind, user_id, binding, \
                                last_login, expires_at, \
                                created_at, updated_at) \
            VALUES ($1, $2, $3, $4, \
                    $5, $6, \
                    $7, $8) \
            ON CONFLICT (digest, kind) DO UPDATE \
            SET user_id = EXCLUDED.user_id, \
                binding = EXCLUDED.binding, \
                last_login = EXCLUDED.last_login, \
                expires_at = EXCLUDED.expires_at, \
                updated_at = EXCLUDED.updated_at";
        self.exec(
            SQL,
            &[
                &digest,
                &kind,
                &user_id,
                &binding.material(),
                &last_login,
                &expires_at,
                &created_at,
                &updated_at,
            ],
        )
        .await
        .map(drop)
        .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Select<By<Option<Token>, (token::Digest, token::Kind)>>>
    for Postgres<C>
where
    C: Connection,
{
    type Ok = Option<Token>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Token>, (token::Digest, token::Kind)>>,
    ) -> Result<Self::Ok, Self::Err> {
        let (digest, kind) = by.into_inner();

        const SQL: &str = "\
            SELECT digest, kind, user_id, binding, \
                   last_login, expires_at, \
                   created_at, updated_at \
            FROM tokens \
            WHERE digest = $1::VARCHAR \
              AND kind = $2::INT2 \
            LIMIT 1";
        Ok(self
            .query_opt(SQL, &[&digest, &kind])
            .await
            .map_err(tracerr::wrap!())?
            .as_ref()
            .map(from_row))
    }
}

impl<C> Database<Delete<By<Token, token::Digest>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Token, token::Digest>>,
    ) -> Result<Self::Ok, Self::Err> {
        let digest = by.into_inner();

        const SQL: &str = "\
            DELETE FROM tokens \
            WHERE digest = $1::VARCHAR";
        self.exec(SQL, &[&digest])
            .await
            .map(drop)
            .map_err(tracerr::wrap!())
    }
}

impl<C> Database<Delete<By<Token, token::ExpirationDateTime>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Token, token::ExpirationDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        let deadline = by.into_inner();

        const SQL: &str = "\
            DELETE FROM tokens \
            WHERE expires_at < $1::TIMESTAMPTZ";
        self.exec(SQL, &[&deadline])
            .await
            .map_err(tracerr::wrap!())
    }
}
