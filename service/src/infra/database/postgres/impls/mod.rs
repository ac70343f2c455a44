//! [`Database`] implementations.

#![expect(
    clippy::items_after_statements,
    reason = "`const SQL` after statements"
)]

mod session;
mod token;

use async_trait::async_trait;
use refinery_core::{
    traits::r#async::{AsyncQuery, AsyncTransaction},
    AsyncMigrate, Migration,
};
use tracerr::Traced;

#[cfg(doc)]
use crate::infra::Database;
use crate::infra::{database, postgres};

use super::{connection, Postgres};

impl Postgres {
    /// Acquires a dedicated connection for running migrations.
    async fn migration_connection(
        &self,
    ) -> Result<connection::Pooled, Traced<database::Error>> {
        self.0
            .pool
            .get()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncTransaction for Postgres {
    type Error = Traced<database::Error>;

    async fn execute(
        &mut self,
        queries: &[&str],
    ) -> Result<usize, Self::Error> {
        let mut conn =
            self.migration_connection().await.map_err(tracerr::wrap!())?;
        AsyncTransaction::execute(&mut **conn, queries)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

#[async_trait]
impl AsyncQuery<Vec<Migration>> for Postgres {
    async fn query(
        &mut self,
        query: &str,
    ) -> Result<Vec<Migration>, <Self as AsyncTransaction>::Error> {
        let mut conn =
            self.migration_connection().await.map_err(tracerr::wrap!())?;
        AsyncQuery::query(&mut **conn, query)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl AsyncMigrate for Postgres {}
