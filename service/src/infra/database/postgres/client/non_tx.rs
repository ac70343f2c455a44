//! [`NonTx`] client definitions.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;
use tracing as log;

use crate::infra::database::{
    self,
    postgres::{self, connection, Connection},
};

/// Non-transactional Postgres database client.
///
/// Keeps a single [`connection::Pooled`] connection shared by all its clones,
/// acquiring a fresh one from the [`connection::Pool`] whenever the current
/// one is closed.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to acquire connections from.
    pub(crate) pool: connection::Pool,

    /// Connection used for operations, if acquired already.
    connection: Arc<RwLock<Option<connection::Pooled>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client from the provided [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the underlying [`Connection`] of this [`NonTx`] client,
    /// acquiring a new one if there is none or it's closed.
    async fn connection(
        &self,
    ) -> Result<
        RwLockReadGuard<'_, connection::Pooled>,
        Traced<database::Error>,
    > {
        {
            let current = self.connection.read().await;
            if current.as_ref().is_some_and(|c| !c.is_closed()) {
                return Ok(RwLockReadGuard::map(current, |c| {
                    c.as_ref().expect("checked above")
                }));
            }
        }

        let mut current = self.connection.write().await;
        if current.as_ref().map_or(true, |c| c.is_closed()) {
            if current.is_some() {
                log::warn!("Postgres connection closed, acquiring a new one");
            }
            *current = Some(
                self.pool
                    .get()
                    .await
                    .map_err(tracerr::from_and_wrap!(=> postgres::Error))
                    .map_err(tracerr::map_from)?,
            );
        }
        Ok(RwLockReadGuard::map(current.downgrade(), |c| {
            c.as_ref()
                .expect("connection cannot be dropped while guard is alive")
        }))
    }
}

impl Connection for NonTx {
    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .query_opt(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &[&(dyn ToSql + Sync)],
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + ?Sized,
    {
        self.connection()
            .await
            .map_err(tracerr::wrap!())?
            .exec(stmt, params)
            .await
            .map_err(tracerr::wrap!())
    }
}
