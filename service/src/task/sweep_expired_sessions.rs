//! [`SweepExpiredSessions`] [`Task`].

use std::{convert::Infallible, time::Duration};

use common::operations::{By, Delete, Perform, Start};
use smart_default::SmartDefault;
use tracerr::Traced;

use crate::{
    domain::{session, Session},
    infra::{database, Database},
    SessionManager,
};

use super::{Gc, SweepError, Task};

/// Configuration for [`SweepExpiredSessions`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between expired [`Session`]s sweeps.
    #[default(Duration::from_secs(60 * 60))]
    pub interval: Duration,
}

/// [`Task`] for deleting expired [`Session`]s.
#[derive(Clone, Copy, Debug)]
pub struct SweepExpiredSessions<M> {
    /// [`SessionManager`] instance.
    manager: M,
}

impl<Db> Task<Start<By<SweepExpiredSessions<Self>, Gc>>> for SessionManager<Db>
where
    SweepExpiredSessions<SessionManager<Db>>:
        Task<Perform<()>, Ok = u64, Err = ExecutionError>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<SweepExpiredSessions<Self>, Gc>>,
    ) -> Result<Self::Ok, Self::Err> {
        let task = &SweepExpiredSessions {
            manager: self.clone(),
        };
        let sweep = move || async move {
            task.execute(Perform(())).await.map_err(SweepError::Sessions)
        };
        let gc = by.into_inner();
        super::sweep_periodically("SweepExpiredSessions", gc, sweep).await;
        Ok(())
    }
}

impl<Db> Task<Perform<()>> for SweepExpiredSessions<SessionManager<Db>>
where
    Db: Database<
        Delete<By<session::Record, session::ExpirationDateTime>>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = u64;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let _guard = self.manager.lock.write().await;
        self.manager
            .database()
            .execute(Delete(By::new(session::ExpirationDateTime::now())))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`SweepExpiredSessions`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Insert, Perform, Select, Start},
        DateTime,
    };
    use tokio::{sync::mpsc, time};

    use crate::{
        command::CreateSession,
        domain::{session, Session},
        infra::{Database as _, Memory},
        task::{shutdown, Gc, Task as _},
        testing, SessionManager,
    };

    use super::SweepExpiredSessions;

    async fn expire(sessions: &SessionManager<Memory>, session: &Session) {
        let mut record = session::Record::encode(session).unwrap();
        record.expires_at = (DateTime::now() - Duration::from_secs(1)).coerce();
        sessions.database().execute(Insert(record)).await.unwrap();
    }

    async fn is_stored(
        sessions: &SessionManager<Memory>,
        session: &Session,
    ) -> bool {
        sessions
            .database()
            .execute(Select(By::new(session.id().clone())))
            .await
            .unwrap()
            .is_some()
    }

    #[tokio::test]
    async fn deletes_only_expired_sessions() {
        let sessions = testing::sessions(Memory::new());
        let expired = sessions.execute(CreateSession::default()).await.unwrap();
        let live = sessions.execute(CreateSession::default()).await.unwrap();
        expire(&sessions, &expired).await;

        let swept = SweepExpiredSessions {
            manager: sessions.clone(),
        }
        .execute(Perform(()))
        .await
        .unwrap();

        assert_eq!(swept, 1);
        assert!(!is_stored(&sessions, &expired).await);
        assert!(is_stored(&sessions, &live).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_every_interval_until_shutdown() {
        let sessions = testing::sessions(Memory::new());
        let (trigger, shutdown) = shutdown::channel();
        let (errors, _errors_rx) = mpsc::channel(1);
        let gc = Gc {
            interval: Duration::from_secs(60 * 60),
            errors,
            shutdown,
        };

        let sweeping = sessions.execute(Start(By::<
            SweepExpiredSessions<SessionManager<Memory>>,
            _,
        >::new(gc)));
        let observing = async {
            let session =
                sessions.execute(CreateSession::default()).await.unwrap();
            expire(&sessions, &session).await;

            time::sleep(Duration::from_secs(60 * 60 + 1)).await;
            assert!(!is_stored(&sessions, &session).await, "not swept");

            trigger.fire();
        };

        let (res, ()) = tokio::join!(sweeping, observing);
        res.unwrap();
    }
}
