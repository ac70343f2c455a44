//! [`SweepExpiredTokens`] [`Task`].

use std::{convert::Infallible, time::Duration};

use common::operations::{By, Delete, Perform, Start};
use smart_default::SmartDefault;
use tracerr::Traced;

use crate::{
    domain::{token, Token},
    infra::{database, Database},
    TokenManager,
};

use super::{Gc, SweepError, Task};

/// Configuration for [`SweepExpiredTokens`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between expired [`Token`]s sweeps.
    #[default(Duration::from_secs(60))]
    pub interval: Duration,
}

/// [`Task`] for deleting expired [`Token`]s.
#[derive(Clone, Copy, Debug)]
pub struct SweepExpiredTokens<M> {
    /// [`TokenManager`] instance.
    manager: M,
}

impl<Db> Task<Start<By<SweepExpiredTokens<Self>, Gc>>> for TokenManager<Db>
where
    SweepExpiredTokens<TokenManager<Db>>:
        Task<Perform<()>, Ok = u64, Err = ExecutionError>,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<SweepExpiredTokens<Self>, Gc>>,
    ) -> Result<Self::Ok, Self::Err> {
        let task = &SweepExpiredTokens {
            manager: self.clone(),
        };
        let sweep = move || async move {
            task.execute(Perform(())).await.map_err(SweepError::Tokens)
        };
        let gc = by.into_inner();
        super::sweep_periodically("SweepExpiredTokens", gc, sweep).await;
        Ok(())
    }
}

impl<Db> Task<Perform<()>> for SweepExpiredTokens<TokenManager<Db>>
where
    Db: Database<
        Delete<By<Token, token::ExpirationDateTime>>,
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
            .execute(Delete(By::new(token::ExpirationDateTime::now())))
            .await
            .map_err(tracerr::wrap!())
    }
}

/// Error of [`SweepExpiredTokens`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    #[cfg(feature = "postgres")]
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };
    use std::time::Duration;

    #[cfg(feature = "postgres")]
    use common::operations::Delete;
    use common::{
        operations::{By, Insert, Perform, Select, Start},
        DateTime,
    };
    use tokio::{sync::mpsc, time};
    #[cfg(feature = "postgres")]
    use tracerr::Traced;

    #[cfg(feature = "postgres")]
    use crate::{
        domain::token,
        infra::{database, postgres},
        task::SweepError,
    };
    use crate::{
        domain::{token::Kind, Token},
        infra::{Database, Memory},
        task::{shutdown, Gc, Task as _},
        testing, TokenManager,
    };

    use super::SweepExpiredTokens;

    /// Store whose pool is closed, counting the sweeps attempted on it.
    #[cfg(feature = "postgres")]
    #[derive(Clone, Debug, Default)]
    struct Closed {
        sweeps: Arc<AtomicUsize>,
    }

    #[cfg(feature = "postgres")]
    impl Database<Delete<By<Token, token::ExpirationDateTime>>> for Closed {
        type Ok = u64;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            _: Delete<By<Token, token::ExpirationDateTime>>,
        ) -> Result<Self::Ok, Self::Err> {
            let _ = self.sweeps.fetch_add(1, Ordering::SeqCst);
            Err(tracerr::new!(database::Error::Postgres(
                postgres::Error::PoolError(
                    postgres::connection::PoolError::Closed,
                ),
            )))
        }
    }

    #[cfg(feature = "postgres")]
    fn closed_tokens(db: Closed) -> TokenManager<Closed> {
        TokenManager::new(Arc::new(testing::config()), db)
    }

    async fn expire(tokens: &TokenManager<Memory>, token: &Token) {
        tokens
            .database()
            .execute(Insert(Token {
                expires_at: (DateTime::now() - Duration::from_secs(1)).coerce(),
                ..token.clone()
            }))
            .await
            .unwrap();
    }

    async fn is_stored(tokens: &TokenManager<Memory>, token: &Token) -> bool {
        tokens
            .database()
            .execute(Select(By::new((token.digest.clone(), token.kind))))
            .await
            .unwrap()
            .is_some()
    }

    #[tokio::test]
    async fn deletes_only_expired_tokens() {
        let tokens = testing::tokens(Memory::new());
        let expired = testing::issue(&tokens, Kind::Registration).await;
        let live = testing::issue(&tokens, Kind::Registration).await;
        expire(&tokens, &expired).await;

        let swept = SweepExpiredTokens {
            manager: tokens.clone(),
        }
        .execute(Perform(()))
        .await
        .unwrap();

        assert_eq!(swept, 1);
        assert!(!is_stored(&tokens, &expired).await);
        assert!(is_stored(&tokens, &live).await);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeps_every_interval_until_shutdown() {
        let tokens = testing::tokens(Memory::new());
        let (trigger, shutdown) = shutdown::channel();
        let (errors, _errors_rx) = mpsc::channel(1);
        let gc = Gc {
            interval: Duration::from_secs(60),
            errors,
            shutdown,
        };

        let sweeping = tokens.execute(Start(
            By::<SweepExpiredTokens<TokenManager<Memory>>, _>::new(gc),
        ));
        let observing = async {
            let token = testing::issue(&tokens, Kind::PasswordReset).await;
            expire(&tokens, &token).await;

            time::sleep(Duration::from_secs(30)).await;
            assert!(is_stored(&tokens, &token).await, "swept too early");

            time::sleep(Duration::from_secs(31)).await;
            assert!(!is_stored(&tokens, &token).await, "not swept");

            trigger.fire();
        };

        let (res, ()) = tokio::join!(sweeping, observing);
        res.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_immediately_on_fired_shutdown() {
        let tokens = testing::tokens(Memory::new());
        let (trigger, shutdown) = shutdown::channel();
        let (errors, _errors_rx) = mpsc::channel(1);
        trigger.fire();

        time::timeout(
            Duration::from_secs(1),
            tokens.execute(Start(
                By::<SweepExpiredTokens<TokenManager<Memory>>, _>::new(Gc {
                    interval: Duration::from_secs(60),
                    errors,
                    shutdown,
                }),
            )),
        )
        .await
        .expect("sweep loop didn't stop")
        .unwrap();
    }

    #[cfg(feature = "postgres")]
    #[tokio::test(start_paused = true)]
    async fn reports_failed_sweep_and_retries_on_next_tick() {
        let db = Closed::default();
        let tokens = closed_tokens(db.clone());
        let (trigger, shutdown) = shutdown::channel();
        let (errors, mut errors_rx) = mpsc::channel(4);

        let sweeping = tokens.execute(Start(
            By::<SweepExpiredTokens<TokenManager<Closed>>, _>::new(Gc {
                interval: Duration::from_secs(60),
                errors,
                shutdown,
            }),
        ));
        let observing = async {
            for attempt in 1..=2 {
                let err = errors_rx.recv().await.expect("no error reported");
                assert!(
                    matches!(
                        &err,
                        SweepError::Tokens(e) if matches!(
                            e.as_ref(),
                            database::Error::Postgres(
                                postgres::Error::PoolError(
                                    postgres::connection::PoolError::Closed,
                                ),
                            ),
                        ),
                    ),
                    "{err}",
                );
                assert_eq!(db.sweeps.load(Ordering::SeqCst), attempt);
            }

            trigger.fire();
        };

        let (res, ()) = tokio::join!(sweeping, observing);
        res.unwrap();
    }

    #[cfg(feature = "postgres")]
    #[tokio::test(start_paused = true)]
    async fn stops_while_errors_channel_is_full() {
        let db = Closed::default();
        let tokens = closed_tokens(db.clone());
        let (trigger, shutdown) = shutdown::channel();
        let (errors, _errors_rx) = mpsc::channel(1);

        let sweeping = tokens.execute(Start(
            By::<SweepExpiredTokens<TokenManager<Closed>>, _>::new(Gc {
                interval: Duration::from_secs(60),
                errors,
                shutdown,
            }),
        ));
        let observing = async {
            time::sleep(Duration::from_secs(150)).await;
            assert_eq!(db.sweeps.load(Ordering::SeqCst), 2);

            trigger.fire();
        };

        let (res, ()) = time::timeout(Duration::from_secs(600), async {
            tokio::join!(sweeping, observing)
        })
        .await
        .expect("sweep loop blocked on full errors channel");
        res.unwrap();
    }
}
