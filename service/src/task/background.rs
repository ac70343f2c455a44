//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
    iter,
};

use futures::{
    future::{self, LocalBoxFuture},
    FutureExt as _, TryFutureExt as _,
};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Background environment for running [`Task`]s.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set of tasks.
    set: task::LocalSet,

    /// Handles of spawned tasks.
    handles: Vec<task::JoinHandle<Result<(), Box<dyn Error + 'static>>>>,
}

impl Background {
    /// Spawns a new named [`Task`] inside the [`Background`] environment.
    pub fn spawn<F, E>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        self.handles.push(self.set.spawn_local(
            future
                .inspect(move |res| match res {
                    Ok(()) => log::debug!("`task::{name}` finished"),
                    Err(e) => log::error!("`task::{name}` failed: {e}"),
                })
                .map_err(|e| Box::<dyn Error + 'static>::from(Box::new(e))),
        ));
    }

    /// Returns the number of [`Task`]s spawned in this [`Background`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Indicates whether no [`Task`]s are spawned in this [`Background`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl IntoFuture for Background {
    type Output = Result<(), Box<dyn Error>>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, handles } = self;
        future::try_join_all(iter::once(set.map(Ok).boxed_local()).chain(
            handles.into_iter().map(|h| {
                h.map(|r| match r {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => Err(e),
                    Err(e) => {
                        Err(Box::<dyn Error + 'static>::from(Box::new(e)))
                    }
                })
                .boxed_local()
            }),
        ))
        .map_ok(drop)
        .boxed_local()
    }
}

#[cfg(test)]
mod spec {
    use std::{convert::Infallible, error::Error, fmt, time::Duration};

    use tokio::time;

    use super::Background;

    #[derive(Debug)]
    struct Failure;

    impl fmt::Display for Failure {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("failure")
        }
    }

    impl Error for Failure {}

    #[tokio::test]
    async fn completes_once_all_tasks_finish() {
        let mut bg = Background::default();
        bg.spawn("first", async { Ok::<_, Infallible>(()) });
        bg.spawn("second", async {
            time::sleep(Duration::from_millis(10)).await;
            Ok::<_, Infallible>(())
        });

        assert_eq!(bg.len(), 2);
        bg.await.unwrap();
    }

    #[tokio::test]
    async fn propagates_task_failure() {
        let mut bg = Background::default();
        bg.spawn("failing", async { Err::<(), _>(Failure) });

        assert_eq!(bg.await.unwrap_err().to_string(), "failure");
    }
}
