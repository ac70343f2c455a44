//! Background [`Task`]s definitions.

mod background;
pub mod shutdown;
pub mod sweep_expired_sessions;
pub mod sweep_expired_tokens;

use std::{convert::Infallible, future::Future, time::Duration};

use derive_more::{Display, Error};
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tracing as log;

pub use common::Handler as Task;

pub use self::{
    background::Background,
    shutdown::{Shutdown, Trigger},
    sweep_expired_sessions::SweepExpiredSessions,
    sweep_expired_tokens::SweepExpiredTokens,
};

/// Arguments of starting an expiration sweeping [`Task`].
#[derive(Clone, Debug)]
pub struct Gc {
    /// Interval between sweeps.
    pub interval: Duration,

    /// Channel to report [`SweepError`]s into.
    ///
    /// Reporting waits while the channel is full, unless the [`Shutdown`] is
    /// requested meanwhile.
    pub errors: mpsc::Sender<SweepError>,

    /// [`Shutdown`] signal stopping the sweeps.
    pub shutdown: Shutdown,
}

/// Error of a single expiration sweep.
#[derive(Debug, Display, Error)]
pub enum SweepError {
    /// [`SweepExpiredTokens`] failed.
    #[display("Failed to sweep expired tokens: {_0}")]
    Tokens(sweep_expired_tokens::ExecutionError),

    /// [`SweepExpiredSessions`] failed.
    #[display("Failed to sweep expired sessions: {_0}")]
    Sessions(sweep_expired_sessions::ExecutionError),
}

/// Runs the provided `sweep` every [`Gc::interval`] until the [`Shutdown`] is
/// requested.
///
/// The first sweep happens one interval after the start. A failed sweep is
/// reported and retried on the next tick. Requesting the [`Shutdown`] stops
/// waiting for a full errors channel as well.
async fn sweep_periodically<F, Fut>(name: &str, gc: Gc, mut sweep: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<u64, SweepError>>,
{
    let Gc {
        interval,
        errors,
        mut shutdown,
    } = gc;

    let mut ticks = time::interval(interval);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let _ = ticks.tick().await;

    loop {
        tokio::select! {
            biased;

            () = shutdown.requested() => break,
            _ = ticks.tick() => {}
        }

        match sweep().await {
            Ok(0) => {}
            Ok(swept) => log::debug!("`task::{name}` swept {swept} entries"),
            Err(e) => tokio::select! {
                biased;

                () = shutdown.requested() => break,
                res = errors.send(e) => {
                    if let Err(e) = res {
                        log::error!(
                            "`task::{name}` failed unobserved: {}",
                            e.0,
                        );
                    }
                }
            },
        }
    }

    log::debug!("`task::{name}` stopped");
}

/// Logs every [`SweepError`] received until all the senders are dropped.
///
/// # Errors
///
/// Never.
pub async fn drain_sweep_errors(
    mut errors: mpsc::Receiver<SweepError>,
) -> Result<(), Infallible> {
    while let Some(e) = errors.recv().await {
        log::error!("{e}");
    }
    Ok(())
}
