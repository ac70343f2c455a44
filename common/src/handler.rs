//! [`Handler`] abstractions.

use std::future::Future;

/// Executable handler.
///
/// Every store operation, command, query and background task is expressed
/// as a [`Handler`] of a dedicated argument type, so a single type may
/// handle many kinds of arguments.
pub trait Handler<Args = ()> {
    /// Type of successful [`Handler`] result.
    type Ok;

    /// Type of this [`Handler`] error.
    type Err;

    /// Executes this [`Handler`] with the provided arguments.
    fn execute(
        &self,
        args: Args,
    ) -> impl Future<Output = Result<Self::Ok, Self::Err>>;
}
