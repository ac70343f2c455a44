//! [`Database`]-related implementations.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
mod store;

use derive_more::{Display, Error as StdError, From};

#[cfg(feature = "postgres")]
pub use self::{postgres::Postgres, store::Store};
pub use self::memory::Memory;

/// Database operation.
pub use common::Handler as Database;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    Postgres(postgres::Error),
}
