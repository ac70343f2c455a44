//! [`Identity`] definitions.
//!
//! Users themselves are owned by the embedding application. Here lives only
//! what tokens and sessions need to know about them.

#[cfg(doc)]
use common::DateTime;
use common::{unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user identity stored inside a [`Session`].
///
/// [`Session`]: crate::domain::Session
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identity {
    /// ID of the user.
    pub id: Id,

    /// [`Username`] of the user.
    pub username: Username,
}

/// ID of a user.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Name a user signs in with.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, From, PartialEq, Serialize,
)]
#[as_ref(str)]
#[serde(transparent)]
pub struct Username(String);

/// Current password hash of a user.
///
/// Tokens bound to it stop verifying once the password changes.
#[derive(AsRef, Clone, Debug, Eq, From, PartialEq)]
#[as_ref(str)]
pub struct PasswordHash(String);

/// [`DateTime`] of the last successful user sign-in.
pub type LastLoginDateTime = DateTimeOf<(Identity, unit::Login)>;
