//! [`Cookie`]s carrying [`Token`]s and [`Session`] IDs.
//!
//! [`Session`]: crate::domain::Session
//! [`Token`]: crate::domain::Token

use std::{borrow::Cow, time::Duration};

use common::{DateTime, DateTimeOf};
use cookie::{Cookie, CookieBuilder, Expiration, SameSite};

/// Starts building a [`Cookie`] valid on the whole `domain` until the provided
/// moment.
///
/// The [`Cookie`] is `Secure` and `HttpOnly` with the `Lax` [`SameSite`]
/// policy. Its `Max-Age` is the whole number of seconds left until it expires.
pub(crate) fn secure<Of: ?Sized>(
    name: impl Into<Cow<'static, str>>,
    value: impl Into<Cow<'static, str>>,
    domain: impl Into<Cow<'static, str>>,
    expires_at: DateTimeOf<Of>,
) -> CookieBuilder<'static> {
    let max_age = expires_at.saturating_duration_since(DateTime::now());
    Cookie::build((name, value))
        .domain(domain)
        .path("/")
        .secure(true)
        .http_only(true)
        .same_site(SameSite::Lax)
        .expires(Expiration::DateTime(expires_at.into()))
        .max_age(seconds(max_age))
}

/// Builds a [`Cookie`] instructing a client to drop the [`Cookie`] with the
/// provided `name` immediately.
#[must_use]
pub fn removal(
    name: impl Into<Cow<'static, str>>,
    domain: impl Into<Cow<'static, str>>,
) -> Cookie<'static> {
    Cookie::build((name, ""))
        .domain(domain)
        .path("/")
        .secure(true)
        .http_only(true)
        .max_age(time::Duration::ZERO)
        .expires(Expiration::DateTime(time::OffsetDateTime::UNIX_EPOCH))
        .build()
}

/// Converts the provided [`Duration`] into whole seconds of a `Max-Age`.
fn seconds(duration: Duration) -> time::Duration {
    time::Duration::seconds(
        i64::try_from(duration.as_secs()).unwrap_or(i64::MAX),
    )
}
