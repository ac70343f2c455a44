//! [`Token`] definitions.

use std::{fmt, str};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use time::macros::{datetime, format_description};

use crate::{
    crypto::{self, random, Signer},
    domain::user,
    time_zone::TimeZone,
};

/// Signed, time-bound token persisted in a revocation store.
#[derive(Clone, Debug)]
pub struct Token {
    /// [`Digest`] identifying this [`Token`].
    pub digest: Digest,

    /// [`Kind`] of this [`Token`].
    pub kind: Kind,

    /// ID of the user this [`Token`] is bound to.
    pub user_id: user::Id,

    /// [`Binding`] material this [`Token`] is signed with.
    pub binding: Binding,

    /// Last sign-in of the user at the moment this [`Token`] was issued.
    ///
    /// [`None`] if the user has never signed in.
    pub last_login: Option<user::LastLoginDateTime>,

    /// [`DateTime`] when this [`Token`] expires.
    pub expires_at: ExpirationDateTime,

    /// [`DateTime`] when this [`Token`] was created.
    pub created_at: CreationDateTime,

    /// [`DateTime`] when this [`Token`] was last updated.
    pub updated_at: Option<UpdateDateTime>,
}

impl Token {
    /// Checks whether this [`Token`] is expired at the provided moment.
    #[must_use]
    pub fn is_expired_at<Of: ?Sized>(&self, now: DateTimeOf<Of>) -> bool {
        now.coerce() > self.expires_at
    }
}

define_kind! {
    #[doc = "Purpose of a [`Token`]."]
    enum Kind {
        #[doc = "Confirms an email address of a newly registered account."]
        Registration = 1,

        #[doc = "Authorizes a password change without the old password."]
        PasswordReset = 2,

        #[doc = "Protects state-changing requests from cross-site forgery."]
        Csrf = 3,

        #[doc = "Authorizes a redirect to a previously requested location."]
        Redirect = 4,

        #[doc = "Lets client-side code restore its state after a reload."]
        State = 5,
    }
}

impl Kind {
    /// Canonical name of this [`Kind`], as it takes part in the signature.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Registration => "Registration",
            Self::PasswordReset => "PasswordReset",
            Self::Csrf => "CSRF",
            Self::Redirect => "Redirect",
            Self::State => "State",
        }
    }
}

/// Material a [`Token`] signature is bound to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Binding {
    /// The user's current [`user::PasswordHash`].
    ///
    /// Changing the password invalidates every [`Token`] bound to the old
    /// hash.
    Credential(user::PasswordHash),

    /// Random [`Nonce`] unrelated to the user's credentials.
    Opaque(Nonce),
}

impl Binding {
    /// Returns the string material of this [`Binding`] taking part in the
    /// signature.
    #[must_use]
    pub fn material(&self) -> &str {
        match self {
            Self::Credential(hash) => hash.as_ref(),
            Self::Opaque(nonce) => nonce.as_ref(),
        }
    }

    /// Restores a [`Binding`] of a [`Token`] of the provided [`Kind`] from its
    /// stored material.
    #[must_use]
    pub fn from_material(kind: Kind, material: String) -> Self {
        match kind {
            Kind::Csrf => Self::Opaque(Nonce(material)),
            Kind::Registration
            | Kind::PasswordReset
            | Kind::Redirect
            | Kind::State => Self::Credential(material.into()),
        }
    }
}

/// Random value binding a [`Token`] to nothing but itself.
#[derive(AsRef, Clone, Debug, Eq, PartialEq)]
#[as_ref(str)]
pub struct Nonce(String);

impl Nonce {
    /// Length of a generated [`Nonce`].
    pub const LENGTH: usize = 64;

    /// Generates a new random [`Nonce`].
    #[must_use]
    pub fn random() -> Self {
        Self(random::alphanumeric(Self::LENGTH))
    }
}

/// Opaque string identifying a [`Token`].
///
/// Formatted as `<base64(seconds)>-<hex(signature)>`, where `seconds` is the
/// issuance [`Timestamp`].
#[derive(AsRef, Clone, Debug, Display, Eq, From, Hash, Into, PartialEq)]
#[as_ref(str)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Digest(String);

impl Digest {
    /// Signs the provided [`Payload`] into a new [`Digest`].
    #[must_use]
    pub fn sign(payload: &Payload<'_>, signer: &Signer) -> Self {
        let seconds = format!("{}.000000", payload.timestamp.0);
        let signature = signer.sign(payload.to_string().as_bytes());
        Self(format!("{}-{}", BASE64.encode(seconds), hex::encode(signature)))
    }

    /// Parses the issuance [`Timestamp`] embedded into this [`Digest`].
    ///
    /// Fractional seconds are truncated. [`None`] is returned if this
    /// [`Digest`] is malformed.
    #[must_use]
    pub fn timestamp(&self) -> Option<Timestamp> {
        let (encoded, _) = self.0.split_once('-')?;
        let decoded = BASE64.decode(encoded).ok()?;
        let seconds = str::from_utf8(&decoded).ok()?;
        let whole = match seconds.split_once('.') {
            Some((whole, fraction)) => {
                fraction.bytes().all(|b| b.is_ascii_digit()).then_some(whole)?
            }
            None => seconds,
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        whole.parse().ok().map(Timestamp)
    }
}

/// Whole seconds elapsed since the [`Timestamp::EPOCH`] anchor.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Anchor [`Timestamp`]s are counted from, taken in the configured
    /// [`TimeZone`].
    pub const EPOCH: time::PrimitiveDateTime = datetime!(2020-01-01 0:00);

    /// Creates a new [`Timestamp`] of the provided moment, counting from the
    /// [`Timestamp::EPOCH`] in the provided [`TimeZone`].
    ///
    /// Moments before the anchor are clamped to zero.
    #[must_use]
    pub fn at<Of: ?Sized>(moment: DateTimeOf<Of>, zone: TimeZone) -> Self {
        let since =
            time::OffsetDateTime::from(moment) - zone.assume(Self::EPOCH);
        Self(u64::try_from(since.whole_seconds()).unwrap_or_default())
    }

    /// Returns the number of seconds in this [`Timestamp`].
    #[must_use]
    pub const fn seconds(self) -> u64 {
        self.0
    }
}

impl From<u64> for Timestamp {
    fn from(seconds: u64) -> Self {
        Self(seconds)
    }
}

/// Displays as a duration, like `1h2m3s`, `4m0s` or `0s`.
impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, minutes, seconds) =
            (self.0 / 3600, self.0 / 60 % 60, self.0 % 60);
        if hours > 0 {
            write!(f, "{hours}h{minutes}m{seconds}s")
        } else if minutes > 0 {
            write!(f, "{minutes}m{seconds}s")
        } else {
            write!(f, "{seconds}s")
        }
    }
}

/// Fields of a [`Token`] its [`Digest`] signature is computed over.
#[derive(Clone, Copy, Debug)]
pub struct Payload<'a> {
    /// ID of the user.
    pub user_id: user::Id,

    /// [`Binding`] material.
    pub binding: &'a Binding,

    /// Last sign-in of the user, if any.
    pub last_login: Option<user::LastLoginDateTime>,

    /// Issuance [`Timestamp`].
    pub timestamp: Timestamp,

    /// [`Kind`] of the [`Token`].
    pub kind: Kind,

    /// [`TimeZone`] the last sign-in is rendered in.
    pub time_zone: TimeZone,
}

impl<'a> Payload<'a> {
    /// Creates a new [`Payload`] of the provided [`Token`] issued at the
    /// provided [`Timestamp`].
    #[must_use]
    pub fn of(
        token: &'a Token,
        timestamp: Timestamp,
        time_zone: TimeZone,
    ) -> Self {
        Self {
            user_id: token.user_id,
            binding: &token.binding,
            last_login: token.last_login,
            timestamp,
            kind: token.kind,
            time_zone,
        }
    }
}

/// Displays as `{user_id}-{binding}-{last_login}-{timestamp}-{kind}`.
///
/// The last sign-in is rendered to the second as
/// `2006-01-02 15:04:05 -0700 MST` in the [`TimeZone`], or as an empty
/// string if there is none.
impl fmt::Display for Payload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last_login = match self.last_login {
            Some(at) => {
                let at = time::OffsetDateTime::from(at);
                let offset = self.time_zone.offset_at(at);
                let at = at.to_offset(offset.utc);
                let at = at.replace_nanosecond(0).unwrap_or(at);
                let moment = at
                    .format(format_description!(
                        "[year]-[month]-[day] [hour]:[minute]:[second]"
                    ))
                    .map_err(|_| fmt::Error)?;
                let numeric = at
                    .format(format_description!(
                        "[offset_hour sign:mandatory][offset_minute]"
                    ))
                    .map_err(|_| fmt::Error)?;
                format!("{moment} {numeric} {}", offset.abbreviation)
            }
            None => String::new(),
        };
        write!(
            f,
            "{}-{}-{last_login}-{}-{}",
            self.user_id,
            self.binding.material(),
            self.timestamp,
            self.kind.name(),
        )
    }
}

/// Checks whether the presented [`Digest`] matches the one re-derived from the
/// provided [`Payload`], in constant time.
#[must_use]
pub fn verify(
    presented: &Digest,
    payload: &Payload<'_>,
    signer: &Signer,
) -> bool {
    let expected = Digest::sign(payload, signer);
    crypto::constant_time_eq(expected.0.as_bytes(), presented.0.as_bytes())
}

/// [`DateTime`] of a [`Token`] creation.
pub type CreationDateTime = DateTimeOf<(Token, unit::Creation)>;

/// [`DateTime`] of a [`Token`] last update.
pub type UpdateDateTime = DateTimeOf<(Token, unit::Update)>;

/// [`DateTime`] of a [`Token`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Token, unit::Expiration)>;
