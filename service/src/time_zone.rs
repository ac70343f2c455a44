//! [`TimeZone`] definitions.

use std::str::FromStr;

use chrono::{Offset as _, TimeZone as _};
use chrono_tz::{OffsetName as _, Tz};
use derive_more::{Display, Error};
use time::{macros::format_description, PrimitiveDateTime, UtcOffset};

/// Time zone [`Token`] timestamps and sign-in moments are taken in.
///
/// [`Token`]: crate::domain::Token
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeZone {
    /// IANA time zone, like `Europe/Berlin` or `UTC`.
    Named(Tz),

    /// Fixed offset from UTC without a name.
    Fixed(UtcOffset),
}

impl Default for TimeZone {
    fn default() -> Self {
        Self::Named(Tz::UTC)
    }
}

impl TimeZone {
    /// Returns the [`Offset`] in effect in this [`TimeZone`] at the provided
    /// moment.
    #[must_use]
    pub fn offset_at(self, moment: time::OffsetDateTime) -> Offset {
        match self {
            Self::Named(tz) => {
                let Some(utc) =
                    chrono::DateTime::from_timestamp(moment.unix_timestamp(), 0)
                else {
                    return Offset::unnamed(UtcOffset::UTC);
                };
                let offset = tz.offset_from_utc_datetime(&utc.naive_utc());
                Offset {
                    utc: UtcOffset::from_whole_seconds(
                        offset.fix().local_minus_utc(),
                    )
                    .unwrap_or(UtcOffset::UTC),
                    abbreviation: offset.abbreviation().to_owned(),
                }
            }
            Self::Fixed(utc) => Offset::unnamed(utc),
        }
    }

    /// Resolves the provided wall-clock time in this [`TimeZone`].
    ///
    /// The earliest moment wins for an ambiguous wall-clock time, and the
    /// offset before a gap is used for a skipped one.
    #[must_use]
    pub fn assume(self, local: PrimitiveDateTime) -> time::OffsetDateTime {
        match self {
            Self::Named(tz) => {
                let offset = chrono::NaiveDate::from_ymd_opt(
                    local.year(),
                    u32::from(u8::from(local.month())),
                    u32::from(local.day()),
                )
                .and_then(|d| {
                    d.and_hms_opt(
                        u32::from(local.hour()),
                        u32::from(local.minute()),
                        u32::from(local.second()),
                    )
                })
                .and_then(|naive| {
                    tz.from_local_datetime(&naive)
                        .earliest()
                        .or_else(|| {
                            tz.from_local_datetime(
                                &(naive - chrono::Duration::hours(1)),
                            )
                            .earliest()
                        })
                        .map(|dt| dt.offset().fix().local_minus_utc())
                })
                .and_then(|secs| UtcOffset::from_whole_seconds(secs).ok())
                .unwrap_or(UtcOffset::UTC);
                local.assume_offset(offset)
            }
            Self::Fixed(utc) => local.assume_offset(utc),
        }
    }
}

/// Error of parsing a [`TimeZone`].
#[derive(Clone, Debug, Display, Error)]
#[display("unknown time zone `{_0}`, expected IANA name or `±HH:MM`")]
pub struct ParseError(#[error(not(source))] String);

impl FromStr for TimeZone {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(tz) = s.parse::<Tz>() {
            return Ok(Self::Named(tz));
        }
        UtcOffset::parse(
            s,
            format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
        )
        .map(Self::Fixed)
        .map_err(|_| ParseError(s.to_owned()))
    }
}

/// Offset of a [`TimeZone`] at some moment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Offset {
    /// Offset from UTC.
    pub utc: UtcOffset,

    /// Abbreviated zone name, like `CEST`.
    ///
    /// Unnamed offsets are abbreviated as `±hhmm`.
    pub abbreviation: String,
}

impl Offset {
    /// Creates a new unnamed [`Offset`].
    fn unnamed(utc: UtcOffset) -> Self {
        let (h, m, _) = utc.as_hms();
        let sign = if utc.is_negative() { '-' } else { '+' };
        Self {
            utc,
            abbreviation: format!("{sign}{:02}{:02}", h.abs(), m.abs()),
        }
    }
}
