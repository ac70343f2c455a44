//! Macros for defining kind enums.

/// Macro for defining a kind enum backed by a [`u8`] discriminant.
///
/// The generated enum is displayed and parsed in `SCREAMING_SNAKE_CASE`, and
/// stored as `INT2` in PostgreSQL.
///
/// # Example
///
/// ```rust
/// # use crate::common::define_kind;
///
/// define_kind! {
///     #[doc = "Shape kind."]
///     enum Kind {
///         #[doc = "A cube"]
///         Cube = 1,
///
///         #[doc = "A sphere"]
///         Sphere = 2,
///     }
/// }
///
/// assert_eq!(Kind::try_from(2), Ok(Kind::Sphere));
/// assert_eq!(Kind::Cube.to_string(), "CUBE");
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            Eq,
            Hash,
            PartialEq,
        )]
        #[cfg_attr(
            feature = "serde",
            derive(
                $crate::private::serde::Deserialize,
                $crate::private::serde::Serialize,
            ),
            serde(rename_all = "SCREAMING_SNAKE_CASE"),
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant = $value,
            )*
        }

        impl $name {
            /// All the variants of this enum, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }
        }

        impl ::core::convert::TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(v: u8) -> Result<Self, u8> {
                match v {
                    $(
                        v if Self::$variant.u8() == v => Ok(Self::$variant),
                    )*
                    v => Err(v),
                }
            }
        }

        #[cfg(feature = "postgres")]
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                Self::try_from(u8::try_from(i16::from_sql(ty, raw)?)?)
                    .map_err(|v| ::std::format!(
                        "invalid `{}` value: {v}",
                        ::core::stringify!($name),
                    ).into())
            }
        }

        #[cfg(feature = "postgres")]
        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

#[cfg(test)]
mod spec {
    crate::define_kind! {
        #[doc = "Test kind."]
        enum Kind {
            #[doc = "First."]
            First = 1,

            #[doc = "Second one."]
            SecondOne = 5,
        }
    }

    #[test]
    fn converts_from_discriminant() {
        assert_eq!(Kind::try_from(1), Ok(Kind::First));
        assert_eq!(Kind::try_from(5), Ok(Kind::SecondOne));
        assert_eq!(Kind::try_from(0), Err(0));
        assert_eq!(Kind::try_from(2), Err(2));
    }

    #[test]
    fn displays_in_screaming_snake_case() {
        assert_eq!(Kind::SecondOne.to_string(), "SECOND_ONE");
        assert_eq!("FIRST".parse::<Kind>().unwrap(), Kind::First);
    }

    #[test]
    fn lists_all_variants() {
        assert_eq!(Kind::ALL, &[Kind::First, Kind::SecondOne]);
    }
}
