//! Newtype IDs for type-safe entity references.
//!
//! Every identifier in Basket is an opaque string issued elsewhere (the auth
//! gateway for users, the catalog for products and variants, the session
//! service for guests). Use the `define_id!` macro to create validated wrappers
//! that prevent accidentally mixing IDs from different entity types.
//!
//! IDs are embedded in key-value store keys such as `cart:<session>`, so
//! the accepted alphabet is deliberately narrow.

use thiserror::Error;

/// Maximum length of any identifier.
pub const MAX_ID_LENGTH: usize = 128;

/// Errors that can occur when parsing an identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("id cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-:.]`.
    #[error("id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Validate an identifier string.
///
/// # Errors
///
/// Returns an error if the input is empty, longer than [`MAX_ID_LENGTH`], or
/// contains characters other than ASCII alphanumerics, `_`, `-` and `.`.
pub fn validate_id(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }

    if s.len() > MAX_ID_LENGTH {
        return Err(IdError::TooLong { max: MAX_ID_LENGTH });
    }

    if let Some(c) = s
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(IdError::InvalidCharacter(c));
    }

    Ok(())
}

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` as a plain string (validated on deserialize)
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()`, `as_str()`, `Display`, `FromStr`, `AsRef<str>`
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use basket_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::parse("user-42").unwrap();
/// let order_id = OrderId::parse("order-7").unwrap();
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse and validate an ID.
            ///
            /// # Errors
            ///
            /// Returns an [`IdError`]($crate::IdError) if the input is not a
            /// valid identifier.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::IdError> {
                $crate::validate_id(s)?;
                Ok(Self(s.to_owned()))
            }

            /// Wrap a string built only from the id alphabet.
            ///
            /// Validation runs in debug builds only.
            #[must_use]
            pub fn from_trusted(s: String) -> Self {
                debug_assert!($crate::validate_id(&s).is_ok());
                Self(s)
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::IdError;

            fn try_from(s: String) -> ::core::result::Result<Self, Self::Error> {
                $crate::validate_id(&s)?;
                Ok(Self(s))
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let id = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self::try_from(id)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(SessionId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert!(VariantId::parse("variant-1").is_ok());
        assert!(UserId::parse("user-42").is_ok());
        assert!(UserId::parse("4f1c2a9e-8d3b-4c7a-9e21-0b6f5d8a7c34").is_ok());
        assert!(SessionId::parse("guest_abc_1").is_ok());
        assert!(ProductId::parse("gid.product.17").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(VariantId::parse(""), Err(IdError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            SessionId::parse(&long),
            Err(IdError::TooLong { .. })
        ));
        assert!(SessionId::parse(&"a".repeat(MAX_ID_LENGTH)).is_ok());
    }

    #[test]
    fn test_parse_rejects_key_separators_and_whitespace() {
        assert_eq!(
            SessionId::parse("abc def"),
            Err(IdError::InvalidCharacter(' '))
        );
        assert_eq!(
            SessionId::parse("abc*"),
            Err(IdError::InvalidCharacter('*'))
        );
        assert_eq!(
            SessionId::parse("a/b"),
            Err(IdError::InvalidCharacter('/'))
        );
        assert_eq!(
            SessionId::parse("abc:added"),
            Err(IdError::InvalidCharacter(':'))
        );
    }

    #[test]
    fn test_display_and_as_str() {
        let id = VariantId::parse("variant-1").unwrap();
        assert_eq!(id.as_str(), "variant-1");
        assert_eq!(format!("{id}"), "variant-1");
    }

    #[test]
    fn test_serde_is_plain_string() {
        let id = UserId::parse("user-42").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"user-42\"");

        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_deserialize_validates() {
        let result: Result<VariantId, _> = serde_json::from_str("\"bad id\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_str() {
        let id: ProductId = "product-9".parse().unwrap();
        assert_eq!(id.as_ref(), "product-9");
    }
}
