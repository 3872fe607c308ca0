//! [`User`] definitions.

use std::{str::FromStr, sync::LazyLock};

#[cfg(doc)]
use common::DateTime;
use common::DateTimeOf;
use derive_more::{AsRef, Display, From};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Campus user, as reported by the identity provider.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct User {
    /// ID of this [`User`].
    pub id: Id,

    /// Indicator whether this [`User`] has verified its e-mail address.
    pub is_verified: bool,
}

/// ID of a [`User`], which is its e-mail address.
#[derive(
    AsRef, Clone, Debug, Deserialize, Display, Eq, Hash, PartialEq, Serialize,
)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
#[serde(try_from = "String", into = "String")]
pub struct Id(String);

impl Id {
    /// Creates a new [`Id`] if the given `email` is a valid e-mail address.
    ///
    /// The address is lower-cased, so the same mailbox always maps onto the
    /// same [`Id`].
    #[must_use]
    pub fn new(email: impl Into<String>) -> Option<Self> {
        let email = email.into().to_lowercase();
        Self::check(&email).then_some(Self(email))
    }

    /// Returns the domain part of this e-mail [`Id`].
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map_or("", |(_, domain)| domain)
    }

    /// Checks whether this [`Id`] belongs to the provided e-mail `domain`.
    #[must_use]
    pub fn is_of_domain(&self, domain: &str) -> bool {
        self.domain().eq_ignore_ascii_case(domain.trim_start_matches('@'))
    }

    /// Checks whether the given `email` is a valid [`Id`].
    fn check(email: impl AsRef<str>) -> bool {
        static REGEX: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex")
        });

        let email = email.as_ref();
        email.len() <= 320 && REGEX.is_match(email)
    }
}

impl TryFrom<String> for Id {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("invalid `user::Id`")
    }
}

impl From<Id> for String {
    fn from(id: Id) -> Self {
        id.0
    }
}

impl FromStr for Id {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `user::Id`")
    }
}

/// Token issued by the identity provider to authenticate a [`User`].
#[derive(AsRef, Clone, Debug, From)]
#[as_ref(str)]
pub struct Token(String);

/// Authenticated session of a [`User`].
#[derive(Clone, Debug)]
pub struct Session {
    /// [`User`] this [`Session`] belongs to.
    pub user: User,

    /// [`DateTime`] when this [`Session`] expires.
    pub expires_at: ExpirationDateTime,
}

/// Marker type of a [`Session`] expiration.
#[derive(Clone, Copy, Debug)]
pub struct Expiration;

/// [`DateTime`] of a [`Session`] expiration.
pub type ExpirationDateTime = DateTimeOf<(Session, Expiration)>;

#[cfg(test)]
mod spec {
    use super::Id;

    #[test]
    fn normalizes_email() {
        let id = Id::new("Alice@Lion.LMU.edu").unwrap();

        assert_eq!(id.to_string(), "alice@lion.lmu.edu");
        assert_eq!(id.domain(), "lion.lmu.edu");
        assert!(id.is_of_domain("lion.lmu.edu"));
        assert!(id.is_of_domain("@LION.lmu.edu"));
        assert!(!id.is_of_domain("lmu.edu"));
    }

    #[test]
    fn rejects_malformed_email() {
        assert!(Id::new("").is_none());
        assert!(Id::new("alice").is_none());
        assert!(Id::new("alice@lmu").is_none());
        assert!(Id::new("al ice@lmu.edu").is_none());
        assert!(Id::new("alice@lmu.edu").is_some());
    }
}
