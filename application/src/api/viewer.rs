//! [`Viewer`]-related definitions.

use common::DateTime;
use derive_more::{AsRef, Display, From, Into};
use juniper::{graphql_object, GraphQLScalar};
use service::domain;

use crate::{api, api::scalar, Context, Session};

/// Signed in campus user viewing the board.
#[derive(Clone, Debug, From)]
pub struct Viewer(Session);

#[graphql_object(context = Context)]
impl Viewer {
    /// E-mail address of this `Viewer`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Viewer.email",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn email(&self) -> Email {
        self.0.user.id.clone().into()
    }

    /// Indicator whether this `Viewer` has verified its e-mail address.
    ///
    /// Unverified `Viewer`s may only query `me`, every `Listing` operation
    /// requires a verified e-mail.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Viewer.isVerified",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn is_verified(&self) -> bool {
        self.0.user.is_verified
    }

    /// `DateTime` when the session of this `Viewer` expires.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Viewer.expiresAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn expires_at(&self) -> DateTime {
        self.0.expires_at
    }
}

/// E-mail address of a user.
#[derive(AsRef, Clone, Debug, Display, From, GraphQLScalar, Into)]
#[graphql(with = scalar::Via::<domain::user::Id>)]
pub struct Email(domain::user::Id);
