//! GraphQL [`Mutation`]s definitions.

use common::DateTime;
use juniper::graphql_object;
use service::{command, query, Command as _, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL mutations.
#[derive(Clone, Copy, Debug)]
pub struct Mutation;

impl Mutation {
    /// Name of the [`tracing::Span`] for the mutations.
    const SPAN_NAME: &'static str = "GraphQL mutation";
}

#[graphql_object(context = Context)]
impl Mutation {
    /// Posts a new `Listing` owned by the current `Viewer`.
    ///
    /// Either both `scheduledStart` and `scheduledEnd` are provided, or none.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current request is not authorized;
    /// - `EMAIL_NOT_VERIFIED` - the `Viewer` hasn't verified its e-mail;
    /// - `INVALID_LISTING` - the provided fields don't form a valid
    ///                       `Listing`;
    /// - `STORE_UNAVAILABLE` - the listing store hasn't responded in time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "createListing",
            header = %header,
            kind = ?kind,
            member_limit = member_limit,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn create_listing(
        header: String,
        body: String,
        kind: api::listing::Kind,
        member_limit: i32,
        scheduled_start: Option<DateTime>,
        scheduled_end: Option<DateTime>,
        ctx: &Context,
    ) -> Result<api::listing::Id, Error> {
        let author = ctx.verified_user().await?;
        ctx.service()
            .execute(command::CreateListing {
                author: Some(author),
                header,
                body,
                kind: kind.into(),
                member_limit: member_limit.into(),
                scheduled_start: scheduled_start.map(DateTime::coerce),
                scheduled_end: scheduled_end.map(DateTime::coerce),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(Into::into)
    }

    /// Adds the current `Viewer` to the members of the `Listing` with the
    /// specified ID.
    ///
    /// Joining is checked against the `Listing` as it's fetched, so
    /// concurrent joins may overfill it by a few members.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current request is not authorized;
    /// - `EMAIL_NOT_VERIFIED` - the `Viewer` hasn't verified its e-mail;
    /// - `LISTING_NOT_EXISTS` - the `Listing` with the specified ID does not
    ///                          exist;
    /// - `ALREADY_OWNER` - the `Viewer` owns the `Listing`;
    /// - `ALREADY_MEMBER` - the `Viewer` has joined the `Listing` already;
    /// - `LISTING_FULL` - the `Listing` has no free slots left;
    /// - `STORE_UNAVAILABLE` - the listing store hasn't responded in time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "joinListing",
            id = %id,
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn join_listing(
        id: api::listing::Id,
        ctx: &Context,
    ) -> Result<bool, Error> {
        let user = ctx.verified_user().await?;
        let listing = ctx
            .service()
            .execute(query::listing::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .ok_or_else(|| api::listing::ListingError::NotExists.into())
            .map_err(ctx.error())?;

        ctx.service()
            .execute(command::JoinListing {
                listing,
                user: Some(user),
            })
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?;

        Ok(true)
    }
}
