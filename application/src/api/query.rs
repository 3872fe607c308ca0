//! GraphQL [`Query`]s definitions.

use juniper::graphql_object;
use service::{query, Query as _};

use crate::{api, AsError, Context, Error};

/// Root of all GraphQL queries.
#[derive(Clone, Copy, Debug)]
pub struct Query;

impl Query {
    /// Name of the [`tracing::Span`] for the queries.
    pub(crate) const SPAN_NAME: &'static str = "GraphQL query";
}

#[graphql_object(context = Context)]
impl Query {
    /// Returns the currently signed in `Viewer`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current request is not authorized;
    /// - `EMAIL_DOMAIN_NOT_ALLOWED` - the `Viewer` is outside of the campus
    ///                                e-mail domain.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "me",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn me(ctx: &Context) -> Result<api::Viewer, Error> {
        Ok(ctx.current_session().await?.into())
    }

    /// Returns the `Listing` with the specified ID, if it exists.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current request is not authorized;
    /// - `EMAIL_NOT_VERIFIED` - the `Viewer` hasn't verified its e-mail;
    /// - `STORE_UNAVAILABLE` - the listing store hasn't responded in time.
    #[tracing::instrument(
        skip_all,
        fields(
            id = %id,
            gql.name = "listing",
            otel.name = Self::SPAN_NAME,
        ),
    )]
    pub async fn listing(
        id: api::listing::Id,
        ctx: &Context,
    ) -> Result<Option<api::Listing>, Error> {
        _ = ctx.verified_user().await?;
        ctx.service()
            .execute(query::listing::ById::by(id.into()))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())
            .map(|l| l.map(Into::into))
    }

    /// Returns all the `Listing`s matching the `search` query, in the
    /// provided `sort` order.
    ///
    /// Empty `search` matches every `Listing`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current request is not authorized;
    /// - `EMAIL_NOT_VERIFIED` - the `Viewer` hasn't verified its e-mail;
    /// - `STORE_UNAVAILABLE` - the listing store hasn't responded in time.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "listings",
            otel.name = Self::SPAN_NAME,
            search = ?search,
            sort = ?sort,
        ),
    )]
    pub async fn listings(
        search: Option<String>,
        #[graphql(default)] sort: api::listing::Sort,
        ctx: &Context,
    ) -> Result<Vec<api::Listing>, Error> {
        _ = ctx.verified_user().await?;
        Ok(ctx
            .service()
            .execute(query::listings::List(api::listing::projection(
                search, sort,
            )))
            .await
            .map_err(AsError::into_error)
            .map_err(ctx.error())?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}
