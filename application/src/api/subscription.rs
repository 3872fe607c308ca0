//! GraphQL [`Subscription`]s definitions.

use futures::{
    channel::mpsc,
    future,
    stream::{self, BoxStream},
    StreamExt as _,
};
use juniper::graphql_subscription;
use service::{domain, Subscription as Feed};

use crate::{api, error::StoreError, AsError, Context, Error};

/// Root of all GraphQL subscription.
#[derive(Clone, Copy, Debug)]
pub struct Subscription;

#[graphql_subscription(context = Context)]
impl Subscription {
    /// Live feed of the `Listing`s matching the `search` query, in the
    /// provided `sort` order.
    ///
    /// Emits the current `Listing`s first, and the complete fresh list after
    /// every change. Ends with a `STORE_UNAVAILABLE` error once the listing
    /// store stops delivering changes.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current session is not authorized;
    /// - `EMAIL_NOT_VERIFIED` - the `Viewer` hasn't verified its e-mail;
    /// - `STORE_UNAVAILABLE` - the listing store hasn't responded in time.
    pub async fn listings(
        search: Option<String>,
        #[graphql(default)] sort: api::listing::Sort,
        ctx: &Context,
    ) -> Result<BoxStream<'static, Result<Vec<api::Listing>, Error>>, Error>
    {
        _ = ctx.verified_user().await?;
        let (tx, rx) = mpsc::unbounded();
        let feed = Feed::start(
            ctx.service(),
            api::listing::projection(search, sort),
            move |listings| {
                _ = tx.unbounded_send(listings);
            },
        )
        .await
        .map_err(AsError::into_error)
        .map_err(ctx.error())?;

        Ok(forward(feed, rx))
    }
}

/// Turns the snapshots a [`Feed`] sends into `rx` into a GraphQL stream,
/// keeping the [`Feed`] alive while the stream is.
fn forward(
    feed: Feed,
    rx: mpsc::UnboundedReceiver<Vec<domain::Listing>>,
) -> BoxStream<'static, Result<Vec<api::Listing>, Error>> {
    rx.map(move |listings| {
        // Feed is cancelled once the stream is dropped.
        let _ = &feed;
        Ok(listings.into_iter().map(api::Listing::from).collect())
    })
    .chain(stream::once(future::ready(Err(
        StoreError::Unavailable.into(),
    ))))
    .boxed()
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use futures::{channel::mpsc, StreamExt as _};
    use service::{
        infra::Memory, read::listing::list::Projection, task,
        Subscription as Feed,
    };

    use crate::{Service, Store};

    use super::forward;

    #[tokio::test]
    async fn ends_with_store_unavailable_once_store_is_gone() {
        let service = Service::new(
            service::Config {
                jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                    b"secret",
                ),
                allowed_email_domain: None,
                store_timeout: Duration::from_secs(10),
                expire_listings: task::expire_listings::Config::default(),
            },
            Store::from(Memory::new()),
        )
        .0;
        let (tx, rx) = mpsc::unbounded();
        let feed = Feed::start(&service, Projection::default(), move |l| {
            _ = tx.unbounded_send(l);
        })
        .await
        .unwrap();
        let mut stream = forward(feed, rx);

        assert!(stream.next().await.unwrap().unwrap().is_empty());

        drop(service);
        let end = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();
        assert_eq!(end.code, "STORE_UNAVAILABLE");
        assert!(stream.next().await.is_none());
    }
}
