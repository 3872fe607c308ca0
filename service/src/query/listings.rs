//! [`Query`] collection related to multiple [`Listing`]s.

use common::operations::{By, Select, Subscribe};
use futures::{StreamExt as _, TryStreamExt as _};
use tracerr::Traced;

use crate::{
    domain::Listing,
    infra::{database, Database},
    read::listing::list::Projection,
    Service,
};

use super::{DatabaseQuery, Query};

/// Queries all the [`Listing`]s, ordered by their creation [`DateTime`]
/// descending.
///
/// [`DateTime`]: common::DateTime
pub type All = DatabaseQuery<By<Vec<Listing>, ()>>;

/// Queries the current [`Listing`]s through a [`Projection`].
#[derive(Clone, Debug, Default)]
pub struct List(pub Projection);

impl<Db> Query<List> for Service<Db>
where
    Db: Database<
        Select<By<Vec<Listing>, ()>>,
        Ok = Vec<Listing>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        List(projection): List,
    ) -> Result<Self::Ok, Self::Err> {
        let listings = database::timeout(
            self.config().store_timeout,
            self.database().execute(Select(By::new(()))),
        )
        .await
        .map_err(tracerr::wrap!())?;

        Ok(projection.apply(&listings))
    }
}

/// Queries a live feed of the [`Listing`]s seen through a [`Projection`].
///
/// Emits the current view first, and a fresh one after every change.
#[derive(Clone, Debug, Default)]
pub struct Live(pub Projection);

impl<Db> Query<Live> for Service<Db>
where
    Db: Database<
        Subscribe<By<Vec<Listing>, ()>>,
        Ok = database::Snapshots,
        Err = Traced<database::Error>,
    >,
{
    type Ok = database::Snapshots;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Live(projection): Live,
    ) -> Result<Self::Ok, Self::Err> {
        let snapshots = database::timeout(
            self.config().store_timeout,
            self.database().execute(Subscribe(By::new(()))),
        )
        .await
        .map_err(tracerr::wrap!())?;

        Ok(snapshots
            .map_ok(move |listings| projection.apply(&listings))
            .boxed())
    }
}
