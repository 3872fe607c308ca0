//! [`ExpireListings`] [`Task`].

use std::{convert::Infallible, error::Error, time};

use common::operations::{By, Delete, Perform, Start};
use smart_default::SmartDefault;
use tokio::time::interval;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{listing, Listing},
    infra::{database, Database},
    Service,
};

use super::Task;

/// Configuration for [`ExpireListings`] [`Task`].
#[derive(Clone, Copy, Debug, SmartDefault)]
pub struct Config {
    /// Interval between expired [`Listing`]s removals.
    #[default(time::Duration::from_secs(60 * 60))]
    pub interval: time::Duration,

    /// Period after the scheduled end during which a [`Listing`] is kept.
    #[default(time::Duration::from_secs(30 * 24 * 60 * 60))]
    pub retention: time::Duration,
}

/// [`Task`] for removing [`Listing`]s whose [`listing::Schedule`] has ended
/// longer than the retention period ago.
///
/// Unscheduled [`Listing`]s are never removed.
#[derive(Clone, Copy, Debug)]
pub struct ExpireListings<S> {
    /// [`Config`] of this [`Task`].
    config: Config,

    /// [`Service`] instance.
    service: S,
}

impl<Db> Task<Start<By<ExpireListings<Self>, Config>>> for Service<Db>
where
    ExpireListings<Service<Db>>:
        Task<Perform<()>, Ok = u64, Err: Error> + Send + Sync + 'static,
    Self: Clone,
{
    type Ok = ();
    type Err = Infallible;

    async fn execute(
        &self,
        Start(by): Start<By<ExpireListings<Self>, Config>>,
    ) -> Result<Self::Ok, Self::Err> {
        let config = by.into_inner();
        let task = ExpireListings {
            config,
            service: self.clone(),
        };

        let mut interval = interval(task.config.interval);
        loop {
            let _ = interval.tick().await;
            match task.execute(Perform(())).await {
                Ok(0) => {}
                Ok(n) => log::info!("removed {n} expired `Listing`s"),
                Err(e) => log::error!("`task::ExpireListings` failed: {e}"),
            }
        }
    }
}

impl<Db> Task<Perform<()>> for ExpireListings<Service<Db>>
where
    Db: Database<
        Delete<By<Vec<Listing>, listing::EndDateTime>>,
        Ok = u64,
        Err = Traced<database::Error>,
    >,
{
    type Ok = u64;
    type Err = ExecutionError;

    async fn execute(&self, _: Perform<()>) -> Result<Self::Ok, Self::Err> {
        let Some(deadline) =
            listing::EndDateTime::now().checked_sub(self.config.retention)
        else {
            log::debug!(
                "retention of {:?} reaches beyond the earliest `DateTime`, \
                 nothing to remove",
                self.config.retention,
            );
            return Ok(0);
        };
        database::timeout(
            self.service.config().store_timeout,
            self.service.database().execute(Delete(By::new(deadline))),
        )
        .await
        .map_err(tracerr::wrap!())
    }
}

/// Error of [`ExpireListings`] execution.
pub type ExecutionError = Traced<database::Error>;

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::{
        operations::{By, Insert, Perform, Select},
        DateTime,
    };

    use crate::{
        domain::{listing, user, Listing},
        infra::{Database, Memory},
        task::Task as _,
        Service,
    };

    use super::{Config, ExpireListings};

    async fn insert(db: &Memory, ended_ago: Option<Duration>) -> listing::Id {
        let (start, end) = ended_ago.map_or((None, None), |ago| {
            let end = DateTime::now() - ago;
            (
                Some((end - Duration::from_secs(3600)).coerce()),
                Some(end.coerce()),
            )
        });
        let draft = listing::Draft::new(
            user::Id::new("owner@lion.lmu.edu").unwrap(),
            "Gig",
            "Details",
            listing::Kind::Event,
            5,
            start,
            end,
        )
        .unwrap();
        db.execute(Insert(draft)).await.unwrap()
    }

    #[tokio::test]
    async fn removes_only_long_ended_listings() {
        let day = Duration::from_secs(24 * 60 * 60);
        let db = Memory::new();
        let (svc, _bg) = Service::new(crate::spec::config(), db.clone());
        _ = insert(&db, Some(day * 31)).await;
        let recent = insert(&db, Some(day)).await;
        let unscheduled = insert(&db, None).await;

        let task = ExpireListings {
            config: Config::default(),
            service: svc,
        };
        assert_eq!(task.execute(Perform(())).await.unwrap(), 1);
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        let ids = db
            .execute(Select(By::<Vec<Listing>, _>::new(())))
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, [unscheduled, recent]);
    }

    #[tokio::test]
    async fn survives_retention_beyond_calendar() {
        let db = Memory::new();
        let (svc, _bg) = Service::new(crate::spec::config(), db.clone());
        let ended = insert(&db, Some(Duration::from_secs(3600))).await;

        let task = ExpireListings {
            config: Config {
                retention: Duration::from_secs(u64::MAX),
                ..Config::default()
            },
            service: svc,
        };
        assert_eq!(task.execute(Perform(())).await.unwrap(), 0);

        let ids = db
            .execute(Select(By::<Vec<Listing>, _>::new(())))
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, [ended]);
    }
}
