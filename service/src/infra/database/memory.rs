//! In-memory [`Database`] implementation.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Duration,
};

use common::{
    operations::{By, Delete, Insert, Select, Subscribe},
    DateTime,
};
use derive_more::{Display, Error as StdError};
use futures::{stream, StreamExt as _};
use tokio::sync::watch;
use tracerr::Traced;

use crate::{
    domain::{listing, Listing},
    infra::{
        database::{self, Snapshots},
        Database,
    },
};

/// [`Database`] keeping [`Listing`]s in the process memory.
///
/// Clones share the same state, so a change made via one clone is observed by
/// the [`Snapshots`] of all the others.
#[derive(Clone, Debug)]
pub struct Memory(Arc<Inner>);

/// Shared state of a [`Memory`] store.
#[derive(Debug)]
struct Inner {
    /// [`Listing`]s ordered by their creation [`DateTime`] descending.
    listings: watch::Sender<Vec<Listing>>,

    /// Indicator whether the store accepts operations.
    reachable: AtomicBool,

    /// Artificial delay of every operation.
    latency: Mutex<Duration>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    /// Creates a new empty [`Memory`] store.
    #[must_use]
    pub fn new() -> Self {
        let (listings, _) = watch::channel(Vec::new());
        Self(Arc::new(Inner {
            listings,
            reachable: AtomicBool::new(true),
            latency: Mutex::new(Duration::ZERO),
        }))
    }

    /// Makes this [`Memory`] store (un)reachable.
    ///
    /// Every operation on an unreachable store fails with
    /// [`Error::Unreachable`] and leaves the state untouched.
    pub fn set_reachable(&self, reachable: bool) {
        self.0.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Delays every following operation by the provided `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.0.latency.lock().unwrap_or_else(PoisonError::into_inner) =
            latency;
    }

    /// Emulates a round trip to this [`Memory`] store.
    async fn round_trip(&self) -> Result<(), Traced<database::Error>> {
        let latency =
            *self.0.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.0.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(tracerr::new!(database::Error::from(Error::Unreachable)))
        }
    }
}

impl Database<Insert<listing::Draft>> for Memory {
    type Ok = listing::Id;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(draft): Insert<listing::Draft>,
    ) -> Result<Self::Ok, Self::Err> {
        self.round_trip().await.map_err(tracerr::wrap!())?;

        let listing::Draft {
            header,
            body,
            kind,
            owner,
            member_limit,
            schedule,
        } = draft;
        let id = listing::Id::new();
        self.0.listings.send_modify(|listings| {
            listings.insert(
                0,
                Listing {
                    id,
                    header,
                    body,
                    kind,
                    owner,
                    member_limit,
                    members: listing::Members::new(),
                    schedule,
                    created_at: Some(DateTime::now().coerce()),
                },
            );
        });

        Ok(id)
    }
}

impl Database<Insert<listing::NewMember>> for Memory {
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(member): Insert<listing::NewMember>,
    ) -> Result<Self::Ok, Self::Err> {
        self.round_trip().await.map_err(tracerr::wrap!())?;

        let listing::NewMember {
            listing_id,
            user_id,
        } = member;
        let mut exists = false;
        _ = self.0.listings.send_if_modified(|listings| {
            listings
                .iter_mut()
                .find(|l| l.id == listing_id)
                .is_some_and(|l| {
                    exists = true;
                    l.members.unite(user_id)
                })
        });

        Ok(exists)
    }
}

impl Database<Select<By<Vec<Listing>, ()>>> for Memory {
    type Ok = Vec<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<Vec<Listing>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.round_trip().await.map_err(tracerr::wrap!())?;

        Ok(self.0.listings.borrow().clone())
    }
}

impl Database<Select<By<Option<Listing>, listing::Id>>> for Memory {
    type Ok = Option<Listing>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Listing>, listing::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.round_trip().await.map_err(tracerr::wrap!())?;

        let id = by.into_inner();
        Ok(self.0.listings.borrow().iter().find(|l| l.id == id).cloned())
    }
}

impl Database<Delete<By<Vec<Listing>, listing::EndDateTime>>> for Memory {
    type Ok = u64;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Delete(by): Delete<By<Vec<Listing>, listing::EndDateTime>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.round_trip().await.map_err(tracerr::wrap!())?;

        let ended_before = by.into_inner();
        let mut removed = 0;
        _ = self.0.listings.send_if_modified(|listings| {
            let total = listings.len();
            listings.retain(|l| {
                !l.schedule.is_some_and(|s| s.end() < ended_before)
            });
            removed = total - listings.len();
            removed > 0
        });

        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }
}

impl Database<Subscribe<By<Vec<Listing>, ()>>> for Memory {
    type Ok = Snapshots;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Subscribe<By<Vec<Listing>, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.round_trip().await.map_err(tracerr::wrap!())?;

        let rx = self.0.listings.subscribe();
        Ok(stream::unfold((rx, true), |(mut rx, is_first)| async move {
            if !is_first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = rx.borrow_and_update().clone();
            Some((Ok(snapshot), (rx, false)))
        })
        .boxed())
    }
}

/// [`Memory`] store error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Memory`] store is made unreachable.
    #[display("`Memory` store is unreachable")]
    Unreachable,
}
