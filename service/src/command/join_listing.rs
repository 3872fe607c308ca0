//! [`Command`] for joining a [`Listing`].

use common::operations::Insert;
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{listing, Listing, User},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for adding a [`User`] to the [`listing::Members`] of a
/// [`Listing`].
///
/// The provided [`Listing`] is the snapshot the [`User`] acts upon: all the
/// [`listing::Refusal`]s are decided against it, without reaching the
/// [`Database`]. The [`Database`] itself only unites the members, so two
/// [`User`]s racing for the last slot may both succeed.
#[derive(Clone, Debug)]
pub struct JoinListing {
    /// Snapshot of the [`Listing`] to join.
    pub listing: Listing,

    /// [`User`] joining the [`Listing`], if signed in.
    pub user: Option<User>,
}

impl<Db> Command<JoinListing> for Service<Db>
where
    Db: Database<
        Insert<listing::NewMember>,
        Ok = bool,
        Err = Traced<database::Error>,
    >,
{
    type Ok = ();
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: JoinListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let JoinListing { listing, user } = cmd;

        if let Err(refusal) = listing.check_join(user.as_ref()) {
            log::debug!(
                "`User(id: {})` refused to join `Listing(id: {})`: {refusal}",
                user.as_ref()
                    .map_or_else(|| "<anonymous>".into(), |u| u.id.to_string()),
                listing.id,
            );
            return Err(tracerr::new!(E::Refused(refusal)));
        }
        let user_id = user
            .map(|u| u.id)
            .ok_or(E::Refused(listing::Refusal::NotAuthenticated))
            .map_err(tracerr::wrap!())?;

        let exists = database::timeout(
            self.config().store_timeout,
            self.database().execute(Insert(listing::NewMember {
                listing_id: listing.id,
                user_id: user_id.clone(),
            })),
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;
        if !exists {
            return Err(tracerr::new!(E::ListingNotExists(listing.id)));
        }

        log::info!("`User(id: {user_id})` joined `Listing(id: {})`", listing.id);

        Ok(())
    }
}

/// Error of [`JoinListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] is unreachable or hasn't responded in time.
    #[display("Store is unavailable: {_0}")]
    StoreUnavailable(database::Error),

    /// [`User`] may not join the [`Listing`].
    #[display("Refused to join `Listing`: {_0}")]
    Refused(listing::Refusal),

    /// [`Listing`] has been removed from the [`Database`].
    #[display("`Listing(id: {_0})` does not exist")]
    #[from(ignore)]
    ListingNotExists(#[error(not(source))] listing::Id),
}

#[cfg(test)]
mod spec {
    use common::operations::{By, Insert, Select};

    use crate::{
        domain::{
            listing::{self, spec::verified},
            user, Listing,
        },
        infra::{Database, Memory},
        Service,
    };

    use super::{ExecutionError, JoinListing};

    async fn seeded(db: &Memory) -> Listing {
        let draft = listing::Draft::new(
            user::Id::new("owner@lion.lmu.edu").unwrap(),
            "Study group",
            "Midterm prep",
            listing::Kind::Academic,
            2,
            None,
            None,
        )
        .unwrap();
        let id = db.execute(Insert(draft)).await.unwrap();
        db.execute(Select(By::<Option<Listing>, _>::new(id)))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn refuses_without_reaching_store() {
        let db = Memory::new();
        let listing = seeded(&db).await;
        db.set_reachable(false);
        let (svc, _bg) = Service::new(crate::spec::config(), db);

        let err = svc
            .execute(JoinListing {
                listing,
                user: Some(verified("owner@lion.lmu.edu")),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::Refused(listing::Refusal::AlreadyOwner),
        ));
    }

    #[tokio::test]
    async fn reports_missing_listing() {
        let db = Memory::new();
        let mut gone = seeded(&db).await;
        gone.id = listing::Id::new();
        let (svc, _bg) = Service::new(crate::spec::config(), db);

        let err = svc
            .execute(JoinListing {
                listing: gone,
                user: Some(verified("a@lion.lmu.edu")),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_ref(),
            ExecutionError::ListingNotExists(_),
        ));
    }

    #[tokio::test]
    async fn reports_unavailable_store() {
        let db = Memory::new();
        let listing = seeded(&db).await;
        db.set_reachable(false);
        let (svc, _bg) = Service::new(crate::spec::config(), db.clone());

        let err = svc
            .execute(JoinListing {
                listing: listing.clone(),
                user: Some(verified("a@lion.lmu.edu")),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::StoreUnavailable(_)));

        db.set_reachable(true);
        let after = db
            .execute(Select(By::<Option<Listing>, _>::new(listing.id)))
            .await
            .unwrap()
            .unwrap();
        assert!(after.members.is_empty());
    }
}
