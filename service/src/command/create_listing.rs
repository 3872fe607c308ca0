//! [`Command`] for creating a new [`Listing`].

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

/// [`Command`] for creating a new [`Listing`].
///
/// Raw fields are validated into a [`listing::Draft`] before reaching the
/// [`Database`], which assigns the ID and the creation [`DateTime`].
///
/// [`DateTime`]: common::DateTime
#[derive(Clone, Debug)]
pub struct CreateListing {
    /// [`User`] creating a new [`Listing`], if signed in.
    pub author: Option<User>,

    /// Raw [`listing::Header`] of a new [`Listing`].
    pub header: String,

    /// Raw [`listing::Body`] of a new [`Listing`].
    pub body: String,

    /// [`listing::Kind`] of a new [`Listing`].
    pub kind: listing::Kind,

    /// Raw [`listing::MemberLimit`] of a new [`Listing`].
    pub member_limit: i64,

    /// [`DateTime`] when a new [`Listing`] starts, if scheduled.
    ///
    /// [`DateTime`]: common::DateTime
    pub scheduled_start: Option<listing::StartDateTime>,

    /// [`DateTime`] when a new [`Listing`] ends, if scheduled.
    ///
    /// [`DateTime`]: common::DateTime
    pub scheduled_end: Option<listing::EndDateTime>,
}

impl<Db> Command<CreateListing> for Service<Db>
where
    Db: Database<
        Insert<listing::Draft>,
        Ok = listing::Id,
        Err = Traced<database::Error>,
    >,
{
    type Ok = listing::Id;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateListing) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateListing {
            author,
            header,
            body,
            kind,
            member_limit,
            scheduled_start,
            scheduled_end,
        } = cmd;

        let author = author
            .filter(|a| a.is_verified)
            .ok_or(E::NotAuthenticated)
            .map_err(tracerr::wrap!())?;

        let draft = listing::Draft::new(
            author.id.clone(),
            &header,
            &body,
            kind,
            member_limit,
            scheduled_start,
            scheduled_end,
        )
        .map_err(tracerr::from_and_wrap!(=> E))?;

        let id = database::timeout(
            self.config().store_timeout,
            self.database().execute(Insert(draft)),
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))?;

        log::info!("`Listing(id: {id})` created by `User(id: {})`", author.id);

        Ok(id)
    }
}

/// Error of [`CreateListing`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] is unreachable or hasn't responded in time.
    #[display("Store is unavailable: {_0}")]
    StoreUnavailable(database::Error),

    /// Provided fields don't form a valid [`listing::Draft`].
    #[display("Invalid `Listing`: {_0}")]
    Validation(listing::InvalidDraft),

    /// [`User`] is not signed in or hasn't verified its e-mail.
    #[display("`User` is not authenticated")]
    #[from(ignore)]
    NotAuthenticated,
}

#[cfg(test)]
mod spec {
    use common::{
        operations::{By, Select},
        DateTime,
    };

    use crate::{
        domain::{
            listing::{self, spec::verified},
            Listing,
        },
        infra::{Database, Memory},
        Service,
    };

    use super::{CreateListing, ExecutionError};

    fn cmd(author: Option<crate::domain::User>) -> CreateListing {
        CreateListing {
            author,
            header: "Pickup soccer".into(),
            body: "Bring cleats".into(),
            kind: listing::Kind::Sports,
            member_limit: 10,
            scheduled_start: None,
            scheduled_end: None,
        }
    }

    #[tokio::test]
    async fn creates_listing() {
        let db = Memory::new();
        let (svc, _bg) = Service::new(crate::spec::config(), db.clone());

        let id = svc
            .execute(cmd(Some(verified("a@lion.lmu.edu"))))
            .await
            .unwrap();

        let listing = db
            .execute(Select(By::<Option<Listing>, _>::new(id)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(listing.owner.to_string(), "a@lion.lmu.edu");
        assert!(listing.members.is_empty());
        assert!(listing.created_at.is_some());
    }

    #[tokio::test]
    async fn rejects_invalid_draft_before_store() {
        let db = Memory::new();
        db.set_reachable(false);
        let (svc, _bg) = Service::new(crate::spec::config(), db);

        let mut invalid = cmd(Some(verified("a@lion.lmu.edu")));
        invalid.scheduled_end = Some(DateTime::now().coerce());

        let err = svc.execute(invalid).await.unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::Validation(listing::InvalidDraft::IncompleteSchedule),
        ));
    }

    #[tokio::test]
    async fn requires_verified_author() {
        let (svc, _bg) = Service::new(crate::spec::config(), Memory::new());
        let mut unverified = verified("a@lion.lmu.edu");
        unverified.is_verified = false;

        let err = svc.execute(cmd(Some(unverified))).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotAuthenticated));

        let err = svc.execute(cmd(None)).await.unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NotAuthenticated));
    }

    #[tokio::test]
    async fn reports_unavailable_store() {
        let db = Memory::new();
        db.set_reachable(false);
        let (svc, _bg) = Service::new(crate::spec::config(), db);

        let err = svc
            .execute(cmd(Some(verified("a@lion.lmu.edu"))))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::StoreUnavailable(_)));
    }
}
