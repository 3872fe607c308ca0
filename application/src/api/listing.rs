//! [`Listing`]-related definitions.

use common::DateTime;
use derive_more::{Display, From, Into};
use juniper::{graphql_object, GraphQLEnum, GraphQLScalar};
use service::{
    command::{create_listing, join_listing},
    domain, read,
};
use uuid::Uuid;

use crate::{api, define_error, AsError, Context, Error};

/// A gig posted on the board.
#[derive(Clone, Debug, From)]
pub struct Listing(domain::Listing);

/// A gig posted on the board.
#[graphql_object(context = Context)]
impl Listing {
    /// Unique identifier of this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.id",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn id(&self) -> Id {
        self.0.id.into()
    }

    /// Title of this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.header",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn header(&self) -> &str {
        self.0.header.as_ref()
    }

    /// Description of this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.body",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn body(&self) -> &str {
        self.0.body.as_ref()
    }

    /// Kind of this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.kind",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn kind(&self) -> Kind {
        self.0.kind.into()
    }

    /// E-mail of the user who created this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.owner",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn owner(&self) -> api::viewer::Email {
        self.0.owner.clone().into()
    }

    /// Maximum number of members of this `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.memberLimit",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn member_limit(&self) -> i32 {
        i32::from(self.0.member_limit.get())
    }

    /// E-mails of the users who joined this `Listing`, in joining order.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.members",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn members(&self) -> Vec<api::viewer::Email> {
        self.0.members.iter().cloned().map(Into::into).collect()
    }

    /// Number of free slots left in this `Listing`.
    ///
    /// Zero for an overfilled `Listing`.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.freeSlots",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn free_slots(&self) -> i32 {
        i32::try_from(self.0.free_slots()).unwrap_or(i32::MAX)
    }

    /// Indicator whether this `Listing` has no free slots left.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.isFull",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn is_full(&self) -> bool {
        self.0.is_full()
    }

    /// `DateTime` when this `Listing` starts, if scheduled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.scheduledStart",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn scheduled_start(&self) -> Option<DateTime> {
        self.0.schedule.map(|s| s.start().coerce())
    }

    /// `DateTime` when this `Listing` ends, if scheduled.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.scheduledEnd",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn scheduled_end(&self) -> Option<DateTime> {
        self.0.schedule.map(|s| s.end().coerce())
    }

    /// `DateTime` when this `Listing` was created.
    ///
    /// Absent until the store assigns it.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.createdAt",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub fn created_at(&self) -> Option<DateTime> {
        self.0.created_at.map(|at| at.coerce())
    }

    /// Relation of the current user to this `Listing`.
    ///
    /// # Errors
    ///
    /// Possible error codes:
    /// - `AUTHORIZATION_REQUIRED` - the current request is not authorized.
    #[tracing::instrument(
        skip_all,
        fields(
            gql.name = "Listing.membership",
            otel.name = api::Query::SPAN_NAME,
        ),
    )]
    pub async fn membership(&self, ctx: &Context) -> Result<Membership, Error> {
        let session = ctx.current_session().await?;
        Ok(self.0.membership_of(&session.user.id).into())
    }
}

/// Unique identifier of a `Listing`.
#[derive(Clone, Copy, Debug, Display, Into, From, GraphQLScalar)]
#[from(domain::listing::Id)]
#[into(domain::listing::Id)]
#[graphql(name = "ListingId", transparent)]
pub struct Id(Uuid);

/// Kind of a `Listing`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ListingKind")]
pub enum Kind {
    /// Event to attend.
    Event,

    /// Task to help with.
    Task,

    /// Academic activity, like a study group or tutoring.
    Academic,

    /// Social gathering.
    Social,

    /// Job opportunity.
    Jobs,

    /// Sports activity.
    Sports,
}

impl From<domain::listing::Kind> for Kind {
    fn from(kind: domain::listing::Kind) -> Self {
        use domain::listing::Kind as K;

        match kind {
            K::Event => Self::Event,
            K::Task => Self::Task,
            K::Academic => Self::Academic,
            K::Social => Self::Social,
            K::Jobs => Self::Jobs,
            K::Sports => Self::Sports,
        }
    }
}

impl From<Kind> for domain::listing::Kind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Event => Self::Event,
            Kind::Task => Self::Task,
            Kind::Academic => Self::Academic,
            Kind::Social => Self::Social,
            Kind::Jobs => Self::Jobs,
            Kind::Sports => Self::Sports,
        }
    }
}

/// Order of `Listing`s.
#[derive(Clone, Copy, Debug, Default, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ListingSort")]
pub enum Sort {
    /// Most recently created first.
    #[default]
    Newest,

    /// Least recently created first.
    Oldest,

    /// Earliest scheduled start first, unscheduled last.
    Soonest,

    /// Latest scheduled start first, unscheduled last.
    Latest,
}

impl From<Sort> for read::listing::list::SortOption {
    fn from(sort: Sort) -> Self {
        match sort {
            Sort::Newest => Self::Newest,
            Sort::Oldest => Self::Oldest,
            Sort::Soonest => Self::Soonest,
            Sort::Latest => Self::Latest,
        }
    }
}

/// Builds a [`read::listing::list::Projection`] out of GraphQL arguments.
pub(crate) fn projection(
    search: Option<String>,
    sort: Sort,
) -> read::listing::list::Projection {
    read::listing::list::Projection {
        search: search.unwrap_or_default().into(),
        sort: sort.into(),
    }
}

/// Relation of a user to a `Listing`.
#[derive(Clone, Copy, Debug, Eq, GraphQLEnum, PartialEq)]
#[graphql(name = "ListingMembership")]
pub enum Membership {
    /// User created the `Listing`.
    Owner,

    /// User joined the `Listing`.
    Member,

    /// User has no relation to the `Listing`.
    NotMember,
}

impl From<domain::listing::Membership> for Membership {
    fn from(membership: domain::listing::Membership) -> Self {
        use domain::listing::Membership as M;

        match membership {
            M::Owner => Self::Owner,
            M::Member => Self::Member,
            M::NotMember => Self::NotMember,
        }
    }
}

impl AsError for create_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        match self {
            Self::StoreUnavailable(e) => e.try_as_error(),
            Self::Validation(reason) => Some(Error {
                code: "INVALID_LISTING",
                status_code: http::StatusCode::BAD_REQUEST,
                message: reason.to_string(),
                backtrace: None,
            }),
            Self::NotAuthenticated => {
                Some(crate::context::AuthError::AuthorizationRequired.into())
            }
        }
    }
}

impl AsError for join_listing::ExecutionError {
    fn try_as_error(&self) -> Option<Error> {
        use domain::listing::Refusal as R;

        match self {
            Self::StoreUnavailable(e) => e.try_as_error(),
            Self::Refused(R::AlreadyOwner) => {
                Some(ListingError::AlreadyOwner.into())
            }
            Self::Refused(R::AlreadyMember) => {
                Some(ListingError::AlreadyMember.into())
            }
            Self::Refused(R::Full) => Some(ListingError::Full.into()),
            Self::Refused(R::NotAuthenticated) => {
                Some(crate::context::AuthError::AuthorizationRequired.into())
            }
            Self::ListingNotExists(_) => Some(ListingError::NotExists.into()),
        }
    }
}

define_error! {
    enum ListingError {
        #[code = "LISTING_NOT_EXISTS"]
        #[status = NOT_FOUND]
        #[message = "`Listing` with the provided ID does not exist"]
        NotExists,

        #[code = "ALREADY_OWNER"]
        #[status = CONFLICT]
        #[message = "`Listing` owner cannot join it"]
        AlreadyOwner,

        #[code = "ALREADY_MEMBER"]
        #[status = CONFLICT]
        #[message = "`Listing` is joined already"]
        AlreadyMember,

        #[code = "LISTING_FULL"]
        #[status = CONFLICT]
        #[message = "`Listing` has no free slots left"]
        Full,
    }
}
