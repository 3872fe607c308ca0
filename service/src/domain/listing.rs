//! [`Listing`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use uuid::Uuid;

use crate::domain::{user, User};

/// Opportunity ("gig") posted on the board, which campus users may join.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Listing {
    /// ID of this [`Listing`].
    pub id: Id,

    /// [`Header`] of this [`Listing`].
    pub header: Header,

    /// [`Body`] of this [`Listing`].
    pub body: Body,

    /// [`Kind`] of this [`Listing`].
    pub kind: Kind,

    /// ID of the [`User`] who created this [`Listing`].
    pub owner: user::Id,

    /// Maximum number of [`Members`] of this [`Listing`].
    pub member_limit: MemberLimit,

    /// [`Members`] who joined this [`Listing`].
    pub members: Members,

    /// [`Schedule`] of this [`Listing`], if any.
    pub schedule: Option<Schedule>,

    /// [`DateTime`] when this [`Listing`] was created.
    ///
    /// [`None`] while the store hasn't assigned it yet.
    pub created_at: Option<CreationDateTime>,
}

impl Listing {
    /// Returns the [`Membership`] of the [`User`] with the provided ID in this
    /// [`Listing`].
    #[must_use]
    pub fn membership_of(&self, user_id: &user::Id) -> Membership {
        if *user_id == self.owner {
            Membership::Owner
        } else if self.members.contains(user_id) {
            Membership::Member
        } else {
            Membership::NotMember
        }
    }

    /// Indicates whether this [`Listing`] has no free slots left.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.member_limit.into_usize()
    }

    /// Returns the number of free slots left in this [`Listing`].
    #[must_use]
    pub fn free_slots(&self) -> usize {
        self.member_limit
            .into_usize()
            .saturating_sub(self.members.len())
    }

    /// Checks whether the provided [`User`] may join this [`Listing`].
    ///
    /// The checks are performed in the following order, so the first failed
    /// one determines the [`Refusal`]:
    /// 1. [`User`] is signed in and verified its e-mail;
    /// 2. [`User`] is not the owner;
    /// 3. [`User`] is not a member already;
    /// 4. [`Listing`] is not full.
    ///
    /// # Errors
    ///
    /// With the [`Refusal`] reason if the [`User`] cannot join.
    pub fn check_join(&self, user: Option<&User>) -> Result<(), Refusal> {
        let user = user
            .filter(|u| u.is_verified)
            .ok_or(Refusal::NotAuthenticated)?;

        match self.membership_of(&user.id) {
            Membership::Owner => Err(Refusal::AlreadyOwner),
            Membership::Member => Err(Refusal::AlreadyMember),
            Membership::NotMember if self.is_full() => Err(Refusal::Full),
            Membership::NotMember => Ok(()),
        }
    }
}

/// ID of a [`Listing`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    PartialEq,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Header (title) of a [`Listing`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Header(String);

impl Header {
    /// Maximum length of a [`Header`] in characters.
    pub const MAX_LEN: usize = 512;

    /// Creates a new [`Header`] if the given `header` is valid.
    #[must_use]
    pub fn new(header: impl Into<String>) -> Option<Self> {
        let header = header.into();
        Self::check(&header).then_some(Self(header))
    }

    /// Checks whether the given `header` is a valid [`Header`].
    fn check(header: impl AsRef<str>) -> bool {
        let header = header.as_ref();
        header.trim() == header
            && !header.is_empty()
            && !header.contains('\n')
            && header.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Header {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Header`")
    }
}

/// Body (free-text description) of a [`Listing`].
#[derive(AsRef, Clone, Debug, Display, Eq, Hash, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Body(String);

impl Body {
    /// Maximum length of a [`Body`] in characters.
    pub const MAX_LEN: usize = 8192;

    /// Creates a new [`Body`] if the given `body` is valid.
    #[must_use]
    pub fn new(body: impl Into<String>) -> Option<Self> {
        let body = body.into();
        Self::check(&body).then_some(Self(body))
    }

    /// Checks whether the given `body` is a valid [`Body`].
    fn check(body: impl AsRef<str>) -> bool {
        let body = body.as_ref();
        body.trim() == body
            && !body.is_empty()
            && body.chars().count() <= Self::MAX_LEN
    }
}

impl FromStr for Body {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Body`")
    }
}

define_kind! {
    #[doc = "Kind of a `Listing`."]
    enum Kind {
        #[doc = "Event to attend."]
        Event = 1,

        #[doc = "Task to help with."]
        Task = 2,

        #[doc = "Academic activity (study group, tutoring, etc)."]
        Academic = 3,

        #[doc = "Social gathering."]
        Social = 4,

        #[doc = "Job opportunity."]
        Jobs = 5,

        #[doc = "Sports activity."]
        Sports = 6,
    }
}

/// Maximum number of [`Members`] of a [`Listing`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MemberLimit(u8);

impl MemberLimit {
    /// Minimum allowed [`MemberLimit`].
    pub const MIN: u8 = 1;

    /// Maximum allowed [`MemberLimit`].
    pub const MAX: u8 = 100;

    /// Creates a new [`MemberLimit`] if the given `limit` is in the
    /// [`MemberLimit::MIN`]..=[`MemberLimit::MAX`] range.
    #[must_use]
    pub fn new(limit: i64) -> Option<Self> {
        u8::try_from(limit)
            .ok()
            .filter(|l| (Self::MIN..=Self::MAX).contains(l))
            .map(Self)
    }

    /// Returns the numeric value of this [`MemberLimit`].
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Returns the numeric value of this [`MemberLimit`] as [`usize`].
    #[must_use]
    pub fn into_usize(self) -> usize {
        usize::from(self.0)
    }
}

/// Ordered set of [`User`]s who joined a [`Listing`].
///
/// Iteration order is the join order. No [`user::Id`] appears twice.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Members(Vec<user::Id>);

impl Members {
    /// Creates a new empty [`Members`] set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of [`Members`].
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Indicates whether there are no [`Members`] at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Indicates whether the [`User`] with the provided ID is a member.
    #[must_use]
    pub fn contains(&self, user_id: &user::Id) -> bool {
        self.0.contains(user_id)
    }

    /// Iterates over the [`Members`] in their join order.
    pub fn iter(&self) -> impl Iterator<Item = &user::Id> {
        self.0.iter()
    }

    /// Adds the provided [`user::Id`] to the end of this set, unless it's
    /// already present.
    ///
    /// Returns `true` if the set has changed.
    pub fn unite(&mut self, user_id: user::Id) -> bool {
        if self.contains(&user_id) {
            return false;
        }
        self.0.push(user_id);
        true
    }
}

impl FromIterator<user::Id> for Members {
    fn from_iter<T: IntoIterator<Item = user::Id>>(iter: T) -> Self {
        let mut members = Self::new();
        for id in iter {
            _ = members.unite(id);
        }
        members
    }
}

impl AsRef<[user::Id]> for Members {
    fn as_ref(&self) -> &[user::Id] {
        &self.0
    }
}

impl From<Members> for Vec<user::Id> {
    fn from(members: Members) -> Self {
        members.0
    }
}

/// Scheduled period of a [`Listing`].
///
/// Its end is always strictly after its start.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Schedule {
    /// [`DateTime`] when the scheduled period starts.
    start: StartDateTime,

    /// [`DateTime`] when the scheduled period ends.
    end: EndDateTime,
}

impl Schedule {
    /// Creates a new [`Schedule`] if the given `end` is after the `start`.
    #[must_use]
    pub fn new(start: StartDateTime, end: EndDateTime) -> Option<Self> {
        (end.coerce::<()>() > start.coerce::<()>())
            .then_some(Self { start, end })
    }

    /// Returns the [`DateTime`] when this [`Schedule`] starts.
    #[must_use]
    pub fn start(&self) -> StartDateTime {
        self.start
    }

    /// Returns the [`DateTime`] when this [`Schedule`] ends.
    #[must_use]
    pub fn end(&self) -> EndDateTime {
        self.end
    }
}

/// Validated data of a new [`Listing`], not yet accepted by the store.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Draft {
    /// [`Header`] of the new [`Listing`].
    pub header: Header,

    /// [`Body`] of the new [`Listing`].
    pub body: Body,

    /// [`Kind`] of the new [`Listing`].
    pub kind: Kind,

    /// ID of the [`User`] creating the new [`Listing`].
    pub owner: user::Id,

    /// [`MemberLimit`] of the new [`Listing`].
    pub member_limit: MemberLimit,

    /// [`Schedule`] of the new [`Listing`], if any.
    pub schedule: Option<Schedule>,
}

impl Draft {
    /// Validates the provided raw fields into a new [`Draft`].
    ///
    /// Text fields are trimmed before validation.
    ///
    /// # Errors
    ///
    /// With the first [`InvalidDraft`] reason found.
    pub fn new(
        owner: user::Id,
        header: &str,
        body: &str,
        kind: Kind,
        member_limit: i64,
        scheduled_start: Option<StartDateTime>,
        scheduled_end: Option<EndDateTime>,
    ) -> Result<Self, InvalidDraft> {
        use InvalidDraft as E;

        let header = Header::new(header.trim()).ok_or(E::Header)?;
        let body = Body::new(body.trim()).ok_or(E::Body)?;
        let member_limit = MemberLimit::new(member_limit)
            .ok_or(E::MemberLimit(member_limit))?;
        let schedule = match (scheduled_start, scheduled_end) {
            (None, None) => None,
            (Some(start), Some(end)) => {
                Some(Schedule::new(start, end).ok_or(E::InvertedSchedule)?)
            }
            (Some(_), None) | (None, Some(_)) => {
                return Err(E::IncompleteSchedule)
            }
        };

        Ok(Self {
            header,
            body,
            kind,
            owner,
            member_limit,
            schedule,
        })
    }
}

/// Reason of a [`Draft`] being invalid.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum InvalidDraft {
    /// [`Header`] is empty or too long.
    #[display("title is required and must not exceed {} characters", Header::MAX_LEN)]
    Header,

    /// [`Body`] is empty or too long.
    #[display("description is required and must not exceed {} characters", Body::MAX_LEN)]
    Body,

    /// [`MemberLimit`] is out of range.
    #[display(
        "member limit must be between {} and {}, got {_0}",
        MemberLimit::MIN,
        MemberLimit::MAX,
    )]
    MemberLimit(#[error(not(source))] i64),

    /// Only one of [`Schedule`] bounds is provided.
    #[display("both start and end times must be provided")]
    IncompleteSchedule,

    /// [`Schedule`] ends before it starts.
    #[display("end time must be after start time")]
    InvertedSchedule,
}

/// Request to add a [`User`] to the [`Members`] of a [`Listing`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewMember {
    /// ID of the [`Listing`] to join.
    pub listing_id: Id,

    /// ID of the joining [`User`].
    pub user_id: user::Id,
}

/// Relation of a [`User`] to a [`Listing`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Membership {
    /// [`User`] created the [`Listing`].
    Owner,

    /// [`User`] joined the [`Listing`].
    Member,

    /// [`User`] has no relation to the [`Listing`].
    NotMember,
}

/// Reason of a [`User`] being refused to join a [`Listing`].
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum Refusal {
    /// [`User`] is the owner of the [`Listing`].
    #[display("`User` owns the `Listing`")]
    AlreadyOwner,

    /// [`User`] is a member of the [`Listing`] already.
    #[display("`User` is a member of the `Listing` already")]
    AlreadyMember,

    /// [`Listing`] has no free slots left.
    #[display("`Listing` is full")]
    Full,

    /// [`User`] is not signed in or hasn't verified its e-mail.
    #[display("`User` is not authenticated")]
    NotAuthenticated,
}

/// [`DateTime`] when a [`Listing`] was created.
pub type CreationDateTime = DateTimeOf<(Listing, unit::Creation)>;

/// [`DateTime`] when a [`Schedule`] starts.
pub type StartDateTime = DateTimeOf<(Listing, unit::Begin)>;

/// [`DateTime`] when a [`Schedule`] ends.
pub type EndDateTime = DateTimeOf<(Listing, unit::End)>;

#[cfg(test)]
pub(crate) mod spec {
    use common::DateTime;

    use crate::domain::{user, User};

    use super::{
        Draft, InvalidDraft, Kind, Listing, MemberLimit, Members, Membership,
        Refusal,
    };

    pub(crate) fn verified(email: &str) -> User {
        User {
            id: user::Id::new(email).unwrap(),
            is_verified: true,
        }
    }

    pub(crate) fn gig(owner: &str, limit: i64, members: &[&str]) -> Listing {
        let draft = Draft::new(
            user::Id::new(owner).unwrap(),
            "Study group",
            "CS 2021 midterm prep",
            Kind::Academic,
            limit,
            None,
            None,
        )
        .unwrap();
        Listing {
            id: super::Id::new(),
            header: draft.header,
            body: draft.body,
            kind: draft.kind,
            owner: draft.owner,
            member_limit: draft.member_limit,
            members: members
                .iter()
                .map(|m| user::Id::new(*m).unwrap())
                .collect(),
            schedule: draft.schedule,
            created_at: Some(DateTime::now().coerce()),
        }
    }

    #[test]
    fn refuses_full_listing() {
        let listing = gig("owner@lmu.edu", 2, &["a@lmu.edu", "b@lmu.edu"]);

        assert!(listing.is_full());
        assert_eq!(listing.free_slots(), 0);
        assert_eq!(
            listing.check_join(Some(&verified("c@lmu.edu"))),
            Err(Refusal::Full),
        );
    }

    #[test]
    fn already_member_precedes_full() {
        let listing = gig("owner@lmu.edu", 1, &["a@lmu.edu"]);

        assert_eq!(
            listing.check_join(Some(&verified("a@lmu.edu"))),
            Err(Refusal::AlreadyMember),
        );
    }

    #[test]
    fn owner_cannot_join() {
        let full = gig("owner@lmu.edu", 1, &["a@lmu.edu"]);
        let open = gig("owner@lmu.edu", 5, &[]);

        assert_eq!(
            full.check_join(Some(&verified("owner@lmu.edu"))),
            Err(Refusal::AlreadyOwner),
        );
        assert_eq!(
            open.check_join(Some(&verified("owner@lmu.edu"))),
            Err(Refusal::AlreadyOwner),
        );
        assert_eq!(
            open.membership_of(&verified("owner@lmu.edu").id),
            Membership::Owner,
        );
    }

    #[test]
    fn requires_verified_user() {
        let listing = gig("owner@lmu.edu", 5, &[]);
        let mut unverified = verified("a@lmu.edu");
        unverified.is_verified = false;

        assert_eq!(listing.check_join(None), Err(Refusal::NotAuthenticated));
        assert_eq!(
            listing.check_join(Some(&unverified)),
            Err(Refusal::NotAuthenticated),
        );
        assert_eq!(listing.check_join(Some(&verified("a@lmu.edu"))), Ok(()));
    }

    #[test]
    fn members_are_deduplicated_in_join_order() {
        let mut members = ["b@lmu.edu", "a@lmu.edu", "b@lmu.edu"]
            .into_iter()
            .map(|m| user::Id::new(m).unwrap())
            .collect::<Members>();

        assert_eq!(members.len(), 2);
        assert!(!members.unite(user::Id::new("a@lmu.edu").unwrap()));
        assert!(members.unite(user::Id::new("c@lmu.edu").unwrap()));
        assert_eq!(
            members.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["b@lmu.edu", "a@lmu.edu", "c@lmu.edu"],
        );
    }

    #[test]
    fn validates_member_limit() {
        assert!(MemberLimit::new(0).is_none());
        assert!(MemberLimit::new(101).is_none());
        assert!(MemberLimit::new(-1).is_none());
        assert_eq!(MemberLimit::new(1).map(MemberLimit::get), Some(1));
        assert_eq!(MemberLimit::new(100).map(MemberLimit::get), Some(100));
    }

    #[test]
    fn validates_draft() {
        let owner = user::Id::new("owner@lmu.edu").unwrap();
        let start = DateTime::from_rfc3339("2025-03-01T10:00:00Z").unwrap();
        let end = DateTime::from_rfc3339("2025-03-01T12:00:00Z").unwrap();
        let draft = |header: &str, body: &str, limit, start, end| {
            Draft::new(
                owner.clone(),
                header,
                body,
                Kind::Event,
                limit,
                start,
                end,
            )
        };

        let ok = draft(
            "  Pickup soccer ",
            "Bring cleats",
            10,
            Some(start.coerce()),
            Some(end.coerce()),
        )
        .unwrap();
        assert_eq!(ok.header.to_string(), "Pickup soccer");
        assert_eq!(ok.schedule.map(|s| s.start().coerce()), Some(start));

        assert_eq!(
            draft("   ", "Bring cleats", 10, None, None),
            Err(InvalidDraft::Header),
        );
        assert_eq!(
            draft("Soccer", "", 10, None, None),
            Err(InvalidDraft::Body),
        );
        assert_eq!(
            draft("Soccer", "Bring cleats", 0, None, None),
            Err(InvalidDraft::MemberLimit(0)),
        );
        assert_eq!(
            draft("Soccer", "Bring cleats", 10, Some(start.coerce()), None),
            Err(InvalidDraft::IncompleteSchedule),
        );
        assert_eq!(
            draft("Soccer", "Bring cleats", 10, None, Some(end.coerce())),
            Err(InvalidDraft::IncompleteSchedule),
        );
        assert_eq!(
            draft(
                "Soccer",
                "Bring cleats",
                10,
                Some(end.coerce()),
                Some(start.coerce()),
            ),
            Err(InvalidDraft::InvertedSchedule),
        );
        assert_eq!(
            draft(
                "Soccer",
                "Bring cleats",
                10,
                Some(start.coerce()),
                Some(start.coerce()),
            ),
            Err(InvalidDraft::InvertedSchedule),
        );
    }
}
