//! [`Listing`]-related read definitions.

#[cfg(doc)]
use crate::domain::Listing;

pub mod list {
    //! [`Listing`] list definitions.

    use std::cmp::Ordering;

    use derive_more::{Display, From};
    use strum::EnumString;

    use crate::domain::{listing, Listing};

    /// Free-text query to filter [`Listing`]s with.
    ///
    /// Matches a [`Listing`] if the trimmed query is empty, or is a
    /// case-insensitive substring of the [`Listing`]'s header, body or
    /// [`listing::Kind`] name.
    #[derive(Clone, Debug, Default, Display, Eq, From, PartialEq)]
    pub struct SearchQuery(String);

    impl SearchQuery {
        /// Creates a new [`SearchQuery`] out of the provided raw `query`.
        #[must_use]
        pub fn new(query: impl Into<String>) -> Self {
            Self(query.into())
        }

        /// Indicates whether the provided [`Listing`] matches this
        /// [`SearchQuery`].
        #[must_use]
        pub fn matches(&self, listing: &Listing) -> bool {
            let needle = self.0.trim().to_lowercase();
            if needle.is_empty() {
                return true;
            }

            let fields: [&str; 3] = [
                listing.header.as_ref(),
                listing.body.as_ref(),
                listing.kind.as_ref(),
            ];
            fields
                .into_iter()
                .any(|field| field.to_lowercase().contains(&needle))
        }
    }

    impl From<&str> for SearchQuery {
        fn from(query: &str) -> Self {
            Self::new(query)
        }
    }

    /// Order of [`Listing`]s in a list.
    #[derive(
        Clone,
        Copy,
        Debug,
        Default,
        strum::Display,
        EnumString,
        Eq,
        Hash,
        PartialEq,
    )]
    #[strum(serialize_all = "lowercase")]
    pub enum SortOption {
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

    impl SortOption {
        /// Compares the provided [`Listing`]s according to this
        /// [`SortOption`].
        #[must_use]
        pub fn compare(self, a: &Listing, b: &Listing) -> Ordering {
            let created_at = |l: &Listing| {
                l.created_at.unwrap_or(listing::CreationDateTime::UNIX_EPOCH)
            };
            let start = |l: &Listing| l.schedule.map(|s| s.start());

            match self {
                Self::Newest => created_at(b).cmp(&created_at(a)),
                Self::Oldest => created_at(a).cmp(&created_at(b)),
                Self::Soonest | Self::Latest => match (start(a), start(b)) {
                    (Some(a), Some(b)) if self == Self::Soonest => a.cmp(&b),
                    (Some(a), Some(b)) => b.cmp(&a),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                },
            }
        }
    }

    /// View of a [`Listing`]s list, filtered by a [`SearchQuery`] and ordered
    /// by a [`SortOption`].
    #[derive(Clone, Debug, Default, Eq, PartialEq)]
    pub struct Projection {
        /// [`SearchQuery`] to filter [`Listing`]s with.
        pub search: SearchQuery,

        /// [`SortOption`] to order [`Listing`]s by.
        pub sort: SortOption,
    }

    impl Projection {
        /// Projects the provided [`Listing`]s into a new list.
        ///
        /// Equal [`Listing`]s keep their relative input order.
        #[must_use]
        pub fn apply(&self, listings: &[Listing]) -> Vec<Listing> {
            let mut view = listings
                .iter()
                .filter(|l| self.search.matches(l))
                .cloned()
                .collect::<Vec<_>>();
            view.sort_by(|a, b| self.sort.compare(a, b));
            view
        }
    }

    #[cfg(test)]
    mod spec {
        use std::str::FromStr as _;

        use common::DateTime;

        use crate::domain::{
            listing::{self, spec::gig},
            Listing,
        };

        use super::{Projection, SearchQuery, SortOption};

        fn at(rfc3339: &str) -> DateTime {
            DateTime::from_rfc3339(rfc3339).unwrap()
        }

        fn scheduled(start: Option<&str>) -> Listing {
            let mut l = gig("owner@lion.lmu.edu", 5, &[]);
            l.schedule = start.map(|s| {
                let start = at(s);
                listing::Schedule::new(
                    start.coerce(),
                    (start + std::time::Duration::from_secs(3600)).coerce(),
                )
                .unwrap()
            });
            l
        }

        fn created(created_at: Option<&str>) -> Listing {
            let mut l = gig("owner@lion.lmu.edu", 5, &[]);
            l.created_at = created_at.map(|c| at(c).coerce());
            l
        }

        fn ids(listings: &[Listing]) -> Vec<listing::Id> {
            listings.iter().map(|l| l.id).collect()
        }

        fn project(sort: SortOption, listings: &[Listing]) -> Vec<Listing> {
            Projection {
                search: SearchQuery::default(),
                sort,
            }
            .apply(listings)
        }

        #[test]
        fn filters_case_insensitively() {
            let mut soccer = gig("owner@lion.lmu.edu", 5, &[]);
            soccer.header = listing::Header::new("Pickup Soccer").unwrap();
            soccer.kind = listing::Kind::Sports;
            let mut tutoring = gig("owner@lion.lmu.edu", 5, &[]);
            tutoring.body = listing::Body::new("Calculus help").unwrap();
            let listings = [soccer.clone(), tutoring.clone()];

            let search = |q: &str| {
                Projection {
                    search: q.into(),
                    sort: SortOption::Newest,
                }
                .apply(&listings)
            };

            assert_eq!(ids(&search("  SOCCER ")), [soccer.id]);
            assert_eq!(ids(&search("calculus")), [tutoring.id]);
            assert_eq!(ids(&search("sports")), [soccer.id]);
            assert_eq!(search("   ").len(), 2);
            assert!(search("chess").is_empty());
        }

        #[test]
        fn newest_is_reverse_of_oldest() {
            let listings = [
                created(Some("2025-01-02T00:00:00Z")),
                created(Some("2025-01-03T00:00:00Z")),
                created(Some("2025-01-01T00:00:00Z")),
            ];

            let newest = ids(&project(SortOption::Newest, &listings));
            let mut oldest = ids(&project(SortOption::Oldest, &listings));
            oldest.reverse();

            assert_eq!(newest, [listings[1].id, listings[0].id, listings[2].id]);
            assert_eq!(newest, oldest);
        }

        #[test]
        fn missing_creation_sorts_as_epoch() {
            let listings = [
                created(None),
                created(Some("2025-01-01T00:00:00Z")),
            ];

            assert_eq!(
                ids(&project(SortOption::Newest, &listings)),
                [listings[1].id, listings[0].id],
            );
            assert_eq!(
                ids(&project(SortOption::Oldest, &listings)),
                [listings[0].id, listings[1].id],
            );
        }

        #[test]
        fn unscheduled_sort_last() {
            let listings = [
                scheduled(None),
                scheduled(Some("2025-01-01T00:00:00Z")),
                scheduled(Some("2024-06-01T00:00:00Z")),
            ];

            assert_eq!(
                ids(&project(SortOption::Soonest, &listings)),
                [listings[2].id, listings[1].id, listings[0].id],
            );
            assert_eq!(
                ids(&project(SortOption::Latest, &listings)),
                [listings[1].id, listings[2].id, listings[0].id],
            );
        }

        #[test]
        fn keeps_input_order_of_equal_listings() {
            let listings = [
                scheduled(None),
                scheduled(Some("2025-01-01T00:00:00Z")),
                scheduled(None),
                scheduled(None),
            ];

            assert_eq!(
                ids(&project(SortOption::Soonest, &listings)),
                [listings[1].id, listings[0].id, listings[2].id, listings[3].id],
            );
        }

        #[test]
        fn leaves_input_untouched() {
            let listings = vec![
                created(Some("2025-01-01T00:00:00Z")),
                created(Some("2025-01-02T00:00:00Z")),
            ];
            let before = listings.clone();

            drop(project(SortOption::Newest, &listings));

            assert_eq!(listings, before);
        }

        #[test]
        fn parses_sort_option() {
            assert_eq!(SortOption::from_str("soonest"), Ok(SortOption::Soonest));
            assert_eq!(SortOption::default(), SortOption::Newest);
            assert_eq!(SortOption::Latest.to_string(), "latest");
        }
    }
}
