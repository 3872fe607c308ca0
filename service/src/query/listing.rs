//! [`Query`] related to a single [`Listing`].

use common::operations::By;

use crate::domain::{listing, Listing};
#[cfg(doc)]
use crate::Query;

use super::DatabaseQuery;

/// Queries a [`Listing`] by its ID.
pub type ById = DatabaseQuery<By<Option<Listing>, listing::Id>>;
