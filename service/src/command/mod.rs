//! [`Command`] definition.

pub mod authorize_user;
pub mod create_listing;
pub mod join_listing;

/// [`Command`] of the [`Service`].
///
/// [`Service`]: crate::Service
pub use common::Handler as Command;

pub use self::{
    authorize_user::AuthorizeUser, create_listing::CreateListing,
    join_listing::JoinListing,
};
