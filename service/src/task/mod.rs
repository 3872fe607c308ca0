//! Background [`Task`]s definitions.

mod background;
pub mod expire_listings;

pub use common::Handler as Task;

pub use self::{background::Background, expire_listings::ExpireListings};
