//! [`Database`]-related implementations.
//!
//! [`Database`] plays the role of an external real-time document store:
//! every supported operation is a separate [`Database`] implementation, so
//! the store may be swapped without touching the rest of the [`Service`].
//!
//! [`Service`]: crate::Service

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::{future::Future, time::Duration};

use derive_more::{Display, Error as StdError, From};
use futures::stream::BoxStream;
use tracerr::Traced;

use crate::domain::Listing;

pub use self::memory::Memory;
#[cfg(feature = "postgres")]
pub use self::postgres::Postgres;

/// Database operation.
pub use common::Handler as Database;

/// Live feed of full [`Listing`] snapshots, ordered by their creation
/// [`DateTime`] descending.
///
/// The first item is the current state, every next one is emitted after a
/// change of any [`Listing`].
///
/// [`DateTime`]: common::DateTime
pub type Snapshots = BoxStream<'static, Result<Vec<Listing>, Traced<Error>>>;

/// [`Database`] error.
#[derive(Debug, Display, From, StdError)]
pub enum Error {
    /// [`Memory`] error.
    #[display("`Memory` store error: {_0}")]
    Memory(memory::Error),

    #[cfg(feature = "postgres")]
    /// [`Postgres`] error.
    #[display("`Postgres` error: {_0}")]
    Postgres(postgres::Error),

    /// [`Database`] hasn't responded in time.
    #[display("`Database` hasn't responded in time: {_0}")]
    Timeout(tokio::time::error::Elapsed),
}

/// Awaits the provided [`Database`] `operation` for no longer than the given
/// `timeout`, treating non-response as an [`Error::Timeout`].
///
/// # Errors
///
/// If the `operation` fails or doesn't complete in time.
pub async fn timeout<T>(
    timeout: Duration,
    operation: impl Future<Output = Result<T, Traced<Error>>>,
) -> Result<T, Traced<Error>> {
    tokio::time::timeout(timeout, operation)
        .await
        .map_err(tracerr::from_and_wrap!(=> Error))?
}
