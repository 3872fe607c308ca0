//! [`Store`] backing the [`Service`].
//!
//! [`Service`]: crate::Service

use common::operations::{By, Delete, Insert, Select, Subscribe};
use derive_more::From;
use service::{
    domain::{listing, Listing},
    infra::{database, Database, Memory, Postgres},
};
use tracerr::Traced;

/// [`Database`] chosen at start-up.
#[derive(Clone, Debug, From)]
pub enum Store {
    /// [`Postgres`] store.
    Postgres(Postgres),

    /// In-[`Memory`] store, losing its state on restart.
    Memory(Memory),
}

/// Implements the provided [`Database`] operations for the [`Store`] by
/// delegating them to the chosen backend.
macro_rules! delegate {
    ($($op:ty => $ok:ty),* $(,)?) => {$(
        impl Database<$op> for Store {
            type Ok = $ok;
            type Err = Traced<database::Error>;

            async fn execute(&self, op: $op) -> Result<Self::Ok, Self::Err> {
                match self {
                    Self::Postgres(db) => db.execute(op).await,
                    Self::Memory(db) => db.execute(op).await,
                }
                .map_err(tracerr::wrap!())
            }
        }
    )*};
}

delegate! {
    Insert<listing::Draft> => listing::Id,
    Insert<listing::NewMember> => bool,
    Select<By<Vec<Listing>, ()>> => Vec<Listing>,
    Select<By<Option<Listing>, listing::Id>> => Option<Listing>,
    Delete<By<Vec<Listing>, listing::EndDateTime>> => u64,
    Subscribe<By<Vec<Listing>, ()>> => database::Snapshots,
}
