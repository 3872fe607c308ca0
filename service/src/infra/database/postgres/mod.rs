//! Postgres [`Database`] implementation.

pub mod client;
pub mod connection;
mod impls;

use deadpool_postgres::Runtime;
use derive_more::{Deref, Display, Error as StdError, From};
use tokio_postgres::NoTls;
use tracerr::Traced;

use crate::infra::database;
#[cfg(doc)]
use crate::infra::Database;

pub use refinery::embed_migrations;

pub use self::{client::NonTx, connection::Connection};

pub use deadpool_postgres::Config;

/// Name of the channel notified on every change of the `listings` table.
pub const LISTINGS_CHANNEL: &str = "listings_changed";

/// Postgres [`Database`] client.
#[derive(Clone, Debug, Deref)]
pub struct Postgres {
    /// [`NonTx`] client performing the queries.
    #[deref]
    client: NonTx,

    /// Configuration of dedicated connections listening for notifications.
    listener: tokio_postgres::Config,
}

impl Postgres {
    /// Creates a new [`Postgres`] client with the provided [`Config`].
    ///
    /// # Errors
    ///
    /// If failed to create a new [`Postgres`] client.
    pub fn new(conf: &Config) -> Result<Self, Traced<database::Error>> {
        let pool = conf
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        let listener = conf
            .get_pg_config()
            .map_err(tracerr::from_and_wrap!(=> Error))
            .map_err(tracerr::map_from)?;
        Ok(Self {
            client: NonTx::from_pool(pool),
            listener,
        })
    }
}

/// Postgres database [`Error`].
#[derive(Debug, Display, StdError, From)]
pub enum Error {
    /// [`Connection`] error.
    #[display("`Connection` error: {_0}")]
    Connection(connection::Error),

    /// Invalid [`Config`].
    #[display("Invalid `Config`: {_0}")]
    Config(deadpool_postgres::ConfigError),

    /// Error of creating a new [`connection::Pool`] client.
    #[display("Failed to create a new `connection::Pool`: {_0}")]
    PoolCreationError(connection::PoolCreationError),

    /// [`connection::Pool`] error.
    #[display("`connection::Pool` error: {_0}")]
    PoolError(connection::PoolError),
}
