//! Service contains the business logic of the application.
//!
//! List of available Cargo features:
#![doc = document_features::document_features!()]
#![deny(
    nonstandard_style,
    rust_2018_idioms,
    rustdoc::all,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![forbid(non_ascii_idents)]
#![warn(
    clippy::allow_attributes,
    clippy::allow_attributes_without_reason,
    clippy::pedantic,
    clippy::wildcard_enum_match_arm,
    deprecated_in_future,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    unused_crate_dependencies,
    unused_import_braces,
    unused_labels,
    unused_lifetimes,
    unused_qualifications,
    unused_results
)]

pub mod command;
pub mod domain;
pub mod infra;
pub mod query;
pub mod read;
pub mod subscription;
pub mod task;

use std::{error::Error, time::Duration};

use common::operations::{By, Start};
use derive_more::Debug;

#[cfg(doc)]
use infra::Database;

pub use self::{
    command::Command, query::Query, subscription::Subscription, task::Task,
};

/// [`Service`] configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// [JWT] decoding key of the identity provider.
    ///
    /// [JWT]: https://datatracker.ietf.org/doc/html/rfc7519
    #[debug(skip)]
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,

    /// E-mail domain the [`User`]s must belong to, if restricted.
    ///
    /// [`User`]: domain::User
    pub allowed_email_domain: Option<String>,

    /// Maximum time to wait for a [`Database`] response.
    pub store_timeout: Duration,

    /// [`task::ExpireListings`] configuration.
    pub expire_listings: task::expire_listings::Config,
}

/// Domain service.
#[derive(Clone, Debug)]
pub struct Service<Db> {
    /// Configuration of this [`Service`].
    config: Config,

    /// [`Database`] of this [`Service`].
    database: Db,
}

impl<Db> Service<Db> {
    /// Creates a new [`Service`] with the provided parameters.
    ///
    /// Returned [`task::Background`] must be awaited to run the [`Task`]s.
    pub fn new(config: Config, database: Db) -> (Self, task::Background)
    where
        Self: Task<
                Start<
                    By<
                        task::ExpireListings<Self>,
                        task::expire_listings::Config,
                    >,
                >,
                Ok = (),
                Err: Error,
            > + Clone
            + 'static,
    {
        let this = Service { config, database };

        let mut bg = task::Background::default();
        let svc = this.clone();
        bg.spawn(async move {
            svc.execute(Start(By::new(svc.config().expire_listings)))
                .await
        });

        (this, bg)
    }

    /// Returns [`Config`] of this [`Service`].
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns [`Database`] of this [`Service`].
    #[must_use]
    pub fn database(&self) -> &Db {
        &self.database
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use crate::Config;

    /// Secret the test tokens are signed with.
    pub(crate) const JWT_SECRET: &[u8] = b"test secret";

    pub(crate) fn config() -> Config {
        Config {
            jwt_decoding_key: jsonwebtoken::DecodingKey::from_secret(
                JWT_SECRET,
            ),
            allowed_email_domain: Some("lion.lmu.edu".into()),
            store_timeout: Duration::from_secs(10),
            expire_listings: crate::task::expire_listings::Config::default(),
        }
    }
}
