//! [`Subscription`] to the live feed of [`Listing`]s.

use std::sync::{Arc, Mutex, PoisonError};

use derive_more::Debug;
use futures::StreamExt as _;
use tokio::task::JoinHandle;
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::Listing,
    infra::database,
    query::{self, Query},
    read::listing::list::Projection,
    Service,
};

/// Callback receiving every [`Listing`]s snapshot of a [`Subscription`].
type OnUpdate = Box<dyn FnMut(Vec<Listing>) + Send>;

/// Active subscription to the live feed of [`Listing`]s.
///
/// Calls its callback with the current [`Listing`]s once started, and then
/// again with a complete fresh snapshot after every change. Once
/// [`Subscription::cancel()`]ed or dropped, the callback is never called
/// again.
///
/// If the feed fails or its store goes away, the callback is dropped, so its
/// consumer observes the end of the feed (a closed channel, for example).
#[derive(Debug)]
pub struct Subscription {
    /// Callback to pass snapshots to, taken away on cancellation.
    #[debug(skip)]
    on_update: Arc<Mutex<Option<OnUpdate>>>,

    /// Task forwarding snapshots to the callback.
    task: JoinHandle<()>,
}

impl Subscription {
    /// Starts a new [`Subscription`] to the [`Listing`]s seen through the
    /// provided [`Projection`].
    ///
    /// # Errors
    ///
    /// If the live feed cannot be established.
    pub async fn start<Db, F>(
        service: &Service<Db>,
        projection: Projection,
        on_update: F,
    ) -> Result<Self, Traced<database::Error>>
    where
        Service<Db>: Query<
            query::listings::Live,
            Ok = database::Snapshots,
            Err = Traced<database::Error>,
        >,
        F: FnMut(Vec<Listing>) + Send + 'static,
    {
        let mut snapshots = service
            .execute(query::listings::Live(projection))
            .await
            .map_err(tracerr::wrap!())?;
        log::debug!("live `Listing`s feed started");

        let on_update: OnUpdate = Box::new(on_update);
        let on_update = Arc::new(Mutex::new(Some(on_update)));
        let callback = Arc::clone(&on_update);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.next().await {
                match snapshot {
                    Ok(listings) => {
                        let mut guard = callback
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner);
                        let Some(on_update) = guard.as_mut() else {
                            break;
                        };
                        on_update(listings);
                    }
                    Err(e) => {
                        log::error!("live `Listing`s feed failed: {e}");
                        break;
                    }
                }
            }
            // Releases whatever the callback owns, so its consumer learns
            // that no snapshots follow.
            drop(
                callback
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take(),
            );
            log::debug!("live `Listing`s feed stopped");
        });

        Ok(Self { on_update, task })
    }

    /// Indicates whether this [`Subscription`] still delivers snapshots.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
            && self
                .on_update
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
    }

    /// Cancels this [`Subscription`].
    ///
    /// Waits for the callback to return if it's being called at the moment,
    /// so no callback happens once this method returns. Idempotent.
    ///
    /// Must not be called from inside the callback itself.
    pub fn cancel(&self) {
        drop(
            self.on_update
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );
        self.task.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
