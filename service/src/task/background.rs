//! Background environment for running [`Task`]s.

use std::{
    error::Error,
    future::{Future, IntoFuture},
};

use futures::{future::LocalBoxFuture, FutureExt as _, TryFutureExt as _};
use tokio::task;
use tracing as log;

#[cfg(doc)]
use crate::Task;

/// Boxed error of a failed [`Task`].
type TaskError = Box<dyn Error + 'static>;

/// Background environment for running [`Task`]s.
///
/// [`Task`]s are `!Send`, so they run on a [`task::LocalSet`] once this
/// [`Background`] is awaited. Awaiting resolves as soon as any [`Task`]
/// fails, or once all of them complete.
#[derive(Debug, Default)]
pub struct Background {
    /// Local set to run [`Task`]s on.
    set: task::LocalSet,

    /// Spawned [`Task`]s.
    tasks: task::JoinSet<Result<(), TaskError>>,
}

impl Background {
    /// Spawns a new [`Task`] inside the [`Background`] environment.
    pub fn spawn<F, E>(&mut self, future: F)
    where
        F: Future<Output = Result<(), E>> + 'static,
        E: Error + 'static,
    {
        _ = self.tasks.spawn_local_on(
            future.map_err(|e| TaskError::from(Box::new(e))),
            &self.set,
        );
    }
}

impl IntoFuture for Background {
    type Output = Result<(), TaskError>;
    type IntoFuture = LocalBoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        let Self { set, mut tasks } = self;
        async move {
            set.run_until(async move {
                while let Some(res) = tasks.join_next().await {
                    let res = res
                        .map_err(|e| TaskError::from(Box::new(e)))
                        .and_then(|r| r);
                    if let Err(e) = res {
                        log::error!("background `Task` failed: {e}");
                        return Err(e);
                    }
                }
                Ok(())
            })
            .await
        }
        .boxed_local()
    }
}
