//! Task spawning abstraction for runtime independence.
//!
//! This module provides a [`TaskSpawner`] trait that lets the registry spawn
//! monitor workers without being tied to a specific runtime handle. The
//! standalone monitor binary uses its main Tokio runtime; an embedding web
//! application can hand in the handle of whichever runtime it already owns.

use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::{CoreError, CoreResult};

/// Abstraction for spawning background tasks.
///
/// Unlike fire-and-forget spawning, the returned [`JoinHandle`] lets the
/// owner wait for a worker to finish (or abort it) during teardown.
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task and returns its handle.
    fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner for the standalone binary and general use.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Like [`TokioSpawner::current`], but reports a missing runtime as an error.
    pub fn try_current() -> CoreResult<Self> {
        tokio::runtime::Handle::try_current()
            .map(Self::new)
            .map_err(|e| CoreError::Internal(format!("No Tokio runtime available: {}", e)))
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future)
    }
}
