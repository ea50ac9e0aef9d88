//! Host-requested cancellation.
//!
//! The driver never handles signals itself. A host (the CLI's SIGINT handler,
//! a test) sets a shared [`CancelToken`]; the driver polls it once per
//! half-cycle, halts, and hands the memory image to the hook's callback after
//! the model has been finalized.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::common::HarnessError;
use crate::soc::MemoryImage;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Safe to call from a signal handler.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

type OnCancel = Box<dyn FnMut(&MemoryImage) -> Result<(), HarnessError>>;

/// A token paired with the action to run once a cancelled run has halted.
pub struct CancelHook {
    token: CancelToken,
    on_cancel: OnCancel,
}

impl CancelHook {
    /// Runs `on_cancel` with the final memory image when `token` fires.
    pub fn new<F>(token: CancelToken, on_cancel: F) -> Self
    where
        F: FnMut(&MemoryImage) -> Result<(), HarnessError> + 'static,
    {
        Self {
            token,
            on_cancel: Box::new(on_cancel),
        }
    }

    /// Dumps the memory image to `path` when `token` fires.
    pub fn dump_to(token: CancelToken, path: PathBuf) -> Self {
        Self::new(token, move |image| {
            image.dump(&path)?;
            info!("Memory has been dumped into {}.", path.display());
            Ok(())
        })
    }

    /// The token this hook watches.
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn fire(&mut self, image: &MemoryImage) -> Result<(), HarnessError> {
        (self.on_cancel)(image)
    }
}

impl fmt::Debug for CancelHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHook")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
