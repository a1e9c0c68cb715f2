//! Run-once disposal.
//!
//! Both the socket transport and the command engine must tolerate being
//! disposed more than once: explicitly, from `Drop`, and from an error path
//! running on the receive task. [`DisposeGuard`] centralizes the
//! "disposed" flag and the lock that protects it.

use parking_lot::Mutex;

/// Lock-protected "disposed" flag with run-once teardown.
///
/// # Examples
///
/// ```rust
/// use robodriver_core::DisposeGuard;
///
/// let guard = DisposeGuard::new();
/// let mut runs = 0;
///
/// assert!(guard.dispose_with(|| runs += 1));
/// assert!(!guard.dispose_with(|| runs += 1));
/// assert_eq!(runs, 1);
/// assert!(guard.is_disposed());
/// ```
#[derive(Debug, Default)]
pub struct DisposeGuard {
    disposed: Mutex<bool>,
}

impl DisposeGuard {
    /// Create a guard in the live state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether teardown has already run.
    pub fn is_disposed(&self) -> bool {
        *self.disposed.lock()
    }

    /// Run `teardown` if this is the first dispose.
    ///
    /// The flag is set and `teardown` executes while the lock is held, so a
    /// concurrent [`while_live`](Self::while_live) either completes before
    /// teardown starts or observes the disposed state. Returns `true` if
    /// `teardown` ran.
    pub fn dispose_with(&self, teardown: impl FnOnce()) -> bool {
        let mut disposed = self.disposed.lock();
        if *disposed {
            return false;
        }
        *disposed = true;
        teardown();

        #[cfg(feature = "tracing")]
        tracing::debug!("resource disposed");

        true
    }

    /// Run `work` only if not yet disposed, holding the lock for its duration.
    ///
    /// `work` must not block or call back into the same guard.
    pub fn while_live<R>(&self, work: impl FnOnce() -> R) -> Option<R> {
        let disposed = self.disposed.lock();
        if *disposed {
            return None;
        }
        let result = work();
        drop(disposed);
        Some(result)
    }
}
