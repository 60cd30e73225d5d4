use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation predicate, queried once at the start of each step
pub trait CancellationCheck {
    fn is_canceled(&self) -> bool;
}

impl<F> CancellationCheck for F
where
    F: Fn() -> bool,
{
    fn is_canceled(&self) -> bool {
        self()
    }
}

/// Shared cancellation flag.
///
/// Clones observe the same flag, so a UI or signal thread can keep one
/// handle while the sampling loop checks another.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag {
    canceled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; takes effect at the next step boundary
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
    }
}

impl CancellationCheck for CancelFlag {
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}
