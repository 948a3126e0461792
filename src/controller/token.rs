use std::sync::atomic::{AtomicBool, Ordering};

/// Identity and liveness of one dispatched page request.
///
/// A token stays live until its request is cancelled or its completion has
/// been applied. A completion whose token is no longer live is discarded.
#[derive(Debug)]
pub(crate) struct RequestToken {
    id: u64,
    page: usize,
    live: AtomicBool,
}

impl RequestToken {
    pub(crate) fn new(id: u64, page: usize) -> Self {
        Self {
            id,
            page,
            live: AtomicBool::new(true),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn page(&self) -> usize {
        self.page
    }

    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Marks the token dead. Returns `true` if it was live.
    pub(crate) fn invalidate(&self) -> bool {
        self.live.swap(false, Ordering::AcqRel)
    }
}
