//! Single-flight guard keyed by check id.
//!
//! Sweeps are never awaited by the scheduler, so a slow sweep can overlap
//! the next one. Before touching a check (probe + write-back, or rotating
//! its log) a task claims the id here; a second claimant is refused and
//! skips the check until the next sweep.

use dashmap::DashSet;

use crate::domain::CheckId;

/// Set of check ids currently being worked on.
#[derive(Debug, Default)]
pub struct InFlight {
    ids: DashSet<CheckId>,
}

impl InFlight {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id`, or returns `None` if another task holds it.
    ///
    /// The claim is released when the returned guard is dropped.
    #[must_use]
    pub fn try_acquire(&self, id: &CheckId) -> Option<InFlightGuard<'_>> {
        if self.ids.insert(id.clone()) {
            Some(InFlightGuard {
                set: self,
                id: id.clone(),
            })
        } else {
            None
        }
    }

    /// Returns `true` if `id` is currently claimed.
    #[must_use]
    pub fn contains(&self, id: &CheckId) -> bool {
        self.ids.contains(id)
    }

    /// Number of claimed ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns `true` if nothing is claimed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Releases its check id on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    set: &'a InFlight,
    id: CheckId,
}

impl InFlightGuard<'_> {
    /// The claimed id.
    #[must_use]
    pub fn id(&self) -> &CheckId {
        &self.id
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.ids.remove(&self.id);
    }
}
