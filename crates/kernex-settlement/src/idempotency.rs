//! Deposit idempotency guard.
//!
//! A wallet confirmation can be delivered more than once. Each external
//! reference (transaction hash) may be credited once; a second attempt
//! returns [`KernexError::DuplicateDeposit`].
//!
//! The guard is a bounded cache with oldest-first eviction, so memory stays
//! flat on long-running nodes. References that fall out of the cache are
//! still caught by the journal lookup in the engine.

use std::collections::{HashSet, VecDeque};

use kernex_types::{KernexError, Result};

/// Recently credited deposit references.
#[derive(Debug)]
pub struct DepositGuard {
    seen: HashSet<String>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<String>,
    max_size: usize,
}

impl DepositGuard {
    /// Create a guard remembering at most `max_size` references.
    /// A zero size is raised to one.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            seen: HashSet::with_capacity(max_size.min(1024)),
            order: VecDeque::with_capacity(max_size.min(1024)),
            max_size,
        }
    }

    /// Fail if `reference` was already credited.
    ///
    /// # Errors
    /// [`KernexError::DuplicateDeposit`] for a remembered reference.
    pub fn check(&self, reference: &str) -> Result<()> {
        if self.seen.contains(reference) {
            return Err(KernexError::DuplicateDeposit(reference.to_string()));
        }
        Ok(())
    }

    /// Remember a reference once its deposit has committed. Repeats are
    /// ignored, so the cache can also be warmed from the journal.
    pub fn remember(&mut self, reference: &str) {
        if self.seen.contains(reference) {
            return;
        }
        if self.seen.len() >= self.max_size {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(reference.to_string());
        self.order.push_back(reference.to_string());
    }

    #[must_use]
    pub fn contains(&self, reference: &str) -> bool {
        self.seen.contains(reference)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
