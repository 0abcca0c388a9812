//! Guarding against superseded fetches.
//!
//! A page that refetches on every filter change can see responses arrive out
//! of order. Each fetch takes a [`FetchTicket`] before it starts and checks it
//! when the response lands; only the most recently issued ticket is current.
//!
//! ```
//! use lockshop_core::recency::FetchSequence;
//!
//! let sequence = FetchSequence::new();
//! let slow = sequence.begin();
//! let fast = sequence.begin();
//!
//! assert!(sequence.is_current(fast));
//! assert!(!sequence.is_current(slow));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one fetch issued from a [`FetchSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchTicket(u64);

impl FetchTicket {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Monotonic ticket issuer, one per data source on a page.
#[derive(Debug, Default)]
pub struct FetchSequence {
    latest: AtomicU64,
}

impl FetchSequence {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            latest: AtomicU64::new(0),
        }
    }

    /// Issue a ticket for a fetch that is about to start.
    ///
    /// Every earlier ticket stops being current.
    pub fn begin(&self) -> FetchTicket {
        FetchTicket(self.latest.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Whether `ticket` belongs to the newest fetch.
    #[must_use]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.latest.load(Ordering::Acquire) == ticket.0
    }

    /// Keep `value` only if `ticket` is still current.
    pub fn accept<T>(&self, ticket: FetchTicket, value: T) -> Option<T> {
        self.is_current(ticket).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_ticket_wins() {
        let sequence = FetchSequence::new();
        let first = sequence.begin();
        assert!(sequence.is_current(first));

        let second = sequence.begin();
        assert!(!sequence.is_current(first));
        assert!(sequence.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn test_accept_discards_stale_response() {
        let sequence = FetchSequence::new();
        let stale = sequence.begin();
        let fresh = sequence.begin();

        // The fresh response lands first, the stale one afterwards.
        assert_eq!(sequence.accept(fresh, "page 2"), Some("page 2"));
        assert_eq!(sequence.accept(stale, "page 1"), None);
    }

    #[test]
    fn test_tickets_across_threads_are_unique() {
        let sequence = std::sync::Arc::new(FetchSequence::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sequence = std::sync::Arc::clone(&sequence);
                std::thread::spawn(move || sequence.begin())
            })
            .collect();

        let mut values: Vec<u64> = handles
            .into_iter()
            .map(|h| h.join().map(FetchTicket::value).unwrap_or_default())
            .collect();
        values.sort_unstable();
        values.dedup();
        assert_eq!(values.len(), 8);
    }
}
