//! Progress-callback trait for per-card rendering events.
//!
//! Inject an [`Arc<dyn DeckProgressCallback>`] via
//! [`crate::config::DeckConfigBuilder::progress_callback`] to receive events
//! as each card is rendered. Cards run concurrently, so every method may be
//! called from several threads at once.
//!
//! # Example
//!
//! ```rust
//! use threadcards::{DeckConfig, DeckProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl DeckProgressCallback for Counter {
//!     fn on_card_complete(&self, card: usize, total: usize, png_len: usize) {
//!         let done = self.0.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("card {card}/{total} ({png_len} bytes), {done} done");
//!     }
//! }
//!
//! let config = DeckConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the deck renderer as it processes each card.
///
/// All methods default to no-ops; override only what you need. Card numbers
/// are 1-indexed.
pub trait DeckProgressCallback: Send + Sync {
    /// Called once before any card is rendered.
    fn on_deck_start(&self, total_cards: usize) {
        let _ = total_cards;
    }

    /// Called when a card's render task starts.
    fn on_card_start(&self, card: usize, total_cards: usize) {
        let _ = (card, total_cards);
    }

    /// Called when a card has been rendered and encoded.
    fn on_card_complete(&self, card: usize, total_cards: usize, png_len: usize) {
        let _ = (card, total_cards, png_len);
    }

    /// Called when a card failed.
    fn on_card_error(&self, card: usize, total_cards: usize, error: &str) {
        let _ = (card, total_cards, error);
    }

    /// Called once after every card has been attempted.
    fn on_deck_complete(&self, total_cards: usize, success_count: usize) {
        let _ = (total_cards, success_count);
    }
}

/// A callback that ignores every event.
pub struct NoopProgressCallback;

impl DeckProgressCallback for NoopProgressCallback {}

/// The type stored in [`crate::config::DeckConfig`].
pub type ProgressCallback = Arc<dyn DeckProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Tracking {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl DeckProgressCallback for Tracking {
        fn on_card_start(&self, _card: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_card_complete(&self, _card: usize, _total: usize, _png_len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_card_error(&self, _card: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_deck_complete(&self, _total: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_deck_start(7);
        cb.on_card_start(1, 7);
        cb.on_card_complete(1, 7, 1024);
        cb.on_card_error(2, 7, "boom");
        cb.on_deck_complete(7, 6);
    }

    #[test]
    fn tracking_counts() {
        let t = Tracking::default();
        t.on_card_start(1, 3);
        t.on_card_start(2, 3);
        t.on_card_complete(1, 3, 5);
        t.on_card_error(2, 3, "x");
        t.on_deck_complete(3, 1);
        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(t.completes.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(t.succeeded.load(Ordering::SeqCst), 1);
    }
}
