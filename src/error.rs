//! Error types for the threadcards library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DeckError`] (**fatal**): the deck cannot be produced at all (the
//!   script has no replies, the configuration is invalid, the content source
//!   failed). Returned as `Err(DeckError)` from the top-level `render_*` and
//!   `generate_*` functions.
//!
//! * [`CardError`] (**non-fatal**): a single card failed (layout rejected,
//!   PNG encoding failed, the render task panicked) but every other card in
//!   the batch is fine. Stored in [`crate::output::DeckOutput::failures`] so
//!   callers can ship a partial deck or report the gaps.
//!
//! A missing font is neither: the renderer swaps in the built-in face and
//! marks the card as degraded.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the threadcards library.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The content source returned a script without any replies.
    #[error("Script has no replies; nothing to render.\nTry generating the script again.")]
    EmptyScript,

    /// The script payload could not be parsed.
    #[error("Invalid script: {reason}")]
    InvalidScript { reason: String },

    /// Reading a script file from disk failed.
    #[error("Failed to read script '{path}': {source}")]
    ScriptReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Content source errors ─────────────────────────────────────────────
    /// The configured LLM provider is not initialised (missing API key etc.).
    #[error("Content provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The content source call failed.
    #[error("Content source error: {message}")]
    ContentSource { message: String },

    // ── Render errors ─────────────────────────────────────────────────────
    /// Every card in the deck failed.
    #[error("All {total} cards failed to render.\nFirst error: {first_error}")]
    AllCardsFailed { total: usize, first_error: String },

    /// Some cards rendered but at least one failed.
    ///
    /// Returned by [`crate::output::DeckOutput::into_result`] when the
    /// caller wants to treat any card failure as an error.
    #[error("{failed}/{total} cards failed to render")]
    PartialFailure {
        success: usize,
        failed: usize,
        total: usize,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output image.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or layout validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single card.
///
/// The rest of the deck continues unless ALL cards fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum CardError {
    /// Line breaking rejected the layout (e.g. no room for text).
    #[error("Card {card}: layout failed: {detail}")]
    LayoutFailed { card: usize, detail: String },

    /// The rendered canvas could not be PNG-encoded.
    #[error("Card {card}: PNG encoding failed: {detail}")]
    EncodeFailed { card: usize, detail: String },

    /// The blocking render task panicked or was cancelled.
    #[error("Card {card}: render task failed: {detail}")]
    TaskFailed { card: usize, detail: String },
}

impl CardError {
    /// 1-indexed card number the error belongs to.
    pub fn card(&self) -> usize {
        match self {
            CardError::LayoutFailed { card, .. }
            | CardError::EncodeFailed { card, .. }
            | CardError::TaskFailed { card, .. } => *card,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = DeckError::PartialFailure {
            success: 6,
            failed: 1,
            total: 7,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/7"), "got: {msg}");
    }

    #[test]
    fn empty_script_display() {
        assert!(DeckError::EmptyScript.to_string().contains("no replies"));
    }

    #[test]
    fn card_error_reports_its_card() {
        let e = CardError::EncodeFailed {
            card: 4,
            detail: "boom".into(),
        };
        assert_eq!(e.card(), 4);
        assert!(e.to_string().contains("Card 4"));
    }

    #[test]
    fn card_error_serialises() {
        let e = CardError::TaskFailed {
            card: 2,
            detail: "panicked".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("TaskFailed"));
    }
}
