//! Output types: rendered cards and whole decks.

use crate::error::{CardError, DeckError};
use serde::{Deserialize, Serialize};

/// One rendered card, ready to hand to a viewer or write to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedCard {
    /// 1-indexed position in the deck.
    pub card_index: usize,
    pub total_cards: usize,
    /// Role as drawn, placeholder included.
    pub role: String,
    /// Reply text as received, before normalisation.
    pub text: String,
    pub width: u32,
    pub height: u32,
    /// PNG bytes. Left out of JSON manifests.
    #[serde(skip)]
    pub png: Vec<u8>,
    /// Drawn with the built-in face because a requested font was missing.
    pub degraded_fonts: bool,
    /// Number of paragraph lines after wrapping.
    pub line_count: usize,
    pub duration_ms: u64,
}

/// Statistics for one deck.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeckStats {
    pub total_cards: usize,
    pub rendered_cards: usize,
    pub failed_cards: usize,
    /// Font weights that fell back to the built-in face.
    pub font_fallbacks: usize,
    pub total_png_bytes: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A rendered deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckOutput {
    pub id: String,
    pub theme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Successful cards sorted by `card_index`.
    pub cards: Vec<RenderedCard>,
    /// Failed cards sorted by card number.
    #[serde(default)]
    pub failures: Vec<CardError>,
    pub stats: DeckStats,
}

impl DeckOutput {
    /// True when at least one card failed.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Treat any card failure as an error.
    pub fn into_result(self) -> Result<Self, DeckError> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        Err(DeckError::PartialFailure {
            success: self.cards.len(),
            failed: self.failures.len(),
            total: self.stats.total_cards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(index: usize) -> RenderedCard {
        RenderedCard {
            card_index: index,
            total_cards: 2,
            role: "Я".into(),
            text: "текст".into(),
            width: 1080,
            height: 1080,
            png: vec![1, 2, 3],
            degraded_fonts: false,
            line_count: 1,
            duration_ms: 3,
        }
    }

    fn deck(failures: Vec<CardError>) -> DeckOutput {
        DeckOutput {
            id: "post_1".into(),
            theme: "Тема".into(),
            cta: None,
            tags: vec![],
            cards: vec![card(1)],
            failures,
            stats: DeckStats {
                total_cards: 2,
                ..Default::default()
            },
        }
    }

    #[test]
    fn into_result_reports_partial_failure() {
        let failed = deck(vec![CardError::EncodeFailed {
            card: 2,
            detail: "x".into(),
        }]);
        assert!(failed.is_partial());
        match failed.into_result() {
            Err(DeckError::PartialFailure { success, failed, total }) => {
                assert_eq!((success, failed, total), (1, 1, 2));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn manifest_omits_png_bytes() {
        let json = serde_json::to_string(&deck(vec![])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["cards"][0].get("png").is_none());
        assert!(value["stats"].get("total_png_bytes").is_some());
        assert!(json.contains("\"degraded_fonts\":false"));
        assert!(deck(vec![]).into_result().is_ok());
    }
}
