//! Script payloads and the names derived from them.
//!
//! A [`Script`] is what a content source hands to the renderer: a theme and
//! an ordered list of replies. Every field is optional on the wire; missing
//! values are filled in at render time rather than rejected, so a sloppy
//! model response still yields a deck.

use crate::error::DeckError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Longest sanitised file-name stem, in characters.
pub const MAX_FILENAME_CHARS: usize = 80;

/// Stem used when a theme sanitises to nothing.
pub const FALLBACK_FILENAME: &str = "thread";

/// One post: a theme and the replies that become cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default)]
    pub replies: Vec<Reply>,
    /// Call to action shown next to the deck, never drawn on a card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cta: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// One speaker line; one card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Reply {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            text: Some(text.into()),
        }
    }

    /// The role, or `"Реплика {index}"` when the source left it out.
    pub fn role_or_placeholder(&self, index: usize) -> String {
        self.role
            .clone()
            .unwrap_or_else(|| format!("Реплика {index}"))
    }

    /// The text, empty when missing.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

impl Script {
    /// Parse a script from JSON, tolerating a surrounding ```` ```json ```` fence.
    pub fn from_json(raw: &str) -> Result<Self, DeckError> {
        serde_json::from_str(strip_code_fence(raw)).map_err(|e| DeckError::InvalidScript {
            reason: e.to_string(),
        })
    }

    /// Read and parse a script file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DeckError::ScriptReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        Self::from_json(&raw)
    }

    /// The theme, or `fallback` when the source left it out or blank.
    pub fn theme_or(&self, fallback: &str) -> String {
        self.theme
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(fallback)
            .to_string()
    }

    /// The id, generating one when missing.
    pub fn id_or_generate(&self) -> String {
        self.id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_id)
    }
}

/// Strip an optional Markdown code fence around a JSON payload.
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline.
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// `post_{unix seconds}_{6 hex digits}`.
pub fn generate_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(secs);
    format!("post_{secs}_{:06x}", hasher.finish() & 0xff_ffff)
}

/// Make `value` safe to use as a file-name stem.
///
/// Alphanumerics, `_`, `-` and spaces survive; anything else becomes `_`.
/// Whitespace-separated pieces are joined with `_` and the result is cut to
/// [`MAX_FILENAME_CHARS`] characters.
///
/// ```
/// use threadcards::script::sanitize_filename;
/// assert_eq!(sanitize_filename("Кот и Wi-Fi?"), "Кот_и_Wi-Fi_");
/// assert_eq!(sanitize_filename("  "), "thread");
/// ```
pub fn sanitize_filename(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let joined = cleaned.split_whitespace().collect::<Vec<_>>().join("_");
    let stem: String = joined.chars().take(MAX_FILENAME_CHARS).collect();
    if stem.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        stem
    }
}

/// File name for one card: `{theme}_{NN}_{role}.png`.
pub fn card_file_name(theme: &str, card_index: usize, role: &str) -> String {
    format!(
        "{}_{:02}_{}.png",
        sanitize_filename(theme),
        card_index,
        sanitize_filename(role)
    )
}
