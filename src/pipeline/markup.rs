//! Emphasis markup: `**bold**` and `*italic*` spans.
//!
//! A forward scanner with an explicit index rather than a regex: when a
//! delimiter is seen, the scanner looks ahead for its closer. No closer means
//! the delimiter is ordinary text, which keeps the result deterministic for
//! stray or unbalanced asterisks in model output.
//!
//! Nesting is not supported. Inside a bold span a single `*` is literal; an
//! italic span ends at the very next `*`, even when that `*` starts a `**`.

use crate::pipeline::normalize::tighten_punctuation;
use serde::{Deserialize, Serialize};

/// Emphasis style of a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Normal,
    Bold,
    Italic,
}

impl Style {
    /// Bold and italic are "emphasised"; it changes spacing before lone
    /// punctuation when drawing.
    pub fn is_emphasis(self) -> bool {
        matches!(self, Style::Bold | Style::Italic)
    }
}

/// A maximal span of text sharing one style, in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyledRun {
    pub text: String,
    pub style: Style,
}

impl StyledRun {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

const DELIMITER: char = '*';

/// Split text into styled runs.
///
/// Never fails. Empty input yields one empty `Normal` run.
pub fn parse(text: &str) -> Vec<StyledRun> {
    let chars: Vec<char> = text.chars().collect();
    let mut runs = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != DELIMITER {
            plain.push(chars[i]);
            i += 1;
            continue;
        }

        let bold = chars.get(i + 1) == Some(&DELIMITER);
        let (width, style) = if bold {
            (2, Style::Bold)
        } else {
            (1, Style::Italic)
        };

        match find_closer(&chars, i + width, width) {
            Some(end) => {
                flush_plain(&mut plain, &mut runs);
                let content: String = chars[i + width..end].iter().collect();
                runs.push(StyledRun::new(tighten_punctuation(&content), style));
                i = end + width;
            }
            None => {
                // Unterminated: emit one literal '*' and rescan from the next char.
                plain.push(DELIMITER);
                i += 1;
            }
        }
    }
    flush_plain(&mut plain, &mut runs);

    if runs.is_empty() {
        runs.push(StyledRun::new(String::new(), Style::Normal));
    }
    runs
}

/// Index of the first closing delimiter of `width` asterisks at or after `from`.
fn find_closer(chars: &[char], from: usize, width: usize) -> Option<usize> {
    if from > chars.len() {
        return None;
    }
    chars[from..]
        .windows(width)
        .position(|w| w.iter().all(|&c| c == DELIMITER))
        .map(|offset| from + offset)
}

fn flush_plain(plain: &mut String, runs: &mut Vec<StyledRun>) {
    if plain.is_empty() {
        return;
    }
    runs.push(StyledRun::new(tighten_punctuation(plain), Style::Normal));
    plain.clear();
}
