//! Word segmentation: styled runs → word tokens and forced breaks.

use crate::pipeline::markup::{Style, StyledRun};
use crate::pipeline::normalize::FORCED_BREAK;
use serde::{Deserialize, Serialize};

/// Characters stripped from the right end of a word as trailing punctuation.
pub const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '—', '-'];

/// One unit consumed by the line breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// A word with its trailing punctuation split off.
    Word(WordToken),
    /// Forced line break between paragraphs.
    Break,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordToken {
    /// Word body; empty for a bare punctuation token such as a lone dash.
    pub word: String,
    pub punctuation: String,
    pub style: Style,
}

impl WordToken {
    /// The word as it will be drawn: body followed by its punctuation.
    pub fn rendered(&self) -> String {
        format!("{}{}", self.word, self.punctuation)
    }
}

impl Token {
    pub fn is_break(&self) -> bool {
        matches!(self, Token::Break)
    }
}

/// Flatten styled runs into tokens, preserving reading order.
pub fn segment(runs: &[StyledRun]) -> Vec<Token> {
    let mut tokens = Vec::new();

    for run in runs {
        let parts: Vec<&str> = run.text.split(FORCED_BREAK).collect();
        let last = parts.len() - 1;

        for (idx, part) in parts.iter().enumerate() {
            for raw in part.split_whitespace() {
                let (word, punctuation) = split_trailing_punctuation(raw);
                tokens.push(Token::Word(WordToken {
                    word: word.to_string(),
                    punctuation: punctuation.to_string(),
                    style: run.style,
                }));
            }
            if idx < last {
                tokens.push(Token::Break);
            }
        }
    }

    tokens
}

/// Split `word` into `(body, trailing punctuation)`.
///
/// ```
/// use threadcards::pipeline::segment::split_trailing_punctuation;
/// assert_eq!(split_trailing_punctuation("Что?!"), ("Что", "?!"));
/// assert_eq!(split_trailing_punctuation("—"), ("", "—"));
/// ```
pub fn split_trailing_punctuation(word: &str) -> (&str, &str) {
    let body = word.trim_end_matches(TRAILING_PUNCTUATION);
    (body, &word[body.len()..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{markup, normalize};

    fn word(w: &str, p: &str, style: Style) -> Token {
        Token::Word(WordToken {
            word: w.into(),
            punctuation: p.into(),
            style,
        })
    }

    #[test]
    fn splits_words_and_punctuation() {
        let runs = vec![StyledRun::new("Раз, два... три!", Style::Normal)];
        assert_eq!(
            segment(&runs),
            vec![
                word("Раз", ",", Style::Normal),
                word("два", "...", Style::Normal),
                word("три", "!", Style::Normal),
            ]
        );
    }

    #[test]
    fn lone_dash_keeps_a_token() {
        let runs = vec![StyledRun::new("это — шок", Style::Normal)];
        let tokens = segment(&runs);
        assert_eq!(tokens[1], word("", "—", Style::Normal));
    }

    #[test]
    fn internal_hyphen_is_kept() {
        let runs = vec![StyledRun::new("Wi-Fi-", Style::Normal)];
        assert_eq!(segment(&runs), vec![word("Wi-Fi", "-", Style::Normal)]);
    }

    #[test]
    fn break_between_parts_not_after_last() {
        let runs = vec![StyledRun::new("Раз.\nДва.", Style::Normal)];
        assert_eq!(
            segment(&runs),
            vec![
                word("Раз", ".", Style::Normal),
                Token::Break,
                word("Два", ".", Style::Normal),
            ]
        );
    }

    #[test]
    fn blank_parts_still_produce_breaks() {
        let runs = vec![StyledRun::new("a\n \nb", Style::Normal)];
        assert_eq!(
            segment(&runs),
            vec![
                word("a", "", Style::Normal),
                Token::Break,
                Token::Break,
                word("b", "", Style::Normal),
            ]
        );
    }

    #[test]
    fn empty_run_produces_nothing() {
        assert!(segment(&[StyledRun::new("", Style::Normal)]).is_empty());
    }

    #[test]
    fn styles_follow_runs() {
        let runs = markup::parse("**ВСЁ** пропало *совсем*");
        let tokens = segment(&runs);
        assert_eq!(
            tokens,
            vec![
                word("ВСЁ", "", Style::Bold),
                word("пропало", "", Style::Normal),
                word("совсем", "", Style::Italic),
            ]
        );
    }

    #[test]
    fn unmatched_star_stays_in_normal_token() {
        let tokens = segment(&markup::parse("цена *5"));
        assert_eq!(tokens[1], word("*5", "", Style::Normal));
    }

    #[test]
    fn example_never_merges_across_break() {
        let text = normalize::normalize("Это   просто *шок* , а не решение.Что дальше?");
        let tokens = segment(&markup::parse(&text));
        let break_at = tokens.iter().position(Token::is_break).expect("break");
        assert_eq!(tokens[break_at - 1], word("решение", ".", Style::Normal));
        assert_eq!(tokens[break_at + 1], word("Что", "", Style::Normal));
        assert_eq!(tokens[2], word("шок", "", Style::Italic));
        assert_eq!(tokens[3], word("", ",", Style::Normal));
    }
}
