//! Greedy line breaking with a short-word lookback.
//!
//! Words are packed left to right into the current line while the joined
//! line still measures within the width budget. When a word does not fit,
//! the line is flushed, except that short function words ("и", "в", "на",
//! any word of one or two letters) at its end are pulled down onto the next
//! line together with the overflowing word, so a preposition never dangles
//! at the end of a row.
//!
//! Measurement is injected as a closure so layout can be tested without a
//! font backend; the card renderer passes the font book's measurer.

use crate::error::DeckError;
use crate::pipeline::markup::Style;
use crate::pipeline::normalize::tighten_punctuation;
use crate::pipeline::segment::{split_trailing_punctuation, Token};
use serde::{Deserialize, Serialize};

/// Function words that must not end a wrapped line.
pub const KEEP_WITH_NEXT: &[&str] = &[
    "и", "в", "на", "с", "по", "за", "из", "о", "у", "к", "до", "от", "не",
];

/// Any word this short (in characters, punctuation excluded) also keeps with
/// the next one.
pub const SHORT_WORD_MAX_CHARS: usize = 2;

/// One word on a laid-out line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineWord {
    pub text: String,
    pub style: Style,
}

impl LineWord {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// One visual row of a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub words: Vec<LineWord>,
}

impl Line {
    /// The words joined by single spaces, as used for measuring.
    pub fn text(&self) -> String {
        join_words(&self.words)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn last_word(&self) -> Option<&LineWord> {
        self.words.last()
    }
}

/// Whether `word` must be kept on the same line as the word after it.
pub fn keeps_with_next(word: &str) -> bool {
    let (body, _) = split_trailing_punctuation(word);
    let lower = body.to_lowercase();
    KEEP_WITH_NEXT.contains(&lower.as_str()) || body.chars().count() <= SHORT_WORD_MAX_CHARS
}

/// Pack tokens into lines no wider than `max_width_px`.
///
/// `measure(text, style)` returns the pixel width of `text` in the face for
/// `style`. A word wider than the budget on its own gets a line to itself.
///
/// # Errors
/// [`DeckError::InvalidConfig`] when `max_width_px` is not a positive,
/// finite number.
pub fn break_lines<F>(tokens: &[Token], max_width_px: f32, measure: F) -> Result<Vec<Line>, DeckError>
where
    F: Fn(&str, Style) -> f32,
{
    if !max_width_px.is_finite() || max_width_px <= 0.0 {
        return Err(DeckError::InvalidConfig(format!(
            "max line width must be positive, got {max_width_px}"
        )));
    }

    let mut lines = Vec::new();
    let mut current: Vec<LineWord> = Vec::new();

    for token in tokens {
        let word = match token {
            Token::Break => {
                flush(&mut current, &mut lines);
                continue;
            }
            Token::Word(word) => word,
        };

        let candidate = LineWord::new(word.rendered(), word.style);
        if current.is_empty() || fits(&current, &candidate, max_width_px, &measure) {
            current.push(candidate);
            continue;
        }

        let carried = carry_count(&current, &candidate, max_width_px, &measure);
        let tail = current.split_off(current.len() - carried);
        flush(&mut current, &mut lines);
        current = tail;
        current.push(candidate);
    }
    flush(&mut current, &mut lines);

    Ok(lines.into_iter().map(tidy_line).collect())
}

/// How many trailing short words of `current` move down with `candidate`.
///
/// At least one word always stays behind, and the moved words plus the
/// candidate must still fit.
fn carry_count<F>(current: &[LineWord], candidate: &LineWord, max_width_px: f32, measure: &F) -> usize
where
    F: Fn(&str, Style) -> f32,
{
    let mut n = 0;
    while n + 1 < current.len() {
        let start = current.len() - 1 - n;
        if !keeps_with_next(&current[start].text) {
            break;
        }
        if !fits(&current[start..], candidate, max_width_px, measure) {
            break;
        }
        n += 1;
    }
    n
}

/// Whether `head` followed by `candidate` fits, measured in the candidate's face.
fn fits<F>(head: &[LineWord], candidate: &LineWord, max_width_px: f32, measure: &F) -> bool
where
    F: Fn(&str, Style) -> f32,
{
    let mut words: Vec<&str> = head.iter().map(|w| w.text.as_str()).collect();
    words.push(&candidate.text);
    measure(&words.join(" "), candidate.style) <= max_width_px
}

fn flush(current: &mut Vec<LineWord>, lines: &mut Vec<Line>) {
    if current.is_empty() {
        return;
    }
    lines.push(Line {
        words: std::mem::take(current),
    });
}

fn tidy_line(line: Line) -> Line {
    Line {
        words: line
            .words
            .into_iter()
            .map(|w| LineWord::new(tighten_punctuation(&w.text), w.style))
            .collect(),
    }
}

fn join_words(words: &[LineWord]) -> String {
    words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{markup, normalize, segment};

    /// 10 px per character; bold is 20% wider.
    fn mono(text: &str, style: Style) -> f32 {
        let base = text.chars().count() as f32 * 10.0;
        if style == Style::Bold {
            base * 1.2
        } else {
            base
        }
    }

    fn layout(text: &str, width: f32) -> Vec<Line> {
        let tokens = segment::segment(&markup::parse(&normalize::normalize(text)));
        break_lines(&tokens, width, mono).expect("valid width")
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(Line::text).collect()
    }

    #[test]
    fn rejects_non_positive_width() {
        assert!(matches!(
            break_lines(&[], 0.0, mono),
            Err(DeckError::InvalidConfig(_))
        ));
        assert!(break_lines(&[], -5.0, mono).is_err());
        assert!(break_lines(&[], f32::NAN, mono).is_err());
    }

    #[test]
    fn empty_tokens_yield_no_lines() {
        assert!(break_lines(&[], 100.0, mono).unwrap().is_empty());
    }

    #[test]
    fn short_text_fits_on_one_line() {
        assert_eq!(texts(&layout("ВСЁ пропало", 760.0)), vec!["ВСЁ пропало"]);
    }

    #[test]
    fn wraps_at_budget() {
        // 10 chars per line
        assert_eq!(
            texts(&layout("альфа бета гамма дельта", 100.0)),
            vec!["альфа бета", "гамма", "дельта"]
        );
    }

    #[test]
    fn short_word_moves_to_next_line() {
        // "дом и" is 50 px, "дом и садик" is 110 px.
        assert_eq!(
            texts(&layout("дом и садик", 100.0)),
            vec!["дом", "и садик"]
        );
    }

    #[test]
    fn run_of_short_words_moves_together() {
        assert_eq!(
            texts(&layout("слово и в домике", 100.0)),
            vec!["слово", "и в домике"]
        );
    }

    #[test]
    fn single_short_word_line_is_flushed_as_is() {
        assert_eq!(
            texts(&layout("и длиннющееслово", 100.0)),
            vec!["и", "длиннющееслово"]
        );
    }

    #[test]
    fn oversized_word_gets_its_own_line() {
        let lines = layout("а сверхдлинноеслово б", 50.0);
        assert!(lines.iter().any(|l| l.text() == "сверхдлинноеслово"));
        for line in &lines {
            if mono(&line.text(), Style::Normal) > 50.0 {
                assert_eq!(line.len(), 1, "only a lone word may overflow: {line:?}");
            }
        }
    }

    #[test]
    fn carry_is_skipped_when_pair_would_overflow() {
        // "я" + "сверхдлинное" would exceed the budget, so "я" stays behind.
        assert_eq!(
            texts(&layout("ну я сверхдлинное", 60.0)),
            vec!["ну я", "сверхдлинное"]
        );
    }

    #[test]
    fn forced_break_flushes_line() {
        assert_eq!(
            texts(&layout("Раз. Два.", 760.0)),
            vec!["Раз.", "Два."]
        );
    }

    #[test]
    fn bold_measured_with_bold_width() {
        // "аааа бббб" is 90 px normal but the bold candidate measures 108 px.
        let tokens = segment::segment(&markup::parse("аааа **бббб**"));
        let lines = break_lines(&tokens, 100.0, mono).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].words[0].style, Style::Bold);
    }

    #[test]
    fn keep_set_membership() {
        assert!(keeps_with_next("на"));
        assert!(keeps_with_next("Не,"));
        assert!(keeps_with_next("я"));
        assert!(keeps_with_next("—"));
        assert!(!keeps_with_next("дом"));
        assert!(!keeps_with_next("пропало."));
    }

    #[test]
    fn lines_preserve_token_order() {
        let text = "Один два три четыре пять шесть семь восемь девять десять";
        let lines = layout(text, 120.0);
        let rebuilt: Vec<String> = lines
            .iter()
            .flat_map(|l| l.words.iter().map(|w| w.text.clone()))
            .collect();
        assert_eq!(rebuilt.join(" "), text);
    }

    #[test]
    fn width_and_orphan_invariants_hold() {
        let text = "В понедельник я пошёл на работу и не нашёл там ни стола, ни стула, \
                    ни коллег, а только кота у окна с видом на море и до горизонта";
        for width in [150.0, 200.0, 260.0, 400.0] {
            let lines = layout(text, width);
            for (i, line) in lines.iter().enumerate() {
                let w = mono(&line.text(), Style::Normal);
                assert!(
                    w <= width || line.len() == 1,
                    "width {width}: line {line:?} is {w}px"
                );
                let is_final = i == lines.len() - 1;
                if !is_final && line.len() > 1 {
                    let last = &line.last_word().unwrap().text;
                    assert!(
                        !keeps_with_next(last),
                        "width {width}: line {:?} ends with short word",
                        line.text()
                    );
                }
            }
        }
    }
}
