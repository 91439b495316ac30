//! Sentence normalisation: punctuation spacing and forced sentence breaks.
//!
//! Runs on the whole reply *before* markup parsing, so emphasis delimiters
//! are still present in the text it sees. Every rule is a plain
//! `&str → String` pass; the composition is idempotent.
//!
//! ## Rule Order
//!
//! 1. Remove whitespace immediately before `, . ; ! ?`
//! 2. Collapse runs of 2+ whitespace characters into a single space
//! 3. Replace the whitespace after a sentence end (`. ! ?`) with `\n`; a
//!    terminator glued to a following capital letter (`конец.Начало`) is
//!    split the same way
//! 4. Trim the result
//!
//! Rule 1 must run before rule 3: once no whitespace precedes a terminator,
//! the character following a sentence break can never itself be a
//! terminator, so the rule-3 regex needs no lookahead.

use once_cell::sync::Lazy;
use regex::Regex;

/// Forced line break inserted between sentences.
pub const FORCED_BREAK: char = '\n';

/// Apply all normalisation rules to a reply.
pub fn normalize(text: &str) -> String {
    let s = tighten_punctuation(text);
    let s = collapse_whitespace(&s);
    let s = break_sentences(&s);
    s.trim().to_string()
}

// ── Rule 1: No whitespace before punctuation ─────────────────────────────────

static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+([,.;!?])").expect("valid punctuation regex"));

/// Remove whitespace directly preceding `, . ; ! ?`.
///
/// Also used on markup content and on finished line words.
pub fn tighten_punctuation(text: &str) -> String {
    RE_SPACE_BEFORE_PUNCT.replace_all(text, "$1").into_owned()
}

// ── Rule 2: Collapse whitespace runs ─────────────────────────────────────────

static RE_WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"));

fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

// ── Rule 3: One sentence per line ────────────────────────────────────────────

static RE_SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])\s+(\S)").expect("valid sentence regex"));

// Catches model output that forgets the space between sentences. Digits and
// lower-case letters are left alone so "3.5" and "т.е.всё" stay glued.
static RE_GLUED_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([.!?])(\p{Lu})").expect("valid glued sentence regex"));

fn break_sentences(text: &str) -> String {
    let replacement = format!("${{1}}{FORCED_BREAK}${{2}}");
    let s = RE_SENTENCE_END.replace_all(text, replacement.as_str());
    RE_GLUED_SENTENCE
        .replace_all(&s, replacement.as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_space_before_punctuation() {
        assert_eq!(tighten_punctuation("да , нет ; ок !"), "да, нет; ок!");
    }

    #[test]
    fn collapses_runs() {
        assert_eq!(collapse_whitespace("a   b \t c"), "a b c");
    }

    #[test]
    fn breaks_after_sentence_end() {
        assert_eq!(break_sentences("Раз. Два! Три? Ок"), "Раз.\nДва!\nТри?\nОк");
    }

    #[test]
    fn does_not_break_after_comma_or_colon() {
        assert_eq!(normalize("раз, два: три; четыре"), "раз, два: три; четыре");
    }

    #[test]
    fn glued_sentence_is_split_before_capital() {
        assert_eq!(normalize("решение.Что"), "решение.\nЧто");
        assert_eq!(normalize("версия 3.5 и т.е.всё"), "версия 3.5 и т.е.всё");
        assert_eq!(normalize("версия 3.5 и т.е. всё"), "версия 3.5 и т.е.\nвсё");
    }

    #[test]
    fn example_sentence_without_space_after_period() {
        let input = "Это   просто *шок* , а не решение.Что дальше?";
        assert_eq!(
            normalize(input),
            "Это просто *шок*, а не решение.\nЧто дальше?"
        );
    }

    #[test]
    fn trims_edges() {
        assert_eq!(normalize("   привет   "), "привет");
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t "), "");
    }

    #[test]
    fn idempotent_on_samples() {
        let samples = [
            "",
            "Это   просто *шок* , а не решение.Что дальше?",
            "Раз.Два.Три",
            "a .  b ! c ?d",
            "  Много   пробелов\n\nи строк.  Ещё .   ",
            "**ВСЁ** пропало !!!   Да.",
            "...  ?!  ,",
            "Ну и я. Вот.",
            "tab\t\tseparated . text",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }
}
