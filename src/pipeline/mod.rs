//! Pipeline stages for turning one reply into a card image.
//!
//! Each submodule implements exactly one transformation step and is a pure
//! function of its input, plus text measurement supplied by the font book.
//!
//! ## Data Flow
//!
//! ```text
//! text ──▶ normalize ──▶ markup ──▶ segment ──▶ linebreak ──▶ render ──▶ encode
//!          (spacing,     (styled    (tokens,    (lines ≤      (RGB       (PNG)
//!           breaks)       runs)      breaks)     width)        canvas)
//! ```
//!
//! 1. [`normalize`]: fix spacing before punctuation and put each sentence on
//!    its own line
//! 2. [`markup`]: split `**bold**` and `*italic*` spans into styled runs
//! 3. [`segment`]: flatten runs into words with trailing punctuation, plus
//!    forced breaks
//! 4. [`linebreak`]: greedy wrap to the content width, keeping short words
//!    with the word after them
//! 5. [`render`]: vertical layout and drawing; CPU-bound, so the deck
//!    runs it on the blocking pool
//! 6. [`encode`]: PNG bytes for the caller

pub mod encode;
pub mod linebreak;
pub mod markup;
pub mod normalize;
pub mod render;
pub mod segment;
