//! # threadcards
//!
//! Render short dialogue scripts ("different experts answer one problem")
//! into decks of square cards, one card per reply.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Script (JSON file or LLM)
//!  │
//!  ├─ 1. Normalize  punctuation spacing, one sentence per line
//!  ├─ 2. Markup     **bold** / *italic* → styled runs
//!  ├─ 3. Segment    words + trailing punctuation, forced breaks
//!  ├─ 4. Wrap       greedy, width-bounded, short words kept with the next
//!  ├─ 5. Render     role, separator, paragraph, "i/n" footer (spawn_blocking)
//!  └─ 6. Encode     PNG bytes per card + deck stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use threadcards::{render_deck, DeckConfig, Script};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let script = Script::from_file("thread.json").await?;
//!     let deck = render_deck(&script, &DeckConfig::default()).await?;
//!     threadcards::write_deck_to_dir(&deck, "out").await?;
//!     eprintln!("{} cards", deck.stats.rendered_cards);
//!     Ok(())
//! }
//! ```
//!
//! ## Fonts
//!
//! Faces are looked up in the system font database ("DejaVu Sans" by
//! default) or loaded from a path or bytes. A face that cannot be loaded is
//! replaced by a built-in box-glyph face; cards still render and are flagged
//! with `degraded_fonts`.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `threadcards` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! threadcards = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod content;
pub mod deck;
pub mod error;
pub mod fonts;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod script;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{CardLayout, Color, DeckConfig, DeckConfigBuilder, Theme};
pub use content::{ContentSource, JsonContentSource, LlmContentSource, TopicHistory};
pub use deck::{generate_deck, generate_random_deck, render_deck, render_deck_sync, write_deck_to_dir};
pub use error::{CardError, DeckError};
pub use fonts::{FontBook, FontConfig, FontSource, Weight};
pub use output::{DeckOutput, DeckStats, RenderedCard};
pub use progress::{DeckProgressCallback, NoopProgressCallback, ProgressCallback};
pub use script::{Reply, Script};
pub use stream::{render_stream, CardStream};
