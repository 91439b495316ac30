//! CLI binary for threadcards.
//!
//! A thin shim over the library crate: get a script (file, topic or random),
//! render it, write one PNG per card.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use threadcards::{
    generate_deck, generate_random_deck, render_deck, write_deck_to_dir, CardLayout, ContentSource,
    DeckConfig, DeckOutput, DeckProgressCallback, FontConfig, FontSource, LlmContentSource,
    ProgressCallback, Script, Theme, TopicHistory,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar plus one log line per card. Cards finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.magenta} {prefix:.bold}  [{bar:36.magenta/238}] {pos:>2}/{len} cards  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
        bar.set_style(style);
        bar.set_prefix("Rendering");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn elapsed_ms(&self, card: usize) -> u128 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&card))
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0)
    }
}

impl DeckProgressCallback for CliProgressCallback {
    fn on_deck_start(&self, total_cards: usize) {
        self.bar.set_length(total_cards as u64);
        self.bar.reset_eta();
    }

    fn on_card_start(&self, card: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(card, Instant::now());
        }
        self.bar.set_message(format!("card {card}"));
    }

    fn on_card_complete(&self, card: usize, total: usize, png_len: usize) {
        let ms = self.elapsed_ms(card);
        self.bar.println(format!(
            "  {} Card {:>2}/{:<2}  {}  {}",
            green("✓"),
            card,
            total,
            dim(&format!("{:>7} bytes", png_len)),
            dim(&format!("{ms}ms")),
        ));
        self.bar.inc(1);
    }

    fn on_card_error(&self, card: usize, total: usize, error: &str) {
        let ms = self.elapsed_ms(card);
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Card {:>2}/{:<2}  {}  {}",
            red("✗"),
            card,
            total,
            red(&msg),
            dim(&format!("{ms}ms")),
        ));
        self.bar.inc(1);
    }

    fn on_deck_complete(&self, _total: usize, _success: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r##"EXAMPLES:
  # Render a script you already have
  threadcards --script thread.json -o cards/

  # Ask the model for a post on a topic
  threadcards --topic "Понедельник" -o cards/

  # Random topic, avoiding themes used before
  threadcards --avoid "Кофе" --avoid "Дедлайн"

  # Use a specific font file and print a JSON manifest
  threadcards --script thread.json --font ./Inter.ttf --bold-font ./Inter-Bold.ttf --json

SCRIPT FORMAT:
  {
    "theme": "Дедлайн",
    "replies": [ { "role": "Я", "text": "**Всё** горит" }, ... ],
    "cta": "Укажи себя👇",
    "tags": ["#ирония"]
  }

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  RUST_LOG                Log filter, e.g. threadcards=debug
"##;

/// Render dialogue scripts into decks of square cards.
#[derive(Parser, Debug)]
#[command(
    name = "threadcards",
    version,
    about = "Render dialogue scripts into decks of square cards",
    long_about = "Render a short dialogue script (from a JSON file or generated by an LLM) into \
one PNG card per reply: role on top, wrapped text with **bold** and *italic* markup, and an \
i/n counter at the bottom.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Render this JSON script instead of generating one.
    #[arg(short, long, env = "THREADCARDS_SCRIPT", conflicts_with_all = ["topic", "avoid"])]
    script: Option<PathBuf>,

    /// Topic to generate a post about. Without --script or --topic a random topic is used.
    #[arg(short, long, env = "THREADCARDS_TOPIC")]
    topic: Option<String>,

    /// Theme a random topic must avoid (repeatable).
    #[arg(long, value_name = "THEME", conflicts_with = "topic")]
    avoid: Vec<String>,

    /// Directory for the PNG files.
    #[arg(short, long, env = "THREADCARDS_OUTPUT", default_value = "cards")]
    output_dir: PathBuf,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID. Default: gpt-4o.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "THREADCARDS_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "THREADCARDS_TEMPERATURE", default_value_t = 0.9)]
    temperature: f32,

    /// Regular face: a TTF/OTF file.
    #[arg(long, env = "THREADCARDS_FONT")]
    font: Option<PathBuf>,

    /// Bold face: a TTF/OTF file.
    #[arg(long, env = "THREADCARDS_BOLD_FONT")]
    bold_font: Option<PathBuf>,

    /// System font family used when no font file is given.
    #[arg(long, env = "THREADCARDS_FONT_FAMILY", default_value = threadcards::fonts::DEFAULT_FAMILY)]
    font_family: String,

    /// Skip font lookup and draw with the built-in face.
    #[arg(long, conflicts_with_all = ["font", "bold_font"])]
    builtin_font: bool,

    /// JSON file with layout overrides (width, height, padding, sizes…).
    #[arg(long, env = "THREADCARDS_LAYOUT")]
    layout: Option<PathBuf>,

    /// JSON file with colour overrides (background, role, text, accent).
    #[arg(long, env = "THREADCARDS_THEME")]
    theme: Option<PathBuf>,

    /// Cards rendered in parallel.
    #[arg(short, long, env = "THREADCARDS_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Print the deck manifest as JSON on stdout.
    #[arg(long, env = "THREADCARDS_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "THREADCARDS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "THREADCARDS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "THREADCARDS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn DeckProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Get a script and render it ───────────────────────────────────────
    let deck = if let Some(ref path) = cli.script {
        let script = Script::from_file(path)
            .await
            .with_context(|| format!("Failed to load script {:?}", path))?;
        render_deck(&script, &config).await.context("Rendering failed")?
    } else {
        let source = build_source(&cli).await?;
        if !cli.quiet {
            eprintln!("{} Asking {} for a script…", dim("◆"), source.name());
        }
        match cli.topic {
            Some(ref topic) => generate_deck(&source, topic, &config)
                .await
                .context("Generation failed")?,
            None => {
                let mut history = TopicHistory::new();
                for theme in &cli.avoid {
                    history.record(theme);
                }
                generate_random_deck(&source, &mut history, &config)
                    .await
                    .context("Generation failed")?
            }
        }
    };

    // ── Write output ─────────────────────────────────────────────────────
    let written = write_deck_to_dir(&deck, &cli.output_dir)
        .await
        .context("Failed to write cards")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&deck).context("Failed to serialise manifest")?;
        println!("{json}");
    }

    if !cli.quiet {
        print_summary(&deck, written.len(), &cli.output_dir);
    }

    Ok(())
}

fn print_summary(deck: &DeckOutput, written: usize, dir: &std::path::Path) {
    let stats = &deck.stats;
    eprintln!(
        "{}  {}/{} cards  {}ms  →  {}",
        if stats.failed_cards == 0 {
            green("✔")
        } else {
            yellow("⚠")
        },
        written,
        stats.total_cards,
        stats.total_duration_ms,
        bold(&dir.display().to_string()),
    );
    eprintln!("   {} {}", dim("theme:"), deck.theme);
    if let Some(ref cta) = deck.cta {
        eprintln!("   {} {}", dim("cta:  "), cta);
    }
    if !deck.tags.is_empty() {
        eprintln!("   {} {}", dim("tags: "), deck.tags.join(" "));
    }
    if stats.font_fallbacks > 0 {
        eprintln!(
            "   {}",
            yellow("fonts missing: cards were drawn with the built-in face (see --font)")
        );
    }
    for failure in &deck.failures {
        eprintln!("   {} {}", red("✗"), failure);
    }
}

/// Map CLI args to `DeckConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<DeckConfig> {
    let layout: CardLayout = match cli.layout {
        Some(ref path) => read_json(path).await?,
        None => CardLayout::default(),
    };
    let theme: Theme = match cli.theme {
        Some(ref path) => read_json(path).await?,
        None => Theme::default(),
    };

    let mut builder = DeckConfig::builder()
        .layout(layout)
        .theme(theme)
        .fonts(font_config(cli));
    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn font_config(cli: &Cli) -> FontConfig {
    if cli.builtin_font {
        return FontConfig::builtin();
    }
    let system = || FontSource::System {
        family: cli.font_family.clone(),
    };
    FontConfig {
        regular: cli.font.clone().map(FontSource::File).unwrap_or_else(system),
        bold: cli
            .bold_font
            .clone()
            .or_else(|| cli.font.clone())
            .map(FontSource::File)
            .unwrap_or_else(system),
    }
}

async fn build_source(cli: &Cli) -> Result<LlmContentSource> {
    let mut source = LlmContentSource::from_env(cli.provider.as_deref(), cli.model.as_deref())
        .context("No content provider available; pass --script or set an API key")?
        .with_temperature(cli.temperature);

    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        source = source.with_system_prompt(prompt);
    }
    Ok(source)
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {:?}", path))
}
