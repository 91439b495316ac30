//! Eager (whole-deck) rendering entry points.
//!
//! [`render_deck`] waits for every card and returns them sorted. Use
//! [`crate::stream::render_stream`] to receive cards as they finish.
//!
//! Each card is laid out, drawn and PNG-encoded on the blocking thread pool;
//! at most `config.concurrency` cards are in flight. A card that fails (or
//! whose task panics) is recorded in [`DeckOutput::failures`] without
//! touching the others. Dropping the returned future abandons cards that
//! have not started yet.

use crate::config::{CardLayout, DeckConfig, Theme};
use crate::content::{ContentSource, TopicHistory};
use crate::error::{CardError, DeckError};
use crate::fonts::{FontBook, FontConfig};
use crate::output::{DeckOutput, DeckStats, RenderedCard};
use crate::pipeline::{encode, render};
use crate::progress::ProgressCallback;
use crate::script::{card_file_name, Script};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Render every reply of `script` into a card.
///
/// # Returns
/// `Ok(DeckOutput)` even if some cards failed (check `output.failures`).
///
/// # Errors
/// - [`DeckError::EmptyScript`] when the script has no replies
/// - [`DeckError::InvalidConfig`] when the layout is unusable
/// - [`DeckError::AllCardsFailed`] when no card could be rendered
pub async fn render_deck(script: &Script, config: &DeckConfig) -> Result<DeckOutput, DeckError> {
    let total_start = Instant::now();
    let jobs = card_jobs(script)?;
    let total_cards = jobs.len();
    info!("Rendering deck: {} cards", total_cards);

    // ── Step 1: Fonts ────────────────────────────────────────────────────
    let shared = load_shared(config).await?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_start(total_cards);
    }

    // ── Step 2: Cards ────────────────────────────────────────────────────
    let render_start = Instant::now();
    let results: Vec<Result<RenderedCard, CardError>> = stream::iter(jobs.into_iter().map(|job| {
        render_job(job, Arc::clone(&shared), config.progress_callback.clone())
    }))
    .buffer_unordered(config.concurrency.max(1))
    .collect()
    .await;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    // ── Step 3: Sort and tally ───────────────────────────────────────────
    let (mut cards, mut failures): (Vec<_>, Vec<_>) = (Vec::new(), Vec::new());
    for result in results {
        match result {
            Ok(card) => cards.push(card),
            Err(e) => failures.push(e),
        }
    }
    cards.sort_by_key(|c| c.card_index);
    failures.sort_by_key(CardError::card);

    if let Some(ref cb) = config.progress_callback {
        cb.on_deck_complete(total_cards, cards.len());
    }

    if cards.is_empty() {
        let first_error = failures
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(DeckError::AllCardsFailed {
            total: total_cards,
            first_error,
        });
    }

    let stats = DeckStats {
        total_cards,
        rendered_cards: cards.len(),
        failed_cards: failures.len(),
        font_fallbacks: shared.fonts.fallback_count(),
        total_png_bytes: cards.iter().map(|c| c.png.len() as u64).sum(),
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Deck complete: {}/{} cards, {}ms total",
        stats.rendered_cards, total_cards, stats.total_duration_ms
    );

    Ok(DeckOutput {
        id: script.id_or_generate(),
        theme: script.theme_or(""),
        cta: script.cta.clone(),
        tags: script.tags.clone(),
        cards,
        failures,
        stats,
    })
}

/// Synchronous wrapper around [`render_deck`].
///
/// Creates a temporary tokio runtime internally; do not call from inside one.
pub fn render_deck_sync(script: &Script, config: &DeckConfig) -> Result<DeckOutput, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(render_deck(script, config))
}

/// Fetch a script for `topic` and render it.
///
/// A script without a theme takes `topic` as its theme.
pub async fn generate_deck(
    source: &dyn ContentSource,
    topic: &str,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    let mut script = source.fetch(Some(topic)).await?;
    let theme = script.theme_or(topic);
    script.theme = Some(theme);
    render_deck(&script, config).await
}

/// Ask for a random topic that avoids every theme in `history`, render it,
/// and record the theme the source came up with.
pub async fn generate_random_deck(
    source: &dyn ContentSource,
    history: &mut TopicHistory,
    config: &DeckConfig,
) -> Result<DeckOutput, DeckError> {
    let request = history.request();
    debug!("Random topic request: {}", request);
    let deck = generate_deck(source, &request, config).await?;
    if history.record(&deck.theme) {
        debug!("Recorded random theme '{}'", deck.theme);
    }
    Ok(deck)
}

/// Write every card of `deck` into `dir` as `{theme}_{NN}_{role}.png`.
///
/// Each file is written to a temporary name and renamed into place, so a
/// crash never leaves a truncated PNG behind.
pub async fn write_deck_to_dir(
    deck: &DeckOutput,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>, DeckError> {
    let dir = dir.as_ref();
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DeckError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut written = Vec::with_capacity(deck.cards.len());
    for card in &deck.cards {
        let path = dir.join(card_file_name(&deck.theme, card.card_index, &card.role));
        let tmp_path = path.with_extension("png.tmp");
        let write_err = |e| DeckError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        };

        tokio::fs::write(&tmp_path, &card.png).await.map_err(write_err)?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(write_err(e));
        }
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    Ok(written)
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Everything a card task reads, shared by `Arc`.
pub(crate) struct SharedRender {
    pub fonts: FontBook,
    pub layout: CardLayout,
    pub theme: Theme,
}

/// One reply with its resolved role and position.
#[derive(Debug, Clone)]
pub(crate) struct CardJob {
    pub card_index: usize,
    pub total_cards: usize,
    pub role: String,
    pub text: String,
}

/// Turn replies into jobs, rejecting an empty script.
pub(crate) fn card_jobs(script: &Script) -> Result<Vec<CardJob>, DeckError> {
    if script.replies.is_empty() {
        return Err(DeckError::EmptyScript);
    }
    let total_cards = script.replies.len();
    Ok(script
        .replies
        .iter()
        .enumerate()
        .map(|(i, reply)| CardJob {
            card_index: i + 1,
            total_cards,
            role: reply.role_or_placeholder(i + 1),
            text: reply.text().to_string(),
        })
        .collect())
}

/// Validate the layout and load fonts off the async workers; a system font
/// scan reads every installed font file.
pub(crate) async fn load_shared(config: &DeckConfig) -> Result<Arc<SharedRender>, DeckError> {
    config.layout.validate()?;
    let fonts_config: FontConfig = config.fonts.clone();
    let layout = config.layout.clone();
    let theme = config.theme.clone();

    tokio::task::spawn_blocking(move || {
        let fonts = FontBook::load(&fonts_config, &layout.font_keys());
        if fonts.is_degraded() {
            warn!(
                "{} font weight(s) replaced by the built-in face; cards will be marked degraded",
                fonts.fallback_count()
            );
        }
        Arc::new(SharedRender {
            fonts,
            layout,
            theme,
        })
    })
    .await
    .map_err(|e| DeckError::Internal(format!("Font loading task panicked: {}", e)))
}

/// Render one card on the blocking pool, reporting to the callback.
pub(crate) async fn render_job(
    job: CardJob,
    shared: Arc<SharedRender>,
    callback: Option<ProgressCallback>,
) -> Result<RenderedCard, CardError> {
    let card = job.card_index;
    let total = job.total_cards;
    if let Some(ref cb) = callback {
        cb.on_card_start(card, total);
    }

    let result = tokio::task::spawn_blocking(move || render_blocking(&job, &shared))
        .await
        .map_err(|e| CardError::TaskFailed {
            card,
            detail: e.to_string(),
        })
        .and_then(|r| r);

    match &result {
        Ok(rendered) => {
            if let Some(ref cb) = callback {
                cb.on_card_complete(card, total, rendered.png.len());
            }
        }
        Err(e) => {
            warn!("{}", e);
            if let Some(ref cb) = callback {
                cb.on_card_error(card, total, &e.to_string());
            }
        }
    }
    result
}

fn render_blocking(job: &CardJob, shared: &SharedRender) -> Result<RenderedCard, CardError> {
    let start = Instant::now();
    let card = render::layout_card(
        &job.role,
        &job.text,
        job.card_index,
        job.total_cards,
        &shared.fonts,
        &shared.layout,
    )
    .map_err(|e| CardError::LayoutFailed {
        card: job.card_index,
        detail: e.to_string(),
    })?;

    let img = render::render_card(&card, &shared.fonts, &shared.layout, &shared.theme);
    let png = encode::encode_png(&img).map_err(|e| CardError::EncodeFailed {
        card: job.card_index,
        detail: e.to_string(),
    })?;

    Ok(RenderedCard {
        card_index: job.card_index,
        total_cards: job.total_cards,
        role: job.role.clone(),
        text: job.text.clone(),
        width: img.width(),
        height: img.height(),
        png,
        degraded_fonts: shared.fonts.is_degraded(),
        line_count: card.lines.len(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Reply;

    #[test]
    fn jobs_fill_placeholders() {
        let script = Script {
            replies: vec![Reply::new("Я", "раз"), Reply::default()],
            ..Default::default()
        };
        let jobs = card_jobs(&script).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].role, "Реплика 2");
        assert_eq!(jobs[1].text, "");
        assert!(jobs.iter().all(|j| j.total_cards == 2));
        assert_eq!(jobs[0].card_index, 1);
    }

    #[test]
    fn empty_script_is_rejected() {
        assert!(matches!(
            card_jobs(&Script::default()),
            Err(DeckError::EmptyScript)
        ));
    }

    #[derive(Default)]
    struct ErrorLog {
        errors: std::sync::Mutex<Vec<usize>>,
        completed: std::sync::atomic::AtomicUsize,
    }

    impl crate::progress::DeckProgressCallback for ErrorLog {
        fn on_card_complete(&self, _card: usize, _total: usize, _png_len: usize) {
            self.completed
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }

        fn on_card_error(&self, card: usize, _total: usize, _error: &str) {
            self.errors.lock().unwrap().push(card);
        }
    }

    fn shared(layout: CardLayout) -> Arc<SharedRender> {
        Arc::new(SharedRender {
            fonts: FontBook::load(&FontConfig::builtin(), &layout.font_keys()),
            layout,
            theme: Theme::default(),
        })
    }

    fn job(card_index: usize, text: &str) -> CardJob {
        CardJob {
            card_index,
            total_cards: 2,
            role: "Я".into(),
            text: text.into(),
        }
    }

    #[tokio::test]
    async fn failing_card_does_not_affect_its_sibling() {
        let broken = shared(CardLayout {
            padding: 600,
            ..CardLayout::default()
        });
        let healthy = shared(CardLayout::default());
        let log = Arc::new(ErrorLog::default());
        let callback: ProgressCallback = log.clone();

        let jobs = vec![(job(1, "Раз, два."), broken), (job(2, "Три."), healthy)];
        let mut results: Vec<Result<RenderedCard, CardError>> =
            stream::iter(jobs.into_iter().map(|(job, shared)| {
                render_job(job, shared, Some(callback.clone()))
            }))
            .buffer_unordered(2)
            .collect()
            .await;
        results.sort_by_key(|r| match r {
            Ok(card) => card.card_index,
            Err(e) => e.card(),
        });

        assert!(matches!(
            results[0],
            Err(CardError::LayoutFailed { card: 1, .. })
        ));
        let sibling = results[1].as_ref().expect("sibling renders");
        assert_eq!(sibling.card_index, 2);
        assert!(!sibling.png.is_empty());

        assert_eq!(*log.errors.lock().unwrap(), vec![1]);
        assert_eq!(log.completed.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory where the card should go makes the rename fail.
        let blocker = dir.path().join("Тема_01_Я.png");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let deck = DeckOutput {
            id: "post_1".into(),
            theme: "Тема".into(),
            cta: None,
            tags: Vec::new(),
            cards: vec![RenderedCard {
                card_index: 1,
                total_cards: 1,
                role: "Я".into(),
                text: String::new(),
                width: 1,
                height: 1,
                png: vec![1, 2, 3],
                degraded_fonts: false,
                line_count: 0,
                duration_ms: 0,
            }],
            failures: Vec::new(),
            stats: DeckStats::default(),
        };

        let err = write_deck_to_dir(&deck, dir.path()).await.unwrap_err();
        assert!(matches!(err, DeckError::OutputWriteFailed { .. }));
        assert!(!dir.path().join("Тема_01_Я.png.tmp").exists());
    }

    #[test]
    fn blocking_render_marks_builtin_fonts_as_not_degraded() {
        let layout = CardLayout::default();
        let shared = SharedRender {
            fonts: FontBook::load(&FontConfig::builtin(), &layout.font_keys()),
            layout,
            theme: Theme::default(),
        };
        let job = CardJob {
            card_index: 1,
            total_cards: 1,
            role: "Я".into(),
            text: "**ВСЁ** пропало".into(),
        };
        let card = render_blocking(&job, &shared).unwrap();
        assert!(!card.degraded_fonts);
        assert_eq!(card.line_count, 1);
        assert_eq!((card.width, card.height), (1080, 1080));
        assert!(!card.png.is_empty());
    }
}
