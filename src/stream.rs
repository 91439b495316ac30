//! Streaming API: emit cards as they finish.
//!
//! Unlike the eager [`crate::deck::render_deck`], which returns only after
//! every card is done, [`render_stream`] yields each card as soon as its
//! render task completes. Cards arrive in completion order; sort by
//! `card_index` if order matters. Dropping the stream stops scheduling new
//! cards.

use crate::config::DeckConfig;
use crate::deck::{card_jobs, load_shared, render_job};
use crate::error::{CardError, DeckError};
use crate::output::RenderedCard;
use crate::script::Script;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of card results.
pub type CardStream = Pin<Box<dyn Stream<Item = Result<RenderedCard, CardError>> + Send>>;

/// Render a deck, streaming cards as they are ready.
///
/// `on_deck_start` fires before the stream is returned; `on_deck_complete`
/// is not called because the stream may be dropped early.
///
/// # Returns
/// - `Ok(CardStream)`: one `Result` per reply
/// - `Err(DeckError)`: the script is empty or the layout is invalid
pub async fn render_stream(script: &Script, config: &DeckConfig) -> Result<CardStream, DeckError> {
    let jobs = card_jobs(script)?;
    info!("Starting streaming render: {} cards", jobs.len());

    let shared = load_shared(config).await?;
    let callback = config.progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_deck_start(jobs.len());
    }

    let s = stream::iter(jobs.into_iter().map(move |job| {
        render_job(job, Arc::clone(&shared), callback.clone())
    }))
    .buffer_unordered(config.concurrency.max(1));

    Ok(Box::pin(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontConfig;
    use crate::script::Reply;

    fn builtin_config() -> DeckConfig {
        DeckConfig::builder()
            .fonts(FontConfig::builtin())
            .concurrency(2)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn streams_one_result_per_reply() {
        let script = Script {
            replies: vec![
                Reply::new("Я", "раз"),
                Reply::new("СОСЕД", "два"),
                Reply::new("ФИНАЛ", "**три**"),
            ],
            ..Default::default()
        };
        let mut stream = render_stream(&script, &builtin_config()).await.unwrap();
        let mut indices = Vec::new();
        while let Some(result) = stream.next().await {
            indices.push(result.unwrap().card_index);
        }
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_script_fails_before_streaming() {
        let result = render_stream(&Script::default(), &builtin_config()).await;
        assert!(matches!(result, Err(DeckError::EmptyScript)));
    }
}
