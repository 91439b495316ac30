//! Card rendering: role label, separator, paragraph and footer on a fixed canvas.
//!
//! Rendering is split in two. [`plan_card`] computes where every piece of
//! text goes; [`paint`] draws a plan onto a fresh [`RgbImage`]. The split
//! keeps positions testable without inspecting pixels.
//!
//! ## Vertical layout
//!
//! ```text
//!  padding            ─┐
//!  ROLE (bold, centred) │ role ink height + role_gap
//!  ──── separator ────  │ separator_gap
//!  line 1               │ body ink height of "Ay" + line_spacing
//!  line 2               │ …
//!        3/7           at height - padding
//! ```
//!
//! Text is positioned by the top of its line box; the baseline sits one
//! ascent below. Anything that runs past the canvas is clipped.

use crate::config::{CardLayout, Color, Theme};
use crate::error::DeckError;
use crate::fonts::{Face, FontBook, Weight};
use crate::pipeline::linebreak::{self, Line};
use crate::pipeline::markup::{self, Style};
use crate::pipeline::normalize;
use crate::pipeline::segment;
use image::{Rgb, RgbImage};
use tracing::debug;

/// Probe string whose ink height sets the paragraph line advance.
pub const LINE_PROBE: &str = "Ay";

/// Lone punctuation that sticks to a preceding emphasised word.
const STICKY_PUNCTUATION: &[&str] = &[".", ",", "!", ":", ";"];

/// One reply, laid out and ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub role: String,
    pub lines: Vec<Line>,
    /// 1-based position in the deck.
    pub card_index: usize,
    pub total_cards: usize,
}

/// Run the text pipeline on one reply: normalise, parse markup, segment and
/// break into lines that fit the layout's content width.
pub fn layout_card(
    role: &str,
    text: &str,
    card_index: usize,
    total_cards: usize,
    fonts: &FontBook,
    layout: &CardLayout,
) -> Result<Card, DeckError> {
    let normalized = normalize::normalize(text);
    let runs = markup::parse(&normalized);
    let tokens = segment::segment(&runs);

    let regular = fonts.face(Weight::Regular, layout.text_size);
    let bold = fonts.face(Weight::Bold, layout.text_size);
    let lines = linebreak::break_lines(&tokens, layout.max_content_width(), |text, style| {
        body_face(style, &regular, &bold).measure(text)
    })?;

    debug!(
        "Card {}/{}: {} runs, {} tokens, {} lines",
        card_index,
        total_cards,
        runs.len(),
        tokens.len(),
        lines.len()
    );

    Ok(Card {
        role: role.to_string(),
        lines,
        card_index,
        total_cards,
    })
}

/// Italic has no face of its own.
fn body_face<'a>(style: Style, regular: &'a Face, bold: &'a Face) -> &'a Face {
    match style {
        Style::Bold => bold,
        Style::Normal | Style::Italic => regular,
    }
}

// ── Planning ─────────────────────────────────────────────────────────────

/// A string drawn at a fixed position with one face.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    pub style: Style,
    pub weight: Weight,
    pub size: u32,
    /// Left edge of the pen.
    pub x: f32,
    /// Top of the line box.
    pub top: f32,
    pub color: Color,
}

/// Horizontal rule between the role and the paragraph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparatorPlacement {
    pub x0: u32,
    pub x1: u32,
    /// Centre row.
    pub y: f32,
    pub thickness: u32,
    pub color: Color,
}

/// Every draw operation for one card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardPlan {
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub role: TextPlacement,
    pub separator: SeparatorPlacement,
    /// One entry per paragraph line, words left to right.
    pub lines: Vec<Vec<TextPlacement>>,
    pub footer: TextPlacement,
}

/// Compute positions for every element of `card`.
pub fn plan_card(card: &Card, fonts: &FontBook, layout: &CardLayout, theme: &Theme) -> CardPlan {
    let canvas_width = layout.width as f32;
    let centred = |w: f32| ((canvas_width - w) / 2.0).floor();

    let role_face = fonts.face(Weight::Bold, layout.role_size);
    let regular = fonts.face(Weight::Regular, layout.text_size);
    let bold = fonts.face(Weight::Bold, layout.text_size);
    let counter_face = fonts.face(Weight::Regular, layout.counter_size);

    let mut y = layout.padding as f32;

    let role = TextPlacement {
        text: card.role.clone(),
        style: Style::Bold,
        weight: Weight::Bold,
        size: layout.role_size,
        x: centred(role_face.measure(&card.role)),
        top: y,
        color: theme.role,
    };
    y += role_face.ink_bounds(&card.role).height() + layout.role_gap as f32;

    let separator = SeparatorPlacement {
        x0: layout.separator_margin,
        x1: layout.width.saturating_sub(layout.separator_margin),
        y,
        thickness: layout.separator_thickness,
        color: theme.accent,
    };
    y += layout.separator_gap as f32;

    let advance = regular.ink_bounds(LINE_PROBE).height() + layout.line_spacing as f32;
    let mut lines = Vec::with_capacity(card.lines.len());
    for line in &card.lines {
        // Centred on the joined line in the body face, whatever the word styles.
        let mut x = centred(regular.measure(&line.text()));
        let mut placed = Vec::with_capacity(line.len());

        for (idx, word) in line.words.iter().enumerate() {
            let face = body_face(word.style, &regular, &bold);
            placed.push(TextPlacement {
                text: word.text.clone(),
                style: word.style,
                weight: weight_for(word.style),
                size: layout.text_size,
                x,
                top: y,
                color: theme.text,
            });
            x += face.measure(&word.text);

            if let Some(next) = line.words.get(idx + 1) {
                let sticky = word.style.is_emphasis() && STICKY_PUNCTUATION.contains(&next.text.as_str());
                if !sticky {
                    x += face.measure(" ");
                }
            }
        }

        lines.push(placed);
        y += advance;
    }

    let counter = format!("{}/{}", card.card_index, card.total_cards);
    let footer = TextPlacement {
        x: centred(counter_face.measure(&counter)),
        text: counter,
        style: Style::Normal,
        weight: Weight::Regular,
        size: layout.counter_size,
        top: layout.height.saturating_sub(layout.padding) as f32,
        color: theme.accent,
    };

    CardPlan {
        width: layout.width,
        height: layout.height,
        background: theme.background,
        role,
        separator,
        lines,
        footer,
    }
}

fn weight_for(style: Style) -> Weight {
    match style {
        Style::Bold => Weight::Bold,
        Style::Normal | Style::Italic => Weight::Regular,
    }
}

// ── Painting ─────────────────────────────────────────────────────────────

/// Draw a plan onto a new canvas.
pub fn paint(plan: &CardPlan, fonts: &FontBook) -> RgbImage {
    let mut img = RgbImage::from_pixel(plan.width, plan.height, plan.background.into());

    draw_text(&mut img, fonts, &plan.role);
    draw_separator(&mut img, &plan.separator);
    for placement in plan.lines.iter().flatten() {
        draw_text(&mut img, fonts, placement);
    }
    draw_text(&mut img, fonts, &plan.footer);

    img
}

/// Plan and paint a laid-out card.
pub fn render_card(card: &Card, fonts: &FontBook, layout: &CardLayout, theme: &Theme) -> RgbImage {
    let plan = plan_card(card, fonts, layout, theme);
    paint(&plan, fonts)
}

fn draw_separator(img: &mut RgbImage, sep: &SeparatorPlacement) {
    let top = sep.y.round() as i64 - (sep.thickness / 2) as i64;
    for row in top..top + sep.thickness as i64 {
        if row < 0 || row >= img.height() as i64 {
            continue;
        }
        for x in sep.x0..=sep.x1.min(img.width().saturating_sub(1)) {
            img.put_pixel(x, row as u32, sep.color.into());
        }
    }
}

fn draw_text(img: &mut RgbImage, fonts: &FontBook, placement: &TextPlacement) {
    let face = fonts.face(placement.weight, placement.size);
    let baseline = placement.top + face.ascent();
    let mut pen = placement.x;
    let mut prev: Option<char> = None;

    for c in placement.text.chars() {
        if let Some(p) = prev {
            pen += face.kern(p, c);
        }
        let glyph = face.rasterize(c);
        let left = pen.round() as i64 + glyph.xmin as i64;
        let top = (baseline - (glyph.ymin + glyph.height as i32) as f32).round() as i64;

        for gy in 0..glyph.height {
            for gx in 0..glyph.width {
                let alpha = glyph.coverage[gy * glyph.width + gx];
                if alpha == 0 {
                    continue;
                }
                blend(img, left + gx as i64, top + gy as i64, placement.color, alpha);
            }
        }

        pen += glyph.advance;
        prev = Some(c);
    }
}

fn blend(img: &mut RgbImage, x: i64, y: i64, color: Color, alpha: u8) {
    if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    let a = alpha as u16;
    let Rgb(dst) = *px;
    let mix = |src: u8, dst: u8| ((src as u16 * a + dst as u16 * (255 - a) + 127) / 255) as u8;
    *px = Rgb([
        mix(color.0[0], dst[0]),
        mix(color.0[1], dst[1]),
        mix(color.0[2], dst[2]),
    ]);
}
