//! Font faces and the `(weight, size) → face` lookup used by the renderer.
//!
//! Outline fonts are parsed once per weight with `fontdue` and shared through
//! `Arc`, so a [`FontBook`] can be handed to every card task without locking.
//! Faces can come from a file, from bytes the caller already holds, or from
//! the system font database (`fontdb`).
//!
//! ## Degraded rendering
//!
//! A face that cannot be loaded is replaced by the built-in face: heuristic
//! proportional advances and solid boxes for glyphs. Layout stays stable and
//! every card still renders; the substitution is logged and counted so the
//! caller can tell the output is not typographically faithful.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Family looked up in the system font database by default.
pub const DEFAULT_FAMILY: &str = "DejaVu Sans";

/// Font weight. Italic text is drawn with the regular face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weight {
    Regular,
    Bold,
}

impl From<Weight> for fontdb::Weight {
    fn from(w: Weight) -> Self {
        match w {
            Weight::Regular => fontdb::Weight::NORMAL,
            Weight::Bold => fontdb::Weight::BOLD,
        }
    }
}

/// Where the bytes of a face come from.
#[derive(Clone)]
pub enum FontSource {
    /// Query the system font database by family name.
    System { family: String },
    /// A TTF/OTF file on disk.
    File(PathBuf),
    /// Font bytes already in memory.
    Bytes(Arc<Vec<u8>>),
    /// The built-in fallback face. Chosen explicitly, so not "degraded".
    Builtin,
}

impl std::fmt::Debug for FontSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontSource::System { family } => f.debug_struct("System").field("family", family).finish(),
            FontSource::File(path) => f.debug_tuple("File").field(path).finish(),
            FontSource::Bytes(data) => write!(f, "Bytes(<{} bytes>)", data.len()),
            FontSource::Builtin => f.write_str("Builtin"),
        }
    }
}

impl Default for FontSource {
    fn default() -> Self {
        FontSource::System {
            family: DEFAULT_FAMILY.to_string(),
        }
    }
}

/// Sources for the two weights the cards use.
#[derive(Debug, Clone, Default)]
pub struct FontConfig {
    pub regular: FontSource,
    pub bold: FontSource,
}

impl FontConfig {
    /// Both weights use the built-in face; handy for tests and headless CI.
    pub fn builtin() -> Self {
        Self {
            regular: FontSource::Builtin,
            bold: FontSource::Builtin,
        }
    }

    fn source(&self, weight: Weight) -> &FontSource {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

// ── Faces ────────────────────────────────────────────────────────────────

/// Placement and coverage of one rasterised glyph.
///
/// `xmin`/`ymin` are offsets of the bitmap's bottom-left corner from the pen
/// position on the baseline, y pointing up.
#[derive(Debug, Clone)]
pub struct Glyph {
    pub xmin: i32,
    pub ymin: i32,
    pub width: usize,
    pub height: usize,
    pub advance: f32,
    /// Row-major coverage, top row first, `width * height` bytes.
    pub coverage: Vec<u8>,
}

/// Vertical ink extent of a string relative to the baseline (y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkBounds {
    pub top: f32,
    pub bottom: f32,
}

impl InkBounds {
    pub fn height(&self) -> f32 {
        (self.top - self.bottom).max(0.0)
    }
}

#[derive(Clone)]
enum FaceKind {
    Outline(Arc<fontdue::Font>),
    Builtin,
}

/// A font at one pixel size.
#[derive(Clone)]
pub struct Face {
    kind: FaceKind,
    size: f32,
}

impl std::fmt::Debug for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Face")
            .field("builtin", &self.is_builtin())
            .field("size", &self.size)
            .finish()
    }
}

impl Face {
    /// The built-in face at `size` px.
    pub fn builtin(size: f32) -> Self {
        Self {
            kind: FaceKind::Builtin,
            size,
        }
    }

    fn outline(font: Arc<fontdue::Font>, size: f32) -> Self {
        Self {
            kind: FaceKind::Outline(font),
            size,
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.kind, FaceKind::Builtin)
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascent(&self) -> f32 {
        match &self.kind {
            FaceKind::Outline(font) => font
                .horizontal_line_metrics(self.size)
                .map(|m| m.ascent)
                .unwrap_or(self.size * 0.8),
            FaceKind::Builtin => self.size * 0.8,
        }
    }

    /// Horizontal advance of `text`, including kerning.
    pub fn measure(&self, text: &str) -> f32 {
        let mut width = 0.0;
        let mut prev: Option<char> = None;
        for c in text.chars() {
            if let Some(p) = prev {
                width += self.kern(p, c);
            }
            width += self.glyph_box(c).advance;
            prev = Some(c);
        }
        width
    }

    /// Vertical ink extent of `text`; zero-height for blank strings.
    pub fn ink_bounds(&self, text: &str) -> InkBounds {
        let mut bounds: Option<InkBounds> = None;
        for c in text.chars() {
            let g = self.glyph_box(c);
            if g.width == 0 || g.height == 0 {
                continue;
            }
            let top = (g.ymin + g.height as i32) as f32;
            let bottom = g.ymin as f32;
            bounds = Some(match bounds {
                None => InkBounds { top, bottom },
                Some(b) => InkBounds {
                    top: b.top.max(top),
                    bottom: b.bottom.min(bottom),
                },
            });
        }
        bounds.unwrap_or(InkBounds {
            top: 0.0,
            bottom: 0.0,
        })
    }

    /// Kerning adjustment between two adjacent characters.
    pub fn kern(&self, left: char, right: char) -> f32 {
        match &self.kind {
            FaceKind::Outline(font) => font.horizontal_kern(left, right, self.size).unwrap_or(0.0),
            FaceKind::Builtin => 0.0,
        }
    }

    /// Rasterise one character.
    pub fn rasterize(&self, c: char) -> Glyph {
        match &self.kind {
            FaceKind::Outline(font) => {
                let (m, coverage) = font.rasterize(c, self.size);
                Glyph {
                    xmin: m.xmin,
                    ymin: m.ymin,
                    width: m.width,
                    height: m.height,
                    advance: m.advance_width,
                    coverage,
                }
            }
            FaceKind::Builtin => {
                let mut g = builtin_glyph(c, self.size);
                g.coverage = vec![255; g.width * g.height];
                g
            }
        }
    }

    /// Metrics only, no coverage.
    fn glyph_box(&self, c: char) -> Glyph {
        match &self.kind {
            FaceKind::Outline(font) => {
                let m = font.metrics(c, self.size);
                Glyph {
                    xmin: m.xmin,
                    ymin: m.ymin,
                    width: m.width,
                    height: m.height,
                    advance: m.advance_width,
                    coverage: Vec::new(),
                }
            }
            FaceKind::Builtin => builtin_glyph(c, self.size),
        }
    }
}

/// Box glyph for the built-in face, without coverage.
fn builtin_glyph(c: char, size: f32) -> Glyph {
    let advance = builtin_em_width(c) * size;
    if c.is_whitespace() {
        return Glyph {
            xmin: 0,
            ymin: 0,
            width: 0,
            height: 0,
            advance,
            coverage: Vec::new(),
        };
    }
    let width = (advance * 0.7).round().max(1.0) as usize;
    let height = (size * 0.7).round().max(1.0) as usize;
    Glyph {
        xmin: (advance * 0.15).round() as i32,
        ymin: 0,
        width,
        height,
        advance,
        coverage: Vec::new(),
    }
}

/// Proportional advance in em for the built-in face.
fn builtin_em_width(ch: char) -> f32 {
    match ch {
        ' ' | '\u{00A0}' => 0.32,
        '\t' => 1.28,
        'i' | 'l' | 'I' | '|' | '!' => 0.24,
        '.' | ',' | ':' | ';' | '\'' | '"' | '`' => 0.23,
        '-' | '\u{2010}'..='\u{2014}' => 0.34,
        '(' | ')' | '[' | ']' | '{' | '}' => 0.30,
        'f' | 't' | 'j' | 'r' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' | '&' | '#' | 'ж' | 'ш' | 'щ' | 'Ж' | 'Ш' | 'Щ' | 'Ю' | 'ю' => 0.74,
        c if c.is_ascii_digit() => 0.52,
        c if c.is_uppercase() => 0.64,
        c if c.is_lowercase() => 0.52,
        c if c.is_whitespace() => 0.32,
        c if c.is_ascii_punctuation() => 0.42,
        _ => 0.56,
    }
}

// ── Font book ────────────────────────────────────────────────────────────

/// Read-only `(weight, size) → face` table shared by every card of a deck.
#[derive(Debug, Clone, Default)]
pub struct FontBook {
    faces: HashMap<(Weight, u32), Face>,
    fallbacks: usize,
}

impl FontBook {
    /// Load every requested `(weight, size)` pair from `config`.
    ///
    /// Each weight's font is parsed once. A weight that fails to load falls
    /// back to the built-in face for all of its sizes; this is counted in
    /// [`FontBook::fallback_count`] and logged, never returned as an error.
    pub fn load(config: &FontConfig, keys: &[(Weight, u32)]) -> Self {
        let mut system_db: Option<fontdb::Database> = None;
        let mut loaded: HashMap<Weight, Option<Arc<fontdue::Font>>> = HashMap::new();
        let mut book = FontBook::default();

        for &(weight, size) in keys {
            let font = loaded
                .entry(weight)
                .or_insert_with(|| {
                    let source = config.source(weight);
                    match load_outline(source, weight, &mut system_db) {
                        Ok(font) => {
                            debug!("Loaded {:?} face from {:?}", weight, source);
                            font.map(Arc::new)
                        }
                        Err(reason) => {
                            warn!(
                                "Font {:?} ({:?}) unavailable, using built-in face: {}",
                                weight, source, reason
                            );
                            book.fallbacks += 1;
                            None
                        }
                    }
                })
                .clone();

            let face = match font {
                Some(font) => Face::outline(font, size as f32),
                None => Face::builtin(size as f32),
            };
            book.faces.insert((weight, size), face);
        }

        book
    }

    /// Face for `(weight, size)`; an unregistered key gets the built-in face.
    pub fn face(&self, weight: Weight, size: u32) -> Cow<'_, Face> {
        match self.faces.get(&(weight, size)) {
            Some(face) => Cow::Borrowed(face),
            None => {
                warn!("No face registered for {:?} {}px, using built-in face", weight, size);
                Cow::Owned(Face::builtin(size as f32))
            }
        }
    }

    /// Number of weights that had to fall back to the built-in face.
    pub fn fallback_count(&self) -> usize {
        self.fallbacks
    }

    /// True when any face was substituted.
    pub fn is_degraded(&self) -> bool {
        self.fallbacks > 0
    }
}

/// `Ok(None)` means the built-in face was requested.
fn load_outline(
    source: &FontSource,
    weight: Weight,
    system_db: &mut Option<fontdb::Database>,
) -> Result<Option<fontdue::Font>, String> {
    match source {
        FontSource::Builtin => Ok(None),
        FontSource::File(path) => {
            let data = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
            parse_font(&data, 0).map(Some)
        }
        FontSource::Bytes(data) => parse_font(data, 0).map(Some),
        FontSource::System { family } => {
            let db = system_db.get_or_insert_with(|| {
                let mut db = fontdb::Database::new();
                db.load_system_fonts();
                debug!("Loaded {} system font faces", db.len());
                db
            });
            let families = [fontdb::Family::Name(family.as_str())];
            let query = fontdb::Query {
                families: &families,
                weight: weight.into(),
                ..fontdb::Query::default()
            };
            let id = db
                .query(&query)
                .ok_or_else(|| format!("no system font matches family '{family}'"))?;
            db.with_face_data(id, |data, index| parse_font(data, index))
                .ok_or_else(|| format!("face data for '{family}' is not readable"))?
                .map(Some)
        }
    }
}

fn parse_font(data: &[u8], collection_index: u32) -> Result<fontdue::Font, String> {
    fontdue::Font::from_bytes(
        data,
        fontdue::FontSettings {
            collection_index,
            ..Default::default()
        },
    )
    .map_err(|e| e.to_string())
}
