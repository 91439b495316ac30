//! Configuration types for deck rendering.
//!
//! All rendering behaviour is controlled through [`DeckConfig`], built via
//! [`DeckConfigBuilder`]. Geometry lives in [`CardLayout`], colours in
//! [`Theme`]; both serialise to JSON so a deck's look can be stored next to
//! its script.

use crate::error::DeckError;
use crate::fonts::{FontConfig, Weight};
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Configuration for rendering a deck of cards.
///
/// # Example
/// ```rust
/// use threadcards::DeckConfig;
///
/// let config = DeckConfig::builder()
///     .concurrency(4)
///     .canvas(1080, 1350)
///     .build()
///     .unwrap();
/// assert_eq!(config.layout.max_content_width(), 760.0);
/// ```
#[derive(Clone)]
pub struct DeckConfig {
    /// Canvas size, margins and type sizes.
    pub layout: CardLayout,

    /// Colours for background, role label, body text and accents.
    pub theme: Theme,

    /// Where the regular and bold faces come from.
    pub fonts: FontConfig,

    /// Number of cards rendered at once on the blocking pool. Default: number
    /// of available CPUs.
    pub concurrency: usize,

    /// Optional observer for per-card events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            layout: CardLayout::default(),
            theme: Theme::default(),
            fonts: FontConfig::default(),
            concurrency: default_concurrency(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfig")
            .field("layout", &self.layout)
            .field("theme", &self.theme)
            .field("fonts", &self.fonts)
            .field("concurrency", &self.concurrency)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DeckProgressCallback>"),
            )
            .finish()
    }
}

impl DeckConfig {
    /// Create a new builder for `DeckConfig`.
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder {
            config: Self::default(),
        }
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for [`DeckConfig`].
#[derive(Debug)]
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl DeckConfigBuilder {
    pub fn layout(mut self, layout: CardLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Canvas width and height in pixels.
    pub fn canvas(mut self, width: u32, height: u32) -> Self {
        self.config.layout.width = width;
        self.config.layout.height = height;
        self
    }

    pub fn padding(mut self, px: u32) -> Self {
        self.config.layout.padding = px;
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.config.theme = theme;
        self
    }

    pub fn fonts(mut self, fonts: FontConfig) -> Self {
        self.config.fonts = fonts;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating geometry.
    pub fn build(self) -> Result<DeckConfig, DeckError> {
        self.config.layout.validate()?;
        if self.config.concurrency == 0 {
            return Err(DeckError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Layout ───────────────────────────────────────────────────────────────

/// Geometry of one card, in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardLayout {
    pub width: u32,
    pub height: u32,
    /// Top padding, side padding and footer inset.
    pub padding: u32,
    pub role_size: u32,
    pub text_size: u32,
    pub counter_size: u32,
    /// Gap between the role label's ink bottom and the separator.
    pub role_gap: u32,
    /// Horizontal inset of the separator from each canvas edge.
    pub separator_margin: u32,
    pub separator_thickness: u32,
    /// Gap between the separator and the first paragraph line.
    pub separator_gap: u32,
    /// Added to the body ink height to get the line advance.
    pub line_spacing: u32,
}

impl Default for CardLayout {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
            padding: 160,
            role_size: 60,
            text_size: 45,
            counter_size: 30,
            role_gap: 60,
            separator_margin: 200,
            separator_thickness: 3,
            separator_gap: 120,
            line_spacing: 20,
        }
    }
}

impl CardLayout {
    /// Width available to a paragraph line.
    pub fn max_content_width(&self) -> f32 {
        self.width as f32 - 2.0 * self.padding as f32
    }

    /// Every `(weight, size)` the renderer will ask the font book for.
    pub fn font_keys(&self) -> Vec<(Weight, u32)> {
        vec![
            (Weight::Bold, self.role_size),
            (Weight::Regular, self.text_size),
            (Weight::Bold, self.text_size),
            (Weight::Regular, self.counter_size),
        ]
    }

    pub fn validate(&self) -> Result<(), DeckError> {
        if self.width == 0 || self.height == 0 {
            return Err(DeckError::InvalidConfig(format!(
                "Canvas must be non-empty, got {}x{}",
                self.width, self.height
            )));
        }
        if self.max_content_width() <= 0.0 {
            return Err(DeckError::InvalidConfig(format!(
                "Padding {} leaves no room on a {} px wide canvas",
                self.padding, self.width
            )));
        }
        if self.padding >= self.height {
            return Err(DeckError::InvalidConfig(format!(
                "Padding {} exceeds canvas height {}",
                self.padding, self.height
            )));
        }
        if self.separator_margin.saturating_mul(2) >= self.width {
            return Err(DeckError::InvalidConfig(format!(
                "Separator margin {} leaves no separator on a {} px wide canvas",
                self.separator_margin, self.width
            )));
        }
        for (name, size) in [
            ("role", self.role_size),
            ("text", self.text_size),
            ("counter", self.counter_size),
        ] {
            if size == 0 {
                return Err(DeckError::InvalidConfig(format!("{name} font size must be > 0")));
            }
        }
        Ok(())
    }
}

// ── Colours ──────────────────────────────────────────────────────────────

/// An opaque RGB colour, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color([r, g, b])
    }
}

impl FromStr for Color {
    type Err = DeckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || DeckError::InvalidConfig(format!("Invalid colour '{s}', expected #rrggbb"));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Color([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl TryFrom<String> for Color {
    type Error = DeckError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl From<Color> for image::Rgb<u8> {
    fn from(c: Color) -> Self {
        image::Rgb(c.0)
    }
}

/// Card colours. The default is the dark navy theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: Color,
    /// Role label.
    pub role: Color,
    /// Paragraph text.
    pub text: Color,
    /// Separator and footer counter.
    pub accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::rgb(0x1a, 0x1a, 0x2e),
            role: Color::rgb(0xe9, 0x45, 0x60),
            text: Color::rgb(0xff, 0xff, 0xff),
            accent: Color::rgb(0x0f, 0x34, 0x60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_budget() {
        let layout = CardLayout::default();
        assert_eq!(layout.max_content_width(), 760.0);
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn builder_rejects_padding_wider_than_canvas() {
        let err = DeckConfig::builder().padding(540).build().unwrap_err();
        assert!(matches!(err, DeckError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_canvas() {
        assert!(DeckConfig::builder().canvas(0, 1080).build().is_err());
    }

    #[test]
    fn huge_separator_margin_is_rejected_not_overflowed() {
        let layout = CardLayout {
            separator_margin: u32::MAX,
            ..CardLayout::default()
        };
        assert!(matches!(layout.validate(), Err(DeckError::InvalidConfig(_))));
    }

    #[test]
    fn builder_clamps_concurrency() {
        let config = DeckConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn color_parses_and_prints_hex() {
        let c: Color = "#E94560".parse().unwrap();
        assert_eq!(c, Color::rgb(0xe9, 0x45, 0x60));
        assert_eq!(c.to_string(), "#e94560");
        assert_eq!("0f3460".parse::<Color>().unwrap(), Color::rgb(0x0f, 0x34, 0x60));
    }

    #[test]
    fn color_rejects_garbage() {
        assert!("#12345".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
        assert!("#ффф".parse::<Color>().is_err());
    }

    #[test]
    fn theme_round_trips_through_json() {
        let json = serde_json::to_string(&Theme::default()).unwrap();
        assert!(json.contains("\"#1a1a2e\""));
        let back: Theme = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Theme::default());
    }

    #[test]
    fn partial_layout_json_uses_defaults() {
        let layout: CardLayout = serde_json::from_str(r#"{"height": 1350}"#).unwrap();
        assert_eq!(layout.height, 1350);
        assert_eq!(layout.width, 1080);
    }
}
