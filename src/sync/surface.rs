//! Abstract display surface for rendered subtitles.
//!
//! The engine treats the display as an ordered, mutable run of styled
//! characters addressed by character offset. A GUI text widget, a terminal
//! renderer or the in-memory [`TextSurface`] can all sit behind
//! [`DisplaySurface`].

/// Color family for a speaker's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerTone {
    /// Speaker "A".
    Primary,
    /// Every other speaker.
    Secondary,
}

impl SpeakerTone {
    pub fn for_speaker(speaker: &str) -> Self {
        if speaker == "A" {
            SpeakerTone::Primary
        } else {
            SpeakerTone::Secondary
        }
    }
}

/// Foreground style of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    /// The `"A: "` label.
    Speaker(SpeakerTone),
    /// Original words and the spaces between them.
    Content(SpeakerTone),
    /// Translated text.
    Translation,
    /// Paragraph breaks.
    Plain,
}

/// Highlight state of a character range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Transparent,
    /// The active utterance.
    Utterance,
    /// The active word, drawn over the utterance highlight.
    Word,
}

/// A mutable styled text document.
///
/// Offsets count characters. Ranges past the end are clamped.
pub trait DisplaySurface {
    /// Number of characters in the document.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all text.
    fn clear(&mut self);

    /// Insert styled text at `offset`.
    fn insert(&mut self, offset: usize, text: &str, style: TextStyle);

    /// Replace `[start, end)` with styled text.
    ///
    /// The new text keeps the background of the replaced range, or of the
    /// preceding character when the range is empty.
    fn replace(&mut self, start: usize, end: usize, text: &str, style: TextStyle);

    /// Set the background of `[start, end)`.
    fn set_background(&mut self, start: usize, end: usize, background: Background);

    /// Make every background transparent.
    fn clear_backgrounds(&mut self);

    /// Bring the text at `offset` into view, centered.
    fn scroll_to(&mut self, offset: usize);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    style: TextStyle,
    background: Background,
}

/// In-memory [`DisplaySurface`].
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    cells: Vec<Cell>,
    scroll_position: Option<usize>,
    scroll_calls: usize,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole document as a string.
    pub fn text(&self) -> String {
        self.cells.iter().map(|c| c.ch).collect()
    }

    /// Characters in `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> String {
        let (start, end) = self.clamp_range(start, end);
        self.cells[start..end].iter().map(|c| c.ch).collect()
    }

    pub fn background_at(&self, offset: usize) -> Option<Background> {
        self.cells.get(offset).map(|c| c.background)
    }

    pub fn style_at(&self, offset: usize) -> Option<TextStyle> {
        self.cells.get(offset).map(|c| c.style)
    }

    /// Whether every character in `[start, end)` has the given background.
    pub fn range_has_background(&self, start: usize, end: usize, background: Background) -> bool {
        let (start, end) = self.clamp_range(start, end);
        self.cells[start..end].iter().all(|c| c.background == background)
    }

    /// Contiguous runs of `(background, text)`, skipping nothing.
    pub fn background_runs(&self) -> Vec<(Background, String)> {
        let mut runs: Vec<(Background, String)> = Vec::new();
        for cell in &self.cells {
            match runs.last_mut() {
                Some((bg, text)) if *bg == cell.background => text.push(cell.ch),
                _ => runs.push((cell.background, cell.ch.to_string())),
            }
        }
        runs
    }

    /// Offset of the last scroll request.
    pub fn scroll_position(&self) -> Option<usize> {
        self.scroll_position
    }

    /// How many times [`DisplaySurface::scroll_to`] has been called.
    pub fn scroll_calls(&self) -> usize {
        self.scroll_calls
    }

    fn clamp_range(&self, start: usize, end: usize) -> (usize, usize) {
        let len = self.cells.len();
        let start = start.min(len);
        (start, end.clamp(start, len))
    }

    fn cells_for(text: &str, style: TextStyle) -> impl Iterator<Item = Cell> + '_ {
        text.chars().map(move |ch| Cell {
            ch,
            style,
            background: Background::Transparent,
        })
    }
}

impl DisplaySurface for TextSurface {
    fn len(&self) -> usize {
        self.cells.len()
    }

    fn clear(&mut self) {
        self.cells.clear();
        self.scroll_position = None;
    }

    fn insert(&mut self, offset: usize, text: &str, style: TextStyle) {
        let offset = offset.min(self.cells.len());
        self.cells
            .splice(offset..offset, Self::cells_for(text, style));
    }

    fn replace(&mut self, start: usize, end: usize, text: &str, style: TextStyle) {
        let (start, end) = self.clamp_range(start, end);
        let background = self
            .cells
            .get(start)
            .filter(|_| start < end)
            .or_else(|| start.checked_sub(1).and_then(|i| self.cells.get(i)))
            .map(|c| c.background)
            .unwrap_or_default();
        self.cells.splice(
            start..end,
            Self::cells_for(text, style).map(|cell| Cell { background, ..cell }),
        );
    }

    fn set_background(&mut self, start: usize, end: usize, background: Background) {
        let (start, end) = self.clamp_range(start, end);
        for cell in &mut self.cells[start..end] {
            cell.background = background;
        }
    }

    fn clear_backgrounds(&mut self) {
        for cell in &mut self.cells {
            cell.background = Background::Transparent;
        }
    }

    fn scroll_to(&mut self, offset: usize) {
        self.scroll_position = Some(offset.min(self.cells.len()));
        self.scroll_calls += 1;
    }
}
