//! Chapter and verse value types.
//!
//! A [`Chapter`] is handed to the playback engine fully resolved by the
//! content provider.  The engine never mutates it; it only walks the verse
//! list with a cursor.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ChapterError
// ---------------------------------------------------------------------------

/// Errors raised while building or loading a [`Chapter`].
#[derive(Debug, Error)]
pub enum ChapterError {
    /// The chapter has no verses.
    #[error("chapter {0} has no verses")]
    Empty(u32),

    /// A verse claims to belong to a different chapter.
    #[error("verse {verse} belongs to chapter {found}, expected chapter {expected}")]
    ForeignVerse { expected: u32, found: u32, verse: u32 },

    /// Verse numbers are not strictly increasing.
    #[error("verse {verse} of chapter {chapter} is out of order")]
    OutOfOrder { chapter: u32, verse: u32 },

    /// The chapter file could not be read.
    #[error("failed to read chapter file: {0}")]
    Io(#[from] std::io::Error),

    /// The chapter JSON could not be parsed.
    #[error("failed to parse chapter JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// AudioLocator
// ---------------------------------------------------------------------------

/// Where a verse's recitation audio can be found.
///
/// `number` is the verse's absolute position across the whole scripture
/// (1-based), which most recitation mirrors use as their file name.  `url` is
/// the direct link supplied by the content provider, when it has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioLocator {
    pub number: u32,
    #[serde(default)]
    pub url: Option<String>,
}

impl AudioLocator {
    pub fn new(number: u32) -> Self {
        Self { number, url: None }
    }

    pub fn with_url(number: u32, url: impl Into<String>) -> Self {
        Self {
            number,
            url: Some(url.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// VerseRef
// ---------------------------------------------------------------------------

/// A single verse: identity, recitation locator and optional translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerseRef {
    chapter_id: u32,
    number: u32,
    audio: AudioLocator,
    translation: Option<String>,
}

impl VerseRef {
    pub fn new(
        chapter_id: u32,
        number: u32,
        audio: AudioLocator,
        translation: Option<String>,
    ) -> Self {
        Self {
            chapter_id,
            number,
            audio,
            translation,
        }
    }

    pub fn chapter_id(&self) -> u32 {
        self.chapter_id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn audio(&self) -> &AudioLocator {
        &self.audio
    }

    /// The translation text, or `None` when absent or blank.
    ///
    /// Whitespace-only translations are treated as absent so the engine never
    /// enters the translation stage with nothing to say.
    pub fn translation(&self) -> Option<&str> {
        self.translation
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Chapter
// ---------------------------------------------------------------------------

/// An ordered, non-empty list of verses.
///
/// Construction through [`Chapter::new`] validates the ordering invariants.
/// [`Chapter::new_unchecked`] exists for content that arrives already
/// validated; the engine still rejects an empty chapter at play time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    id: u32,
    name: Option<String>,
    verses: Vec<VerseRef>,
}

impl Chapter {
    /// Build a chapter, checking that it is non-empty, that every verse
    /// belongs to it and that verse numbers strictly increase.
    pub fn new(id: u32, verses: Vec<VerseRef>) -> Result<Self, ChapterError> {
        if verses.is_empty() {
            return Err(ChapterError::Empty(id));
        }

        let mut previous: Option<u32> = None;
        for verse in &verses {
            if verse.chapter_id != id {
                return Err(ChapterError::ForeignVerse {
                    expected: id,
                    found: verse.chapter_id,
                    verse: verse.number,
                });
            }
            if previous.is_some_and(|p| verse.number <= p) {
                return Err(ChapterError::OutOfOrder {
                    chapter: id,
                    verse: verse.number,
                });
            }
            previous = Some(verse.number);
        }

        Ok(Self {
            id,
            name: None,
            verses,
        })
    }

    /// Build a chapter without validation.
    pub fn new_unchecked(id: u32, verses: Vec<VerseRef>) -> Self {
        Self {
            id,
            name: None,
            verses,
        }
    }

    /// Attach a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn verses(&self) -> &[VerseRef] {
        &self.verses
    }

    pub fn len(&self) -> usize {
        self.verses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verses.is_empty()
    }

    /// Cursor position of the verse numbered `number`, if present.
    pub fn position_of(&self, number: u32) -> Option<usize> {
        self.verses.iter().position(|v| v.number == number)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
