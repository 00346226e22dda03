//! JSON chapter files as produced by the content provider.
//!
//! ```json
//! {
//!   "id": 112,
//!   "name": "Al-Ikhlas",
//!   "verses": [
//!     { "number": 1, "translation": "Say, He is Allah, the One.",
//!       "audio": { "number": 6222, "url": "https://…/6222.mp3" } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::model::{AudioLocator, Chapter, ChapterError, VerseRef};

#[derive(Debug, Deserialize)]
struct ChapterFile {
    id: u32,
    #[serde(default)]
    name: Option<String>,
    verses: Vec<VerseEntry>,
}

#[derive(Debug, Deserialize)]
struct VerseEntry {
    number: u32,
    #[serde(default)]
    translation: Option<String>,
    audio: AudioLocator,
}

impl Chapter {
    /// Parse a chapter from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, ChapterError> {
        let file: ChapterFile = serde_json::from_str(json)?;
        let id = file.id;

        let verses = file
            .verses
            .into_iter()
            .map(|v| VerseRef::new(id, v.number, v.audio, v.translation))
            .collect();

        let chapter = Chapter::new(id, verses)?;
        Ok(match file.name {
            Some(name) => chapter.with_name(name),
            None => chapter,
        })
    }

    /// Load a chapter JSON file from disk.
    pub fn load_from(path: &Path) -> Result<Self, ChapterError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const IKHLAS: &str = r#"{
        "id": 112,
        "name": "Al-Ikhlas",
        "verses": [
            { "number": 1, "translation": "Say, He is Allah, the One.",
              "audio": { "number": 6222, "url": "https://example.org/6222.mp3" } },
            { "number": 2, "translation": "Allah, the Eternal Refuge.",
              "audio": { "number": 6223 } },
            { "number": 3, "audio": { "number": 6224 } },
            { "number": 4, "translation": "", "audio": { "number": 6225 } }
        ]
    }"#;

    #[test]
    fn parses_verses_in_order() {
        let chapter = Chapter::from_json(IKHLAS).unwrap();
        assert_eq!(chapter.id(), 112);
        assert_eq!(chapter.name(), Some("Al-Ikhlas"));
        assert_eq!(chapter.len(), 4);

        let first = &chapter.verses()[0];
        assert_eq!(first.chapter_id(), 112);
        assert_eq!(first.audio().number, 6222);
        assert_eq!(first.audio().url.as_deref(), Some("https://example.org/6222.mp3"));
        assert_eq!(first.translation(), Some("Say, He is Allah, the One."));

        assert_eq!(chapter.verses()[2].translation(), None);
        assert_eq!(chapter.verses()[3].translation(), None);
    }

    #[test]
    fn empty_verse_list_is_rejected() {
        let err = Chapter::from_json(r#"{ "id": 5, "verses": [] }"#).unwrap_err();
        assert!(matches!(err, ChapterError::Empty(5)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = Chapter::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ChapterError::Parse(_)));
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("112.json");
        std::fs::write(&path, IKHLAS).expect("write");

        let chapter = Chapter::load_from(&path).expect("load");
        assert_eq!(chapter.position_of(3), Some(2));
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let dir = tempdir().expect("temp dir");
        let err = Chapter::load_from(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ChapterError::Io(_)));
    }
}
