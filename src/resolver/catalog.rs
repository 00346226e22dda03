//! Reciter catalog: mirror URL templates per reciter.
//!
//! Templates may contain the following tokens, expanded per verse:
//!
//! | Token          | Value                                          |
//! |----------------|------------------------------------------------|
//! | `{chapter}`    | chapter number                                 |
//! | `{verse}`      | verse number within the chapter                |
//! | `{chapter:03}` | chapter number, zero-padded to three digits    |
//! | `{verse:03}`   | verse number, zero-padded to three digits      |
//! | `{number}`     | absolute verse number across the scripture     |

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chapter::VerseRef;
use crate::config::{ReciterConfig, ResolverConfig};

// ---------------------------------------------------------------------------
// ReciterId
// ---------------------------------------------------------------------------

/// Opaque reciter identifier (e.g. `"ar.alafasy"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReciterId(String);

impl ReciterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReciterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for ReciterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// CatalogError
// ---------------------------------------------------------------------------

/// Errors raised when a catalog violates its invariants.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("default reciter '{0}' is not in the catalog")]
    MissingDefault(String),

    #[error("reciter '{0}' has no mirrors")]
    NoMirrors(String),

    #[error("reciter '{0}' is listed more than once")]
    Duplicate(String),
}

// ---------------------------------------------------------------------------
// Reciter
// ---------------------------------------------------------------------------

/// One reciter and its mirrors in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reciter {
    pub id: ReciterId,
    pub name: String,
    pub mirrors: Vec<String>,
}

impl From<&ReciterConfig> for Reciter {
    fn from(config: &ReciterConfig) -> Self {
        Self {
            id: ReciterId::new(config.id.clone()),
            name: config.name.clone(),
            mirrors: config.mirrors.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReciterCatalog
// ---------------------------------------------------------------------------

/// The set of known reciters plus the default used for unknown ids.
///
/// Invariant: the default reciter is present and every reciter has at least
/// one mirror, so [`candidates`](Self::candidates) is never empty.
#[derive(Debug, Clone)]
pub struct ReciterCatalog {
    default: ReciterId,
    reciters: Vec<Reciter>,
}

impl ReciterCatalog {
    pub fn new(default: ReciterId, reciters: Vec<Reciter>) -> Result<Self, CatalogError> {
        for (i, reciter) in reciters.iter().enumerate() {
            if reciter.mirrors.is_empty() {
                return Err(CatalogError::NoMirrors(reciter.id.to_string()));
            }
            if reciters[..i].iter().any(|r| r.id == reciter.id) {
                return Err(CatalogError::Duplicate(reciter.id.to_string()));
            }
        }
        if !reciters.iter().any(|r| r.id == default) {
            return Err(CatalogError::MissingDefault(default.to_string()));
        }
        Ok(Self { default, reciters })
    }

    pub fn from_config(config: &ResolverConfig) -> Result<Self, CatalogError> {
        Self::new(
            ReciterId::new(config.default_reciter.clone()),
            config.reciters.iter().map(Reciter::from).collect(),
        )
    }

    pub fn default_reciter(&self) -> &ReciterId {
        &self.default
    }

    /// Every valid reciter id, in catalog order.
    pub fn reciters(&self) -> impl Iterator<Item = &Reciter> {
        self.reciters.iter()
    }

    pub fn contains(&self, id: &ReciterId) -> bool {
        self.reciters.iter().any(|r| &r.id == id)
    }

    /// The reciter actually used for `id`: itself when known, otherwise the
    /// default.
    pub fn effective(&self, id: &ReciterId) -> &Reciter {
        self.find(id)
            .or_else(|| self.find(&self.default))
            .unwrap_or(&self.reciters[0])
    }

    fn find(&self, id: &ReciterId) -> Option<&Reciter> {
        self.reciters.iter().find(|r| &r.id == id)
    }

    /// Ordered candidate locations for `verse`.
    ///
    /// The reciter's mirrors come first, in priority order.  The verse's own
    /// direct URL, when the content provider supplied one, is appended as the
    /// last resort.  Duplicates are dropped, keeping the first occurrence.
    pub fn candidates(&self, verse: &VerseRef, reciter: &ReciterId) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();

        let mirrors = self.effective(reciter).mirrors.iter().map(|t| expand(t, verse));
        for url in mirrors.chain(verse.audio().url.clone()) {
            if !out.contains(&url) {
                out.push(url);
            }
        }
        out
    }
}

impl Default for ReciterCatalog {
    /// The built-in catalog shipped with [`ResolverConfig::default`].
    fn default() -> Self {
        let config = ResolverConfig::default();
        Self {
            default: ReciterId::new(config.default_reciter.clone()),
            reciters: config.reciters.iter().map(Reciter::from).collect(),
        }
    }
}

/// Substitute the template tokens for `verse`.
fn expand(template: &str, verse: &VerseRef) -> String {
    template
        .replace("{chapter:03}", &format!("{:03}", verse.chapter_id()))
        .replace("{verse:03}", &format!("{:03}", verse.number()))
        .replace("{chapter}", &verse.chapter_id().to_string())
        .replace("{verse}", &verse.number().to_string())
        .replace("{number}", &verse.audio().number.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
