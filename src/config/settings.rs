//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! The engine never reads these directly; callers convert them into plain
//! values ([`TranslationPolicy`], [`ReciterId`], [`EngineOptions`]).

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::playback::{EngineOptions, TranslationPolicy};
use crate::resolver::ReciterId;

// ---------------------------------------------------------------------------
// TranslationConfig
// ---------------------------------------------------------------------------

/// Whether translated speech is interleaved between recitations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationConfig {
    pub enabled: bool,
    /// Language tag handed to the speech synthesizer (e.g. `"en"`, `"id"`).
    pub voice_language: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            voice_language: "en".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ReciterConfig / ResolverConfig
// ---------------------------------------------------------------------------

/// One reciter and its mirror URL templates, highest priority first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReciterConfig {
    pub id: String,
    pub name: String,
    pub mirrors: Vec<String>,
}

impl ReciterConfig {
    fn new(id: &str, name: &str, mirrors: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mirrors: mirrors.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Settings for recitation source resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Maximum milliseconds to wait for one candidate source to open.
    pub candidate_timeout_ms: u64,
    /// Reciter used when the selected one is not in the catalog.
    pub default_reciter: String,
    pub reciters: Vec<ReciterConfig>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidate_timeout_ms: 3_000,
            default_reciter: "ar.alafasy".into(),
            reciters: vec![
                ReciterConfig::new(
                    "ar.alafasy",
                    "Mishary Rashid Alafasy",
                    &[
                        "https://cdn.islamic.network/quran/audio/128/ar.alafasy/{number}.mp3",
                        "https://cdn.islamic.network/quran/audio/64/ar.alafasy/{number}.mp3",
                        "https://everyayah.com/data/Alafasy_128kbps/{chapter:03}{verse:03}.mp3",
                    ],
                ),
                ReciterConfig::new(
                    "ar.abdulbasitmurattal",
                    "Abdul Basit Abdul Samad (Murattal)",
                    &[
                        "https://cdn.islamic.network/quran/audio/192/ar.abdulbasitmurattal/{number}.mp3",
                        "https://cdn.islamic.network/quran/audio/64/ar.abdulbasitmurattal/{number}.mp3",
                        "https://everyayah.com/data/Abdul_Basit_Murattal_192kbps/{chapter:03}{verse:03}.mp3",
                    ],
                ),
                ReciterConfig::new(
                    "ar.husary",
                    "Mahmoud Khalil Al-Husary",
                    &[
                        "https://cdn.islamic.network/quran/audio/128/ar.husary/{number}.mp3",
                        "https://cdn.islamic.network/quran/audio/64/ar.husary/{number}.mp3",
                        "https://everyayah.com/data/Husary_128kbps/{chapter:03}{verse:03}.mp3",
                    ],
                ),
                ReciterConfig::new(
                    "ar.minshawi",
                    "Mohamed Siddiq Al-Minshawi",
                    &[
                        "https://cdn.islamic.network/quran/audio/128/ar.minshawi/{number}.mp3",
                        "https://cdn.islamic.network/quran/audio/64/ar.minshawi/{number}.mp3",
                        "https://everyayah.com/data/Minshawy_Murattal_128kbps/{chapter:03}{verse:03}.mp3",
                    ],
                ),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// NetworkConfig
// ---------------------------------------------------------------------------

/// HTTP client settings for the streaming media backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub user_agent: String,
    /// Seconds allowed for establishing a TCP/TLS connection.
    pub connect_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("verse-player/", env!("CARGO_PKG_VERSION")).into(),
            connect_timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use verse_player::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Selected reciter id.
    pub reciter: String,
    /// Translation interleave settings.
    pub translation: TranslationConfig,
    /// Source resolution settings and reciter catalog.
    pub resolver: ResolverConfig,
    /// HTTP client settings.
    pub network: NetworkConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            reciter: "ar.alafasy".into(),
            translation: TranslationConfig::default(),
            resolver: ResolverConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns `true` when no `settings.toml` file exists yet.
    pub fn is_first_run() -> bool {
        !AppPaths::new().settings_file.exists()
    }

    pub fn reciter_id(&self) -> ReciterId {
        ReciterId::new(self.reciter.clone())
    }

    pub fn translation_policy(&self) -> TranslationPolicy {
        TranslationPolicy {
            enabled: self.translation.enabled,
            voice_language: self.translation.voice_language.clone(),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            candidate_timeout: Duration::from_millis(self.resolver.candidate_timeout_ms),
            policy: self.translation_policy(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.reciter, "ar.alafasy");
        assert!(!cfg.translation.enabled);
        assert_eq!(cfg.translation.voice_language, "en");
        assert_eq!(cfg.resolver.candidate_timeout_ms, 3_000);
        assert_eq!(cfg.resolver.default_reciter, "ar.alafasy");
        assert_eq!(cfg.resolver.reciters.len(), 4);
        assert!(cfg.network.user_agent.starts_with("verse-player/"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(
            &path,
            "reciter = \"ar.husary\"\n\n[translation]\nenabled = true\nvoice_language = \"id\"\n",
        )
        .expect("write");

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.reciter_id(), ReciterId::new("ar.husary"));
        assert_eq!(
            cfg.translation_policy(),
            TranslationPolicy {
                enabled: true,
                voice_language: "id".into()
            }
        );
        assert_eq!(cfg.resolver, ResolverConfig::default());
    }

    #[test]
    fn engine_options_use_candidate_timeout() {
        let mut cfg = AppConfig::default();
        cfg.resolver.candidate_timeout_ms = 1_500;
        assert_eq!(cfg.engine_options().candidate_timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "reciter = [").expect("write");
        assert!(AppConfig::load_from(&path).is_err());
    }
}
