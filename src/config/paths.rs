//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\verse-player\
//!   macOS:   ~/Library/Application Support/verse-player/
//!   Linux:   ~/.config/verse-player/
//!
//! Data dir (chapter files):
//!   Windows: %LOCALAPPDATA%\verse-player\
//!   macOS:   ~/Library/Application Support/verse-player/
//!   Linux:   ~/.local/share/verse-player/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory holding `<chapter>.json` files from the content provider.
    pub chapters_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "verse-player";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let chapters_dir = data_dir.join("chapters");

        Self {
            config_dir,
            settings_file,
            chapters_dir,
        }
    }

    /// Default location of the JSON file for chapter `id`.
    pub fn chapter_file(&self, id: u32) -> PathBuf {
        self.chapters_dir.join(format!("{id}.json"))
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_non_empty() {
        let paths = AppPaths::new();
        assert!(paths.config_dir.to_str().is_some_and(|s| !s.is_empty()));
        assert!(paths
            .settings_file
            .file_name()
            .is_some_and(|n| n == "settings.toml"));
        assert!(paths.chapters_dir.ends_with("chapters"));
    }

    #[test]
    fn chapter_file_is_named_by_id() {
        let paths = AppPaths::new();
        assert!(paths
            .chapter_file(36)
            .file_name()
            .is_some_and(|n| n == "36.json"));
    }
}
