use std::path::{Path, PathBuf};

use directories::{ProjectDirs, UserDirs};
use serde::Deserialize;

use crate::layout::OverwritePolicy;

/// Application configuration loaded from TOML config file.
/// All fields have defaults, so the config file is optional.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AppConfig {
    /// Base directory of the music library (defaults to the XDG music dir).
    pub library_dir: Option<PathBuf>,
    /// Replace existing disc directories and ignore duplicate disc IDs.
    pub overwrite: bool,
    /// Editor command for the title edit session (falls back to $VISUAL, $EDITOR).
    pub editor: Option<String>,
    pub drive: DriveConfig,
    pub database: DatabaseConfig,
    pub rip: RipConfig,
    pub encode: EncodeConfig,
    pub encoding: EncodingConfig,
}

/// Disc drive settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DriveConfig {
    pub device: String,
    pub eject_command: String,
    pub discid_command: String,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            device: "/dev/sr0".to_string(),
            eject_command: "eject".to_string(),
            discid_command: "cd-discid".to_string(),
        }
    }
}

/// CDDB server settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub mirror_url: String,
    /// Client name and version, `name/version` (RFC 1945 §3.7).
    pub agent: String,
    /// Minimum delay between remote requests in milliseconds.
    pub rate_limit_ms: u64,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            mirror_url: "http://gnudb.gnudb.org/~cddb/cddb.cgi".to_string(),
            agent: format!("{}/{}", crate::APP_NAME, env!("CARGO_PKG_VERSION")),
            rate_limit_ms: 1000,
            timeout_secs: 30,
        }
    }
}

/// Ripping engine settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RipConfig {
    pub command: String,
    pub read_speed: u32,
}

impl Default for RipConfig {
    fn default() -> Self {
        Self {
            command: "cdparanoia".to_string(),
            read_speed: 8,
        }
    }
}

/// Lossless re-encoder settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EncodeConfig {
    pub enabled: bool,
    pub command: String,
    pub verify: bool,
    pub delete_source: bool,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: "flac".to_string(),
            verify: true,
            delete_source: true,
        }
    }
}

/// Metadata encoding repair settings.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EncodingConfig {
    /// Offer encoding repair for non-ASCII candidates.
    pub repair: bool,
    /// Encoding that mis-encoded records were decoded as before reaching us.
    pub carrier: String,
    /// Source encodings offered after the detector's guess.
    pub fallbacks: Vec<String>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            repair: true,
            carrier: "windows-1252".to_string(),
            fallbacks: [
                "windows-1252",
                "Shift_JIS",
                "EUC-JP",
                "windows-1251",
                "GBK",
                "Big5",
                "ISO-8859-2",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/discrip/config.toml`.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path.
    /// Logs a warning if the file can't be read or parsed and falls back to defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve the library root: config > XDG music dir > ~/Music.
    pub fn library_root(&self) -> PathBuf {
        self.library_dir.clone().unwrap_or_else(default_library_dir)
    }

    pub fn overwrite_policy(&self) -> OverwritePolicy {
        if self.overwrite {
            OverwritePolicy::Overwrite
        } else {
            OverwritePolicy::Deny
        }
    }

    /// Editor command: config > $VISUAL > $EDITOR > vi.
    pub fn editor_command(&self) -> String {
        self.editor
            .clone()
            .or_else(|| std::env::var("VISUAL").ok().filter(|s| !s.is_empty()))
            .or_else(|| std::env::var("EDITOR").ok().filter(|s| !s.is_empty()))
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Default library root using the XDG music directory.
pub fn default_library_dir() -> PathBuf {
    if let Some(dirs) = UserDirs::new() {
        match dirs.audio_dir() {
            Some(audio) => audio.to_path_buf(),
            None => dirs.home_dir().join("Music"),
        }
    } else {
        // Fallback: current directory
        PathBuf::from("Music")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.drive.device, "/dev/sr0");
        assert_eq!(config.rip.read_speed, 8);
        assert_eq!(config.database.rate_limit_ms, 1000);
        assert!(!config.encode.enabled);
        assert_eq!(config.overwrite_policy(), OverwritePolicy::Deny);
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            library_dir = "/srv/music"
            overwrite = true

            [rip]
            read_speed = 4

            [encode]
            enabled = true
            delete_source = false
            "#,
        )
        .unwrap();
        assert_eq!(config.library_root(), PathBuf::from("/srv/music"));
        assert_eq!(config.overwrite_policy(), OverwritePolicy::Overwrite);
        assert_eq!(config.rip.read_speed, 4);
        assert_eq!(config.rip.command, "cdparanoia");
        assert!(config.encode.enabled);
        assert!(config.encode.verify);
        assert!(!config.encode.delete_source);
    }

    #[test]
    fn test_load_from_bad_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        let config = AppConfig::load_from(&path);
        assert_eq!(config.drive.device, "/dev/sr0");
    }

    #[test]
    fn test_editor_from_config_wins() {
        let config = AppConfig {
            editor: Some("nano".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.editor_command(), "nano");
    }
}
