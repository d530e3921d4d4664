use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the exif-mem library and CLI.
///
/// Controls how text is converted into byte values, how regenerated XMP
/// packets are laid out, and what the CLI does with the files it rewrites.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_mem::config::{Config, TokenPolicy};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.codec.byte_tokens = TokenPolicy::Strict;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Value codec behavior.
    pub codec: CodecConfig,
    /// XMP packet writer settings.
    pub xmp: XmpConfig,
    /// CLI output behavior (backups).
    pub output: OutputConfig,
}

/// How decimal byte tokens that fall outside `0..=255` (or are not
/// integers at all) are handled when text is turned into bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPolicy {
    /// Silently drop offending tokens.
    #[default]
    Lenient,
    /// Reject the whole string with an encoding error.
    Strict,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub byte_tokens: TokenPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmpConfig {
    /// Bytes of whitespace padding written before the packet trailer.
    pub padding: usize,
}

impl Default for XmpConfig {
    fn default() -> Self {
        Self { padding: 2048 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// If `true`, create a `.bak` backup before the CLI modifies an image.
    pub backup_originals: bool,
}

/// Largest accepted XMP padding. More would push even an empty packet past
/// the payload limit of a single JPEG segment.
pub const MAX_XMP_PADDING: usize = 32 * 1024;

impl Config {
    /// Default config location: `config.json` beside the executable.
    pub fn config_path() -> Result<PathBuf> {
        Ok(std::env::current_exe()
            .context("Failed to get executable path")?
            .with_file_name("config.json"))
    }

    fn resolve(path: Option<&Path>) -> Result<PathBuf> {
        path.map_or_else(Self::config_path, |p| Ok(p.to_path_buf()))
    }

    /// Load and validate the config at `path` (or the default location).
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve(path)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_json(&contents)
                .with_context(|| format!("Invalid config {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Parse config from a JSON string. Missing fields take their defaults.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the codecs cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.xmp.padding > MAX_XMP_PADDING {
            bail!(
                "xmp.padding of {} exceeds the maximum of {MAX_XMP_PADDING} bytes",
                self.xmp.padding
            );
        }
        Ok(())
    }

    /// Validate, then write pretty-printed JSON to `path` (or the default
    /// location).
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        self.validate()?;
        let path = Self::resolve(path)?;
        let mut contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        contents.push('\n');
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("Config saved to {}", path.display());
        Ok(())
    }
}
