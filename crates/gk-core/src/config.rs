use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::settings::ConversionSettings;

/// Configuration complète du service : pipeline vidéo + conversion par défaut.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use gk_core::config::ServiceConfig;
/// let config = ServiceConfig::default();
/// assert_eq!(config.video.max_processing_width, 640);
/// assert_eq!(config.conversion.effect, "classic");
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Pipeline vidéo (cache, sessions, ffmpeg).
    pub video: VideoConfig,
    /// Réglages de conversion appliqués quand l'appelant n'en fournit pas.
    pub conversion: ConversionSettings,
}

/// Paramètres du pipeline vidéo.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Racine des répertoires de session.
    pub temp_root: PathBuf,
    /// Largeur maximale d'extraction ; au-delà, downscale proportionnel.
    pub max_processing_width: u32,
    /// Durée d'inactivité avant suppression d'une session (secondes).
    pub idle_timeout_secs: u64,
    /// Période du balayage des sessions inactives (secondes).
    pub sweep_interval_secs: u64,
    /// Capacité du canal borné du streaming (backpressure).
    pub stream_capacity: usize,
    /// Binaire ffmpeg.
    pub ffmpeg: String,
    /// Binaire ffprobe.
    pub ffprobe: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir().join("glyphkit_video"),
            max_processing_width: 640,
            idle_timeout_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
            stream_capacity: 4,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl VideoConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl ServiceConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        let v = &mut self.video;
        v.max_processing_width = v.max_processing_width.clamp(16, 7680);
        v.sweep_interval_secs = v.sweep_interval_secs.max(1);
        v.stream_capacity = v.stream_capacity.clamp(1, 64);
        self.conversion.clamp_all();
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    video: Option<VideoSection>,
    conversion: Option<ConversionSection>,
}

/// Video section, all fields optional for partial override.
#[derive(Deserialize)]
struct VideoSection {
    temp_root: Option<PathBuf>,
    max_processing_width: Option<u32>,
    idle_timeout_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    stream_capacity: Option<usize>,
    ffmpeg: Option<String>,
    ffprobe: Option<String>,
}

/// Conversion section, all fields optional.
#[derive(Deserialize)]
struct ConversionSection {
    effect: Option<String>,
    step: Option<u32>,
    color_mode: Option<bool>,
    threshold: Option<u8>,
    invert: Option<bool>,
    max_columns: Option<u32>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use gk_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/glyphkit.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))
}

/// Parse une configuration TOML depuis une chaîne.
///
/// # Errors
/// Returns an error if the TOML is malformed.
pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = ServiceConfig::default();

    if let Some(v) = file.video {
        let video = &mut config.video;
        if let Some(x) = v.temp_root {
            video.temp_root = x;
        }
        if let Some(x) = v.max_processing_width {
            video.max_processing_width = x;
        }
        if let Some(x) = v.idle_timeout_secs {
            video.idle_timeout_secs = x;
        }
        if let Some(x) = v.sweep_interval_secs {
            video.sweep_interval_secs = x;
        }
        if let Some(x) = v.stream_capacity {
            video.stream_capacity = x;
        }
        if let Some(x) = v.ffmpeg {
            video.ffmpeg = x;
        }
        if let Some(x) = v.ffprobe {
            video.ffprobe = x;
        }
    }

    if let Some(c) = file.conversion {
        let conv = &mut config.conversion;
        if let Some(x) = c.effect {
            conv.effect = x;
        }
        if let Some(x) = c.step {
            conv.step = x;
        }
        if let Some(x) = c.color_mode {
            conv.color_mode = x;
        }
        if let Some(x) = c.threshold {
            conv.threshold = x;
        }
        if let Some(x) = c.invert {
            conv.invert = x;
        }
        if let Some(x) = c.max_columns {
            conv.max_columns = x;
        }
    }

    config.clamp_all();
    log::debug!(
        "config: max_width={} idle={}s stream_capacity={}",
        config.video.max_processing_width,
        config.video.idle_timeout_secs,
        config.video.stream_capacity
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = parse_config(
            "[video]\nmax_processing_width = 320\n\n[conversion]\neffect = \"braille\"\nstep = 0\n",
        )
        .unwrap();
        assert_eq!(config.video.max_processing_width, 320);
        assert_eq!(config.video.stream_capacity, 4);
        assert_eq!(config.video.ffmpeg, "ffmpeg");
        assert_eq!(config.conversion.effect, "braille");
        // clamp_all appliqué après parsing
        assert_eq!(config.conversion.step, 1);
        assert_eq!(config.conversion.threshold, 128);
    }

    #[test]
    fn empty_file_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config.video.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(config.video.sweep_interval(), Duration::from_secs(300));
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let config =
            parse_config("[video]\nstream_capacity = 0\nsweep_interval_secs = 0\nmax_processing_width = 2\n")
                .unwrap();
        assert_eq!(config.video.stream_capacity, 1);
        assert_eq!(config.video.sweep_interval_secs, 1);
        assert_eq!(config.video.max_processing_width, 16);
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(parse_config("[video\nmax = ").is_err());
    }

    #[test]
    fn load_config_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[conversion]\ninvert = true").unwrap();
        let config = load_config(file.path()).unwrap();
        assert!(config.conversion.invert);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/glyphkit.toml")).is_err());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        let config = parse_config(include_str!("../../../config/glyphkit.toml")).unwrap();
        let defaults = ServiceConfig::default();
        assert_eq!(config.video.max_processing_width, defaults.video.max_processing_width);
        assert_eq!(config.video.idle_timeout_secs, defaults.video.idle_timeout_secs);
        assert_eq!(config.video.temp_root, defaults.video.temp_root);
        assert_eq!(config.conversion, defaults.conversion);
    }
}
