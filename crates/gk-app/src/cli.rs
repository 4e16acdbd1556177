use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gk_core::settings::ConversionSettings;

/// glyphkit : conversion d'images et de vidéos en art de glyphes.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Fichier de configuration TOML. Absent = valeurs par défaut.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    #[command(flatten)]
    pub conversion: ConversionArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Liste les effets disponibles.
    Effects,
    /// Convertit une image (PNG, JPEG, BMP, GIF).
    Image {
        /// Chemin de l'image.
        path: PathBuf,
    },
    /// Ouvre une vidéo (ffmpeg + ffprobe requis dans PATH).
    Video(VideoArgs),
}

#[derive(Args, Debug)]
pub struct VideoArgs {
    /// Chemin de la vidéo.
    pub path: PathBuf,

    /// Affiche une seule frame (index ramené dans les bornes).
    #[arg(long, allow_negative_numbers = true, conflicts_with_all = ["batch", "stream"])]
    pub frame: Option<i64>,

    /// Affiche jusqu'à COUNT frames déjà en cache à partir de --start.
    #[arg(long, value_name = "COUNT", conflicts_with = "stream")]
    pub batch: Option<u32>,

    /// Premier index de --batch.
    #[arg(long, default_value_t = 0, requires = "batch")]
    pub start: i64,

    /// Joue la vidéo au rythme de la source. Ctrl-C pour arrêter.
    #[arg(long, default_value_t = false)]
    pub stream: bool,

    /// Extrait toutes les frames vers le cache avant tout affichage.
    #[arg(long, default_value_t = false)]
    pub preload: bool,
}

/// Surcharges CLI de la section `[conversion]`.
#[derive(Args, Debug, Default)]
pub struct ConversionArgs {
    /// Effet : classic, color, edge, matrix, dither, braille, block, invert, threshold, halftone.
    #[arg(short, long, global = true)]
    pub effect: Option<String>,

    /// Pas d'échantillonnage en pixels [1, 64].
    #[arg(short, long, global = true)]
    pub step: Option<u32>,

    /// Seuil binaire (threshold, braille).
    #[arg(long, global = true)]
    pub threshold: Option<u8>,

    /// Inverser la luminance.
    #[arg(long, default_value_t = false, global = true)]
    pub invert: bool,

    /// Largeur maximale en colonnes, 0 = illimitée.
    #[arg(long, global = true)]
    pub max_columns: Option<u32>,
}

impl ConversionArgs {
    /// Applique les surcharges puis re-clampe.
    pub fn apply(&self, settings: &mut ConversionSettings) {
        if let Some(ref effect) = self.effect {
            settings.effect.clone_from(effect);
        }
        if let Some(step) = self.step {
            settings.step = step;
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if self.invert {
            settings.invert = true;
        }
        if let Some(max_columns) = self.max_columns {
            settings.max_columns = max_columns;
        }
        settings.clamp_all();
    }
}

/// Format de sortie.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OutputArgs {
    /// Glyphes colorés (ANSI 24 bits) ; active aussi le plan couleur de `classic`.
    #[arg(long, default_value_t = false, global = true)]
    pub color: bool,

    /// Une frame JSON par ligne au lieu du texte.
    #[arg(long, default_value_t = false, global = true, conflicts_with = "color")]
    pub json: bool,
}
