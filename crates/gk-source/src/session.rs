use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use gk_core::frame::{GlyphFrame, PixelView};
use gk_core::settings::ConversionSettings;
use gk_effects::EffectRegistry;
use serde::Serialize;

use crate::cache::FrameCache;
use crate::decoder::{ExtractRequest, ProbeInfo};
use crate::error::SourceError;

/// Taille d'extraction effective : downscale proportionnel au-delà de
/// `max_width`, hauteur alors forcée paire (et ≥ 2).
///
/// # Example
/// ```
/// use gk_source::session::effective_size;
/// assert_eq!(effective_size(1920, 1080, 640), (640, 360));
/// assert_eq!(effective_size(1000, 333, 640), (640, 212));
/// assert_eq!(effective_size(320, 241, 640), (320, 241));
/// ```
#[must_use]
pub fn effective_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width, height);
    }
    let scaled = (u64::from(height) * u64::from(max_width) / u64::from(width)) as u32;
    (max_width, (scaled & !1).max(2))
}

/// Métadonnées publiques d'une session.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    /// Dimensions de la source.
    pub source_width: u32,
    pub source_height: u32,
    /// Dimensions effectives d'extraction.
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub duration: f64,
    pub total_frames: u32,
    /// Frames déjà présentes dans le cache.
    pub materialized: u32,
}

/// Une source vidéo téléversée et son répertoire de cache.
///
/// Les champs mutables (dernier accès, frames matérialisées) sont des
/// atomiques indépendants : aucun verrou de session.
#[derive(Debug)]
pub struct VideoSession {
    id: String,
    source: PathBuf,
    probe: ProbeInfo,
    width: u32,
    height: u32,
    cache: FrameCache,
    created: Instant,
    /// Millisecondes écoulées depuis `created` au dernier accès.
    last_access_ms: AtomicU64,
    materialized: AtomicU32,
}

impl VideoSession {
    #[must_use]
    pub fn new(
        id: String,
        dir: PathBuf,
        source: PathBuf,
        probe: ProbeInfo,
        effective: (u32, u32),
    ) -> Self {
        let (width, height) = effective;
        let frame_len = width as usize * height as usize * gk_core::frame::BYTES_PER_PIXEL;
        Self {
            id,
            source,
            probe,
            width,
            height,
            cache: FrameCache::new(dir, frame_len),
            created: Instant::now(),
            last_access_ms: AtomicU64::new(0),
            materialized: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        self.cache.dir()
    }

    #[must_use]
    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    #[must_use]
    pub fn probe(&self) -> &ProbeInfo {
        &self.probe
    }

    /// Dimensions effectives d'extraction.
    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[must_use]
    pub fn fps(&self) -> f64 {
        self.probe.fps
    }

    #[must_use]
    pub fn total_frames(&self) -> u32 {
        self.probe.total_frames.max(1)
    }

    /// Ramène un index quelconque dans `[0, total_frames - 1]`.
    #[must_use]
    pub fn clamp_index(&self, index: i64) -> u32 {
        index.clamp(0, i64::from(self.total_frames() - 1)) as u32
    }

    /// Position en secondes de la frame `index`.
    #[must_use]
    pub fn timestamp(&self, index: u32) -> f64 {
        if self.probe.fps > 0.0 {
            f64::from(index) / self.probe.fps
        } else {
            0.0
        }
    }

    /// Requête d'extraction à partir de `start`, `limit` frames au plus.
    #[must_use]
    pub fn extract_request(&self, start: u32, limit: Option<u32>) -> ExtractRequest {
        ExtractRequest {
            source: self.source.clone(),
            seek_secs: (start > 0).then(|| self.timestamp(start)),
            scale: Some((self.width, self.height)),
            frame_limit: limit,
        }
    }

    /// Convertit une frame brute de la session, `seed` = index de frame.
    ///
    /// # Errors
    /// Returns [`SourceError::Core`] if `data` is not a full frame.
    pub fn render(
        &self,
        registry: &EffectRegistry,
        data: &[u8],
        index: u32,
        settings: &ConversionSettings,
    ) -> Result<GlyphFrame, SourceError> {
        let view = PixelView::new(data, self.width, self.height)?;
        Ok(registry
            .render(&view, &settings.with_seed(index))
            .with_position(index, self.total_frames()))
    }

    pub fn touch(&self) {
        let now = self.created.elapsed().as_millis() as u64;
        self.last_access_ms.fetch_max(now, Ordering::Relaxed);
    }

    /// Temps écoulé depuis le dernier accès.
    #[must_use]
    pub fn idle(&self) -> Duration {
        let now = self.created.elapsed().as_millis() as u64;
        Duration::from_millis(now.saturating_sub(self.last_access_ms.load(Ordering::Relaxed)))
    }

    pub fn record_materialized(&self) {
        self.materialized.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn materialized(&self) -> u32 {
        self.materialized.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            source_width: self.probe.width,
            source_height: self.probe.height,
            width: self.width,
            height: self.height,
            fps: self.probe.fps,
            duration: self.probe.duration,
            total_frames: self.total_frames(),
            materialized: self.materialized(),
        }
    }
}
