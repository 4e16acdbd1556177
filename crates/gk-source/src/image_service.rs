use std::path::Path;
use std::sync::Arc;

use gk_core::frame::{GlyphFrame, RgbFrame};
use gk_core::settings::ConversionSettings;
use gk_effects::EffectRegistry;

use crate::error::SourceError;

/// Still-image conversion: decode → RGB24 → effect.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use gk_core::frame::RgbFrame;
/// use gk_core::settings::ConversionSettings;
/// use gk_effects::EffectRegistry;
/// use gk_source::ImageService;
///
/// let service = ImageService::new(Arc::new(EffectRegistry::new()));
/// let frame = RgbFrame::filled(16, 16, [255, 0, 0]);
/// let settings = ConversionSettings { step: 16, effect: "nope".into(), ..Default::default() };
/// assert_eq!(service.convert_raw(&frame, &settings).text, "*\n");
/// ```
#[derive(Clone, Debug)]
pub struct ImageService {
    registry: Arc<EffectRegistry>,
}

impl ImageService {
    #[must_use]
    pub fn new(registry: Arc<EffectRegistry>) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EffectRegistry> {
        &self.registry
    }

    /// Décode une image encodée (PNG, JPEG, BMP, GIF) en RGB24.
    ///
    /// # Errors
    /// Returns [`SourceError::Decode`] if the bytes are not a supported image.
    pub fn decode(bytes: &[u8]) -> Result<RgbFrame, SourceError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        log::debug!("image décodée : {width}x{height}");
        Ok(RgbFrame::new(rgb.into_raw(), width, height)?)
    }

    /// Décode puis convertit avec `settings.effect` (repli sur `classic`).
    ///
    /// # Errors
    /// Returns [`SourceError::Decode`] if the bytes are not a supported image.
    pub fn convert(
        &self,
        bytes: &[u8],
        settings: &ConversionSettings,
    ) -> Result<GlyphFrame, SourceError> {
        let frame = Self::decode(bytes)?;
        Ok(self.convert_raw(&frame, settings))
    }

    /// Convertit un buffer RGB24 déjà décodé. Ne peut pas échouer.
    #[must_use]
    pub fn convert_raw(&self, frame: &RgbFrame, settings: &ConversionSettings) -> GlyphFrame {
        self.registry.render(&frame.view(), settings)
    }

    /// Lit un fichier image puis le convertit.
    ///
    /// # Errors
    /// Returns [`SourceError::Io`] if the file cannot be read, or
    /// [`SourceError::Decode`] if its content is not a supported image.
    pub fn convert_file(
        &self,
        path: &Path,
        settings: &ConversionSettings,
    ) -> Result<GlyphFrame, SourceError> {
        let bytes = std::fs::read(path)?;
        log::info!("image chargée : {} ({} octets)", path.display(), bytes.len());
        self.convert(&bytes, settings)
    }
}
