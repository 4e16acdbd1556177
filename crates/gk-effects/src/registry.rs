use gk_core::frame::{GlyphBuffer, GlyphFrame, PixelView};
use gk_core::settings::{ConversionSettings, DEFAULT_EFFECT};

use crate::{braille, classic, dither, edge, halftone, invert, matrix, threshold};

/// Signature commune des effets.
///
/// CONTRAT : ne doit PAS échouer, ne doit PAS conserver d'état entre deux
/// appels, et ne doit écrire que dans `out`.
pub type EffectFn = fn(&PixelView<'_>, &ConversionSettings, &mut GlyphBuffer);

/// A named effect: registry key, human description and transform.
#[derive(Clone, Copy, Debug)]
pub struct Effect {
    pub name: &'static str,
    pub description: &'static str,
    run: EffectFn,
}

impl Effect {
    #[must_use]
    pub const fn new(name: &'static str, description: &'static str, run: EffectFn) -> Self {
        Self {
            name,
            description,
            run,
        }
    }

    /// Convertit `view` dans le buffer réutilisable `out`.
    #[inline]
    pub fn process(&self, view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
        (self.run)(view, settings, out);
    }

    /// Convertit `view` dans une frame neuve.
    #[must_use]
    pub fn render(&self, view: &PixelView<'_>, settings: &ConversionSettings) -> GlyphFrame {
        let mut out = GlyphBuffer::new();
        self.process(view, settings, &mut out);
        out.into_frame()
    }
}

const CLASSIC: Effect = Effect::new(
    "classic",
    "classic ascii: luminance mapped onto glyph density",
    classic::process_classic,
);

/// Effets intégrés, dans l'ordre d'enregistrement.
pub const BUILTIN_EFFECTS: [Effect; 10] = [
    CLASSIC,
    Effect::new(
        "color",
        "color ascii: glyphs carry the original pixel colors",
        classic::process_color,
    ),
    Effect::new(
        "edge",
        "edge detection: integer Sobel operator, shows contours",
        edge::process_edge,
    ),
    Effect::new(
        "matrix",
        "matrix rain: green cascading glyphs, reproducible per frame",
        matrix::process_matrix,
    ),
    Effect::new(
        "dither",
        "floyd-steinberg dithering: integer error diffusion",
        dither::process_dither,
    ),
    Effect::new(
        "braille",
        "unicode braille: 2x4 pixels packed as bits in one glyph",
        braille::process_braille,
    ),
    Effect::new(
        "block",
        "unicode blocks: smooth five-level shading",
        classic::process_block,
    ),
    Effect::new(
        "invert",
        "inverted luminance: dark becomes bright and vice versa",
        invert::process_invert,
    ),
    Effect::new(
        "threshold",
        "binary threshold: pure black and white, no midtones",
        threshold::process_threshold,
    ),
    Effect::new(
        "halftone",
        "halftone: ordered dithering with a 4x4 bayer matrix",
        halftone::process_halftone,
    ),
];

/// Table nom → effet, construite une fois au démarrage puis partagée en
/// lecture seule (typiquement via `Arc`).
///
/// La recherche ignore la casse ; un nom inconnu retombe sur `classic`.
///
/// # Example
/// ```
/// use gk_core::frame::RgbFrame;
/// use gk_core::settings::ConversionSettings;
/// use gk_effects::EffectRegistry;
///
/// let registry = EffectRegistry::new();
/// assert_eq!(registry.get("BRAILLE").name, "braille");
/// assert_eq!(registry.get("does-not-exist").name, "classic");
///
/// let frame = RgbFrame::filled(16, 16, [255, 0, 0]);
/// let settings = ConversionSettings { step: 16, ..Default::default() };
/// assert_eq!(registry.render(&frame.view(), &settings).text, "*\n");
/// ```
#[derive(Clone, Debug)]
pub struct EffectRegistry {
    effects: Vec<Effect>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    /// Registry holding the ten built-in effects.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for effect in BUILTIN_EFFECTS {
            registry.register(effect);
        }
        log::debug!("registre d'effets : {} effets", registry.len());
        registry
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            effects: Vec::with_capacity(BUILTIN_EFFECTS.len()),
        }
    }

    /// Ajoute un effet ; un nom déjà présent (casse ignorée) est remplacé sur place.
    pub fn register(&mut self, effect: Effect) {
        match self
            .effects
            .iter_mut()
            .find(|e| e.name.eq_ignore_ascii_case(effect.name))
        {
            Some(slot) => *slot = effect,
            None => self.effects.push(effect),
        }
    }

    /// Exact lookup, case-insensitive.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Lookup with fallback to `classic`. Never fails.
    #[must_use]
    pub fn get(&self, name: &str) -> &Effect {
        self.lookup(name).unwrap_or_else(|| {
            log::debug!("effet inconnu '{name}', repli sur {DEFAULT_EFFECT}");
            self.lookup(DEFAULT_EFFECT).unwrap_or(&CLASSIC)
        })
    }

    /// `(name, description)` pairs in registration order.
    pub fn list(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.effects.iter().map(|e| (e.name, e.description))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Dispatche vers `settings.effect` en réutilisant `out`.
    pub fn render_into(
        &self,
        view: &PixelView<'_>,
        settings: &ConversionSettings,
        out: &mut GlyphBuffer,
    ) {
        self.get(&settings.effect).process(view, settings, out);
    }

    /// Dispatche vers `settings.effect` dans une frame neuve.
    #[must_use]
    pub fn render(&self, view: &PixelView<'_>, settings: &ConversionSettings) -> GlyphFrame {
        self.get(&settings.effect).render(view, settings)
    }
}
