use serde::{Deserialize, Serialize};

/// Nom de l'effet utilisé quand aucun (ou un inconnu) n'est demandé.
pub const DEFAULT_EFFECT: &str = "classic";

/// Plus petit pas d'échantillonnage accepté.
pub const MIN_STEP: u32 = 1;
/// Plus grand pas d'échantillonnage accepté.
pub const MAX_STEP: u32 = 64;

/// Paramètres d'une conversion pixels → glyphes.
///
/// Valeur simple, clonée librement. Le `seed` vaut l'index de frame pour la
/// vidéo (motif pseudo-aléatoire reproductible par frame).
///
/// # Example
/// ```
/// use gk_core::settings::ConversionSettings;
/// let s = ConversionSettings::default();
/// assert_eq!(s.effect, "classic");
/// assert_eq!(s.step, 8);
/// assert_eq!(s.threshold, 128);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionSettings {
    /// Clé dans le registre d'effets.
    pub effect: String,
    /// Pas d'échantillonnage en pixels [1, 64].
    pub step: u32,
    /// Émettre le plan couleur.
    pub color_mode: bool,
    /// Seuil binaire pour `threshold` et `braille`.
    pub threshold: u8,
    /// Inverser la luminance.
    pub invert: bool,
    /// Graine du hash de position (index de frame en vidéo).
    pub seed: u32,
    /// Largeur maximale de sortie en colonnes. 0 = pas de limite.
    pub max_columns: u32,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            effect: DEFAULT_EFFECT.to_string(),
            step: 8,
            color_mode: false,
            threshold: 128,
            invert: false,
            seed: 0,
            max_columns: 300,
        }
    }
}

impl ConversionSettings {
    /// Clamp numeric fields into their valid ranges.
    ///
    /// # Example
    /// ```
    /// use gk_core::settings::ConversionSettings;
    /// let mut s = ConversionSettings { step: 0, ..Default::default() };
    /// s.clamp_all();
    /// assert_eq!(s.step, 1);
    /// ```
    pub fn clamp_all(&mut self) {
        self.step = self.step.clamp(MIN_STEP, MAX_STEP);
        if self.effect.trim().is_empty() {
            self.effect = DEFAULT_EFFECT.to_string();
        }
    }

    /// Copie avec un `seed` différent.
    #[must_use]
    pub fn with_seed(&self, seed: u32) -> Self {
        Self {
            seed,
            ..self.clone()
        }
    }
}
