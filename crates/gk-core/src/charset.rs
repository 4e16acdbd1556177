use crate::bitops::map_index;

/// 11 niveaux, rampe par défaut, du plus dense au plus clair.
pub const RAMP_DEFAULT: &[char] = &['@', '%', '#', '*', '+', '=', '-', ':', '~', '.', ' '];

/// 7 niveaux, haut contraste.
pub const RAMP_SIMPLE: &[char] = &['#', '=', '+', ':', '-', '.', ' '];

/// 69 niveaux : Paul Bourke étendu (dense→clair).
pub const RAMP_DETAILED: &[char] = &[
    '$', '@', 'B', '%', '8', '&', 'W', 'M', '#', 'o', 'a', 'h', 'k', 'b', 'd', 'p', 'q', 'w',
    'm', 'Z', 'O', '0', 'Q', 'L', 'C', 'J', 'U', 'Y', 'X', 'z', 'c', 'v', 'u', 'n', 'x', 'r',
    'j', 'f', 't', '/', '\\', '|', '(', ')', '1', '{', '}', '[', ']', '?', '-', '_', '+', '~',
    '<', '>', 'i', '!', 'l', 'I', ';', ':', ',', '"', '^', '`', '\'', '.', ' ',
];

/// Blocs Unicode, 5 niveaux.
pub const RAMP_BLOCKS: &[char] = &['█', '▓', '▒', '░', ' '];

/// Maps a luminance byte onto a ramp ordered dense→sparse.
///
/// Dark pixels get dense glyphs, bright pixels sparse ones.
///
/// # Example
/// ```
/// use gk_core::charset::{map_glyph, RAMP_DEFAULT};
/// assert_eq!(map_glyph(0, RAMP_DEFAULT), '@');
/// assert_eq!(map_glyph(255, RAMP_DEFAULT), ' ');
/// assert_eq!(map_glyph(76, RAMP_DEFAULT), '*');
/// ```
#[inline(always)]
#[must_use]
pub fn map_glyph(luminance: u8, ramp: &[char]) -> char {
    ramp.get(map_index(luminance, ramp.len()))
        .copied()
        .unwrap_or(' ')
}

/// Mapping miroir : les pixels clairs reçoivent les glyphes denses.
///
/// # Example
/// ```
/// use gk_core::charset::{map_glyph_inverted, RAMP_DEFAULT};
/// assert_eq!(map_glyph_inverted(255, RAMP_DEFAULT), '@');
/// assert_eq!(map_glyph_inverted(0, RAMP_DEFAULT), ' ');
/// ```
#[inline(always)]
#[must_use]
pub fn map_glyph_inverted(luminance: u8, ramp: &[char]) -> char {
    map_glyph(255 - luminance, ramp)
}

/// Named glyph ramp.
///
/// # Example
/// ```
/// use gk_core::charset::GlyphRamp;
/// assert_eq!(GlyphRamp::from_name("blocks"), GlyphRamp::Blocks);
/// assert_eq!(GlyphRamp::from_name("nope"), GlyphRamp::Default);
/// assert_eq!(GlyphRamp::Simple.glyphs().len(), 7);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GlyphRamp {
    /// `@%#*+=-:~. `
    #[default]
    Default,
    /// `#=+:-. `
    Simple,
    /// Paul Bourke, 69 niveaux.
    Detailed,
    /// `█▓▒░ `
    Blocks,
}

impl GlyphRamp {
    /// Résout une rampe par nom ; tout nom inconnu donne `Default`.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "simple" => Self::Simple,
            "detailed" => Self::Detailed,
            "blocks" => Self::Blocks,
            _ => Self::Default,
        }
    }

    /// Glyphs of this ramp, dense→sparse.
    #[must_use]
    pub const fn glyphs(self) -> &'static [char] {
        match self {
            Self::Default => RAMP_DEFAULT,
            Self::Simple => RAMP_SIMPLE,
            Self::Detailed => RAMP_DETAILED,
            Self::Blocks => RAMP_BLOCKS,
        }
    }

    #[inline(always)]
    #[must_use]
    pub fn map(self, luminance: u8) -> char {
        map_glyph(luminance, self.glyphs())
    }

    #[inline(always)]
    #[must_use]
    pub fn map_inverted(self, luminance: u8) -> char {
        map_glyph_inverted(luminance, self.glyphs())
    }
}
