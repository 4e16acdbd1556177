//! Tramage ordonné (Bayer 4×4) sur une rampe de 5 niveaux.

use gk_core::bitops::{clamp_byte, luminance};
use gk_core::charset::map_glyph;
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

use crate::grid::SampleGrid;

/// Matrice de Bayer 4×4, niveaux 0-15 mis à l'échelle 0-240 (`<< 4`).
pub const BAYER_4X4: [[u8; 4]; 4] = [
    [0, 128, 32, 160],
    [192, 64, 224, 96],
    [48, 176, 16, 144],
    [240, 112, 208, 80],
];

/// Rampe du halftone, dense→clair.
pub const HALFTONE_RAMP: &[char] = &['@', 'O', 'o', '.', ' '];

/// Luminance décalée par le seuil de Bayer de la cellule `(x, y)`.
///
/// Le décalage `(bayer - 128) >> 2` reste dans `[-32, 28]`.
///
/// # Example
/// ```
/// use gk_effects::halftone::dither_offset;
/// assert_eq!(dither_offset(100, 0, 0), 68);
/// assert_eq!(dither_offset(100, 4, 4), 68); // période 4
/// assert_eq!(dither_offset(250, 0, 3), 255);
/// ```
#[inline(always)]
#[must_use]
pub fn dither_offset(lum: u8, x: u32, y: u32) -> u8 {
    let bayer = i32::from(BAYER_4X4[(y & 3) as usize][(x & 3) as usize]);
    clamp_byte(i32::from(lum) + ((bayer - 128) >> 2))
}

/// Luminance décalée par la matrice de Bayer, puis [`HALFTONE_RAMP`].
pub fn process_halftone(
    view: &PixelView<'_>,
    settings: &ConversionSettings,
    out: &mut GlyphBuffer,
) {
    let grid = SampleGrid::for_settings(view.width(), view.height(), settings);
    grid.begin(out, settings.color_mode);
    let invert = settings.invert;

    grid.for_each_cell(out, |cell, out| {
        let (r, g, b) = view.rgb(cell.src_x, cell.src_y);
        let mut lum = luminance(r, g, b);
        if invert {
            lum = 255 - lum;
        }
        out.push_glyph(map_glyph(dither_offset(lum, cell.x, cell.y), HALFTONE_RAMP));
        out.push_color(r, g, b);
    });
}
