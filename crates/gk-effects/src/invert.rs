use gk_core::bitops::luminance;
use gk_core::charset::{RAMP_DEFAULT, map_glyph};
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

use crate::grid::SampleGrid;

/// Inversion bit-à-bit d'une couleur (XOR 0xFF par canal). Involutive.
///
/// # Example
/// ```
/// use gk_effects::invert::invert_rgb;
/// assert_eq!(invert_rgb(0, 128, 255), (255, 127, 0));
/// ```
#[inline(always)]
#[must_use]
pub const fn invert_rgb(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    (r ^ 0xFF, g ^ 0xFF, b ^ 0xFF)
}

/// Luminance XOR 0xFF sur la rampe par défaut ; couleurs inversées en `color_mode`.
///
/// `settings.invert` n'a pas d'effet ici : l'inversion est le principe même.
pub fn process_invert(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    let grid = SampleGrid::for_settings(view.width(), view.height(), settings);
    grid.begin(out, settings.color_mode);

    grid.for_each_cell(out, |cell, out| {
        let (r, g, b) = view.rgb(cell.src_x, cell.src_y);
        out.push_glyph(map_glyph(luminance(r, g, b) ^ 0xFF, RAMP_DEFAULT));
        let (ir, ig, ib) = invert_rgb(r, g, b);
        out.push_color(ir, ig, ib);
    });
}
