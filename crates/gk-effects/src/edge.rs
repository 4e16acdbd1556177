use gk_core::bitops::{abs, clamp_byte, clamp_index};
use gk_core::charset::{RAMP_DEFAULT, map_glyph, map_glyph_inverted};
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

use crate::grid::SampleGrid;

/// Noyau de Sobel horizontal.
pub const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
/// Noyau de Sobel vertical.
pub const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Sobel gradients `(gx, gy)` centered on pixel `(x, y)`.
///
/// Neighbors outside the image are clamped to the nearest edge pixel.
///
/// # Example
/// ```
/// use gk_core::frame::RgbFrame;
/// use gk_effects::edge::gradient;
/// let flat = RgbFrame::filled(3, 3, [90, 90, 90]);
/// assert_eq!(gradient(&flat.view(), 1, 1), (0, 0));
/// assert_eq!(gradient(&flat.view(), 0, 0), (0, 0));
/// ```
#[must_use]
pub fn gradient(view: &PixelView<'_>, x: u32, y: u32) -> (i32, i32) {
    let w = view.width() as i32;
    let h = view.height() as i32;
    let (mut gx, mut gy) = (0, 0);

    for (ky, (row_x, row_y)) in SOBEL_X.iter().zip(SOBEL_Y.iter()).enumerate() {
        let py = clamp_index(y as i32 + ky as i32 - 1, h) as u32;
        for kx in 0..3 {
            let px = clamp_index(x as i32 + kx as i32 - 1, w) as u32;
            let lum = i32::from(view.luminance(px, py));
            gx += lum * row_x[kx];
            gy += lum * row_y[kx];
        }
    }
    (gx, gy)
}

/// Magnitude `(|gx| + |gy|) >> 2`, saturée sur un octet.
#[inline(always)]
#[must_use]
pub const fn magnitude(gx: i32, gy: i32) -> u8 {
    clamp_byte((abs(gx) + abs(gy)) >> 2)
}

/// Détection de contours Sobel.
///
/// Polarité inversée par rapport aux autres effets : sans `invert`, un fort
/// gradient donne un glyphe dense.
pub fn process_edge(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    let grid = SampleGrid::for_settings(view.width(), view.height(), settings);
    grid.begin(out, settings.color_mode);
    let invert = settings.invert;

    grid.for_each_cell(out, |cell, out| {
        let (gx, gy) = gradient(view, cell.src_x, cell.src_y);
        let edge = magnitude(gx, gy);
        out.push_glyph(if invert {
            map_glyph(edge, RAMP_DEFAULT)
        } else {
            map_glyph_inverted(edge, RAMP_DEFAULT)
        });
        let (r, g, b) = view.rgb(cell.src_x, cell.src_y);
        out.push_color(r, g, b);
    });
}
