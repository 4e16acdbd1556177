//! Diffusion d'erreur Floyd–Steinberg en virgule fixe.
//!
//! La luminance est stockée `<< 4` dans le buffer de travail du
//! [`GlyphBuffer`] ; l'erreur de quantification est répartie à droite (7/16),
//! en bas à gauche (3/16), en bas (5/16) et en bas à droite (1/16) via
//! `(error * k) >> 4`. L'ordre row-major est obligatoire.

use gk_core::bitops::{clamp_byte, map_index};
use gk_core::charset::RAMP_DEFAULT;
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

use crate::grid::SampleGrid;

/// Décalage de la virgule fixe (×16).
pub const PRECISION_SHIFT: u32 = 4;

/// Split a quantization error into `[right, below_left, below, below_right]`.
///
/// Each share is floored, so the four shares sum to the error minus at most 3.
///
/// # Example
/// ```
/// use gk_effects::dither::diffuse;
/// assert_eq!(diffuse(160), [70, 30, 50, 10]);
/// assert_eq!(diffuse(0), [0; 4]);
/// ```
#[inline(always)]
#[must_use]
pub const fn diffuse(error: i32) -> [i32; 4] {
    [
        (error * 7) >> 4,
        (error * 3) >> 4,
        (error * 5) >> 4,
        error >> 4,
    ]
}

/// Niveau reconstruit (échelle ×16) du glyphe `index` parmi `levels`.
#[inline(always)]
#[must_use]
fn level_value(index: usize, levels: usize) -> i32 {
    (((index << 8) / levels) as i32) << PRECISION_SHIFT
}

/// Rampe par défaut quantifiée, erreur diffusée sur les cellules voisines.
pub fn process_dither(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    let grid = SampleGrid::for_settings(view.width(), view.height(), settings);
    grid.begin(out, settings.color_mode);
    if grid.is_empty() {
        return;
    }

    let ramp = RAMP_DEFAULT;
    let levels = ramp.len();
    let cols = grid.cols as usize;
    let rows = grid.rows as usize;
    let invert = settings.invert;

    let mut lum_buf = out.take_scratch(grid.cells());
    for (y, row) in lum_buf.chunks_exact_mut(cols).enumerate() {
        let src_y = y as u32 * grid.step;
        for (x, slot) in row.iter_mut().enumerate() {
            let mut lum = view.luminance(x as u32 * grid.step, src_y);
            if invert {
                lum = 255 - lum;
            }
            *slot = i32::from(lum) << PRECISION_SHIFT;
        }
    }

    grid.for_each_cell(out, |cell, out| {
        let (x, y) = (cell.x as usize, cell.y as usize);
        let idx = y * cols + x;
        let old = lum_buf[idx];

        let quantized = clamp_byte(old >> PRECISION_SHIFT);
        let level = map_index(quantized, levels).min(levels - 1);
        out.push_glyph(ramp[level]);

        let [right, below_left, below, below_right] = diffuse(old - level_value(level, levels));
        if x + 1 < cols {
            lum_buf[idx + 1] += right;
        }
        if y + 1 < rows {
            if x > 0 {
                lum_buf[idx + cols - 1] += below_left;
            }
            lum_buf[idx + cols] += below;
            if x + 1 < cols {
                lum_buf[idx + cols + 1] += below_right;
            }
        }

        let (r, g, b) = view.rgb(cell.src_x, cell.src_y);
        out.push_color(r, g, b);
    });

    out.return_scratch(lum_buf);
}
