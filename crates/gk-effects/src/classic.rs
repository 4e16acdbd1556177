//! Effets à rampe : `classic`, `color` et `block`.
//!
//! Un pixel échantillonné par cellule, luminance entière, index de rampe par
//! multiplication + décalage.

use gk_core::bitops::luminance;
use gk_core::charset::{RAMP_BLOCKS, RAMP_DEFAULT, map_glyph, map_glyph_inverted};
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

use crate::grid::SampleGrid;

/// Map each sampled pixel onto `ramp`, mirrored when `settings.invert`.
///
/// The color plane carries the sampled pixel when `colored` is set.
///
/// # Example
/// ```
/// use gk_core::charset::RAMP_DEFAULT;
/// use gk_core::frame::{GlyphBuffer, RgbFrame};
/// use gk_core::settings::ConversionSettings;
/// use gk_effects::classic::process_ramp;
///
/// let frame = RgbFrame::filled(16, 16, [255, 0, 0]);
/// let settings = ConversionSettings { step: 16, ..Default::default() };
/// let mut out = GlyphBuffer::new();
/// process_ramp(&frame.view(), &settings, &mut out, RAMP_DEFAULT, false);
/// assert_eq!(out.text(), "*\n");
/// ```
pub fn process_ramp(
    view: &PixelView<'_>,
    settings: &ConversionSettings,
    out: &mut GlyphBuffer,
    ramp: &[char],
    colored: bool,
) {
    let grid = SampleGrid::for_settings(view.width(), view.height(), settings);
    grid.begin(out, colored);
    let invert = settings.invert;

    grid.for_each_cell(out, |cell, out| {
        let (r, g, b) = view.rgb(cell.src_x, cell.src_y);
        let lum = luminance(r, g, b);
        out.push_glyph(if invert {
            map_glyph_inverted(lum, ramp)
        } else {
            map_glyph(lum, ramp)
        });
        out.push_color(r, g, b);
    });
}

/// Rampe par défaut, couleur seulement en `color_mode`.
pub fn process_classic(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    process_ramp(view, settings, out, RAMP_DEFAULT, settings.color_mode);
}

/// Rampe par défaut, plan couleur toujours émis.
pub fn process_color(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    process_ramp(view, settings, out, RAMP_DEFAULT, true);
}

/// Rampe de blocs Unicode `█▓▒░ `.
pub fn process_block(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    process_ramp(view, settings, out, RAMP_BLOCKS, settings.color_mode);
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_core::frame::RgbFrame;

    fn settings(step: u32) -> ConversionSettings {
        ConversionSettings {
            step,
            ..Default::default()
        }
    }

    #[test]
    fn red_square_maps_to_star() {
        let frame = RgbFrame::filled(16, 16, [255, 0, 0]);
        let mut out = GlyphBuffer::new();
        process_classic(&frame.view(), &settings(16), &mut out);
        assert_eq!(out.text(), "*\n");
        assert_eq!((out.columns(), out.rows()), (1, 1));
        assert!(out.colors().is_none());
    }

    #[test]
    fn invert_mirrors_the_ramp() {
        let frame = RgbFrame::filled(4, 4, [0, 0, 0]);
        let mut out = GlyphBuffer::new();
        process_classic(&frame.view(), &settings(2), &mut out);
        assert_eq!(out.text(), "@@\n@@\n");

        let inverted = ConversionSettings {
            invert: true,
            ..settings(2)
        };
        process_classic(&frame.view(), &inverted, &mut out);
        assert_eq!(out.text(), "  \n  \n");
    }

    #[test]
    fn color_effect_always_emits_colors() {
        let frame = RgbFrame::filled(6, 3, [10, 200, 30]);
        let mut out = GlyphBuffer::new();
        process_color(&frame.view(), &settings(3), &mut out);
        assert_eq!(out.colors(), Some(&[10u8, 200, 30, 10, 200, 30][..]));
    }

    #[test]
    fn classic_color_mode_samples_original_pixel() {
        // deux colonnes de 2 px : seul le pixel (0,0) / (2,0) est lu
        let data = vec![
            1, 2, 3, 9, 9, 9, 4, 5, 6, 9, 9, 9, //
            9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9, 9,
        ];
        let frame = RgbFrame::new(data, 4, 2).unwrap();
        let s = ConversionSettings {
            color_mode: true,
            ..settings(2)
        };
        let mut out = GlyphBuffer::new();
        process_classic(&frame.view(), &s, &mut out);
        assert_eq!(out.colors(), Some(&[1u8, 2, 3, 4, 5, 6][..]));
    }

    #[test]
    fn uniform_gray_is_uniform() {
        for v in [0u8, 60, 128, 200, 255] {
            let frame = RgbFrame::filled(24, 12, [v, v, v]);
            let mut out = GlyphBuffer::new();
            process_block(&frame.view(), &settings(3), &mut out);
            let first = out.text().chars().next().unwrap();
            assert!(out.text().chars().filter(|&c| c != '\n').all(|c| c == first));
        }
    }

    #[test]
    fn block_uses_unicode_blocks() {
        let frame = RgbFrame::filled(2, 2, [0, 0, 0]);
        let mut out = GlyphBuffer::new();
        process_block(&frame.view(), &settings(2), &mut out);
        assert_eq!(out.text(), "█\n");
    }
}
