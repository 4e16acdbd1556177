use gk_core::bitops::{clamp_byte, luminance, position_hash};
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

use crate::grid::SampleGrid;

/// Katakana demi-chasse + chiffres hexadécimaux.
pub const MATRIX_GLYPHS: &[char] = &[
    'ｱ', 'ｲ', 'ｳ', 'ｴ', 'ｵ', 'ｶ', 'ｷ', 'ｸ', 'ｹ', 'ｺ', 'ｻ', 'ｼ', 'ｽ', 'ｾ', 'ｿ', 'ﾀ', 'ﾁ', 'ﾂ',
    'ﾃ', 'ﾄ', 'ﾅ', 'ﾆ', 'ﾇ', 'ﾈ', 'ﾉ', 'ﾊ', 'ﾋ', 'ﾌ', 'ﾍ', 'ﾎ', 'ﾏ', 'ﾐ', 'ﾑ', 'ﾒ', 'ﾓ', 'ﾔ',
    'ﾕ', 'ﾖ', 'ﾗ', 'ﾘ', 'ﾙ', 'ﾚ', 'ﾛ', 'ﾜ', 'ﾝ', '0', '1', '2', '3', '4', '5', '6', '7', '8',
    '9', 'A', 'B', 'C', 'D', 'E', 'F',
];

/// Couleur d'un glyphe visible : vert dominant + gigue dérivée du hash.
///
/// # Example
/// ```
/// use gk_effects::matrix::rain_color;
/// assert_eq!(rain_color(200, 0), (25, 200, 50));
/// assert_eq!(rain_color(250, 0x1F00), (31, 255, 63));
/// ```
#[inline(always)]
#[must_use]
pub const fn rain_color(brightness: u8, hash: u32) -> (u8, u8, u8) {
    let green = clamp_byte(brightness as i32 + ((hash >> 8) & 0x1F) as i32);
    (green >> 3, green, green >> 2)
}

/// Pluie de glyphes déterministe. Le plan couleur est toujours émis.
///
/// Le motif dépend de `settings.seed` (index de frame en vidéo) : même
/// entrée, même seed → sortie identique octet pour octet.
pub fn process_matrix(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    let grid = SampleGrid::for_settings(view.width(), view.height(), settings);
    grid.begin(out, true);
    let seed = settings.seed;
    let invert = settings.invert;
    let count = MATRIX_GLYPHS.len() as u32;

    grid.for_each_cell(out, |cell, out| {
        let (r, g, b) = view.rgb(cell.src_x, cell.src_y);
        let lum = luminance(r, g, b);
        let brightness = if invert { 255 - lum } else { lum };
        let hash = position_hash(cell.x, cell.y, seed);

        if hash & 0xFF < u32::from(brightness) {
            out.push_glyph(MATRIX_GLYPHS[(hash % count) as usize]);
            let (cr, cg, cb) = rain_color(brightness, hash);
            out.push_color(cr, cg, cb);
        } else {
            // halo vert discret
            out.push_glyph(' ');
            out.push_color(0, brightness >> 4, 0);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_core::frame::{GlyphFrame, RgbFrame};

    fn render(rgb: [u8; 3], seed: u32, invert: bool) -> GlyphFrame {
        let settings = ConversionSettings {
            step: 1,
            seed,
            invert,
            ..Default::default()
        };
        let mut out = GlyphBuffer::new();
        process_matrix(&RgbFrame::filled(48, 24, rgb).view(), &settings, &mut out);
        out.into_frame()
    }

    #[test]
    fn glyph_set_has_61_distinct_entries() {
        let mut sorted = MATRIX_GLYPHS.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 61);
    }

    #[test]
    fn black_input_is_all_blank_and_unlit() {
        let frame = render([0, 0, 0], 3, false);
        assert!(frame.lines().all(|l| l.chars().all(|c| c == ' ')));
        assert!(frame.colors.unwrap().iter().all(|&c| c == 0));
    }

    #[test]
    fn invisible_cells_keep_faint_green() {
        // invert : blanc → brightness 0 ; gris 160 inversé → 95, halo = 95 >> 4
        let frame = render([160, 160, 160], 0, true);
        let colors = frame.colors.unwrap();
        let text: Vec<char> = frame.text.chars().filter(|&c| c != '\n').collect();
        for (i, ch) in text.iter().enumerate() {
            if *ch == ' ' {
                assert_eq!(&colors[i * 3..i * 3 + 3], &[0, 95 >> 4, 0]);
            }
        }
    }

    #[test]
    fn same_seed_is_reproducible() {
        assert_eq!(render([200, 180, 90], 42, false), render([200, 180, 90], 42, false));
    }

    #[test]
    fn seed_changes_the_pattern() {
        assert_ne!(render([200, 180, 90], 1, false).text, render([200, 180, 90], 2, false).text);
    }

    #[test]
    fn always_colored() {
        let frame = render([255, 255, 255], 0, false);
        assert_eq!(frame.colors.map(|c| c.len()), Some(48 * 24 * 3));
        assert!(frame.text.chars().any(|c| MATRIX_GLYPHS.contains(&c)));
    }
}
