use gk_core::bitops::{luminance, threshold_bit};
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

/// Braille base codepoint (U+2800).
pub const BRAILLE_BASE: u32 = 0x2800;

/// Bit index of each sub-sample, `[row][column]` inside a 2×4 cell.
///
/// ```text
///  bit0 bit3
///  bit1 bit4
///  bit2 bit5
///  bit6 bit7
/// ```
pub const BRAILLE_BITS: [[u8; 2]; 4] = [[0, 3], [1, 4], [2, 5], [6, 7]];

/// Encode a dot mask as a Braille character.
///
/// # Example
/// ```
/// use gk_effects::braille::encode_braille;
/// assert_eq!(encode_braille(0), '\u{2800}'); // empty
/// assert_eq!(encode_braille(0xFF), '\u{28FF}'); // full
/// ```
#[inline(always)]
#[must_use]
pub fn encode_braille(mask: u8) -> char {
    char::from_u32(BRAILLE_BASE + u32::from(mask)).unwrap_or(' ')
}

/// Moyenne RGB d'un bloc : `>> 3` pour exactement 8 échantillons, division
/// entière sinon.
///
/// # Example
/// ```
/// use gk_effects::braille::block_average;
/// assert_eq!(block_average([800, 16, 2047], 8), [100, 2, 255]);
/// assert_eq!(block_average([600, 0, 5], 6), [100, 0, 0]);
/// assert_eq!(block_average([0, 0, 0], 0), [0, 0, 0]);
/// ```
#[inline(always)]
#[must_use]
pub fn block_average(sum: [u32; 3], samples: u32) -> [u8; 3] {
    match samples {
        0 => [0; 3],
        8 => sum.map(|c| (c >> 3) as u8),
        n => sum.map(|c| (c / n) as u8),
    }
}

/// Grille Braille : chaque glyphe couvre 2×4 sous-échantillons espacés de
/// `sub_step` pixels, avec `sub_step = max(1, step / 2)`.
///
/// # Example
/// ```
/// use gk_effects::braille::BrailleGrid;
/// let grid = BrailleGrid::new(640, 480, 8, 0);
/// assert_eq!((grid.sub_step, grid.cols, grid.rows), (4, 80, 30));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BrailleGrid {
    pub sub_step: u32,
    pub cols: u32,
    pub rows: u32,
}

impl BrailleGrid {
    #[must_use]
    pub fn new(width: u32, height: u32, step: u32, max_columns: u32) -> Self {
        let mut sub_step = (step / 2).max(1);
        let mut cols = width / (sub_step * 2);
        let mut rows = height / (sub_step * 4);
        if cols == 0 || rows == 0 {
            return Self::empty(sub_step);
        }

        if max_columns > 0 && cols > max_columns {
            sub_step = (width / (max_columns.saturating_mul(2))).max(1);
            cols = width / (sub_step * 2);
            rows = height / (sub_step * 4);
            if cols == 0 || rows == 0 {
                return Self::empty(sub_step);
            }
        }

        Self {
            sub_step,
            cols,
            rows,
        }
    }

    fn empty(sub_step: u32) -> Self {
        Self {
            sub_step,
            cols: 0,
            rows: 0,
        }
    }
}

/// Encodage Braille 2×4 : un bit par sous-échantillon au-dessus du seuil.
///
/// La couleur (en `color_mode`) est la moyenne du bloc.
pub fn process_braille(view: &PixelView<'_>, settings: &ConversionSettings, out: &mut GlyphBuffer) {
    let (width, height) = (view.width(), view.height());
    let grid = BrailleGrid::new(width, height, settings.step, settings.max_columns);
    out.begin(grid.cols, grid.rows, settings.color_mode);

    let threshold = i32::from(settings.threshold);
    let flip = u32::from(settings.invert);
    let sub = grid.sub_step;

    for cy in 0..grid.rows {
        for cx in 0..grid.cols {
            let mut mask = 0u32;
            let mut sum = [0u32; 3];
            let mut samples = 0u32;

            for (dy, row_bits) in (0u32..).zip(BRAILLE_BITS) {
                for (dx, bit_index) in (0u32..).zip(row_bits) {
                    let px = cx * sub * 2 + dx * sub;
                    let py = cy * sub * 4 + dy * sub;
                    if px >= width || py >= height {
                        continue;
                    }

                    let (r, g, b) = view.rgb(px, py);
                    let bit = threshold_bit(i32::from(luminance(r, g, b)), threshold) ^ flip;
                    mask |= bit << bit_index;

                    sum[0] += u32::from(r);
                    sum[1] += u32::from(g);
                    sum[2] += u32::from(b);
                    samples += 1;
                }
            }

            out.push_glyph(encode_braille(mask as u8));
            let [r, g, b] = block_average(sum, samples);
            out.push_color(r, g, b);
        }
        out.end_row();
    }
}
