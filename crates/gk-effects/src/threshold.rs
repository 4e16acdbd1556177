use gk_core::bitops::threshold_bit;
use gk_core::frame::{GlyphBuffer, PixelView};
use gk_core::settings::ConversionSettings;

use crate::grid::SampleGrid;

/// Binary threshold: `'#'` above `settings.threshold`, `' '` otherwise.
///
/// `invert` flips the test. Output is always monochrome.
///
/// # Example
/// ```
/// use gk_core::frame::{GlyphBuffer, RgbFrame};
/// use gk_core::settings::ConversionSettings;
/// use gk_effects::threshold::process_threshold;
///
/// let settings = ConversionSettings { step: 1, ..Default::default() };
/// let mut out = GlyphBuffer::new();
/// process_threshold(&RgbFrame::filled(1, 1, [200, 200, 200]).view(), &settings, &mut out);
/// assert_eq!(out.text(), "#\n");
/// ```
pub fn process_threshold(
    view: &PixelView<'_>,
    settings: &ConversionSettings,
    out: &mut GlyphBuffer,
) {
    let grid = SampleGrid::for_settings(view.width(), view.height(), settings);
    grid.begin(out, false);
    let threshold = i32::from(settings.threshold);
    let flip = u32::from(settings.invert);

    grid.for_each_cell(out, |cell, out| {
        let lum = i32::from(view.luminance(cell.src_x, cell.src_y));
        let bit = threshold_bit(lum, threshold) ^ flip;
        // ' ' = 0x20, '#' = 0x23
        out.push_glyph(char::from(0x20 + (bit as u8) * 3));
    });
}
