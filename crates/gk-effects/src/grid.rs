use gk_core::frame::GlyphBuffer;
use gk_core::settings::ConversionSettings;

/// One cell of the sampling grid: glyph coordinates + source pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Column in the glyph grid.
    pub x: u32,
    /// Row in the glyph grid.
    pub y: u32,
    /// Sampled source pixel column (`x * step`).
    pub src_x: u32,
    /// Sampled source pixel row (`y * step`).
    pub src_y: u32,
}

/// Grille d'échantillonnage partagée par les effets à un pixel par cellule.
///
/// `cols * step <= width` et `rows * step <= height` tiennent toujours, y
/// compris après l'ajustement `max_columns`. Une grille vide a `cols == rows == 0`.
///
/// # Example
/// ```
/// use gk_effects::grid::SampleGrid;
/// let grid = SampleGrid::new(640, 480, 8, 0);
/// assert_eq!((grid.cols, grid.rows), (80, 60));
///
/// // 640 / 8 = 80 colonnes > 40 : le pas passe à 640 / 40 = 16
/// let capped = SampleGrid::new(640, 480, 8, 40);
/// assert_eq!((capped.step, capped.cols, capped.rows), (16, 40, 30));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleGrid {
    /// Effective sampling step in pixels (≥ 1).
    pub step: u32,
    /// Glyph columns.
    pub cols: u32,
    /// Glyph rows.
    pub rows: u32,
}

impl SampleGrid {
    #[must_use]
    pub fn new(width: u32, height: u32, step: u32, max_columns: u32) -> Self {
        let mut step = step.max(1);
        let mut cols = width / step;
        let mut rows = height / step;
        if cols == 0 || rows == 0 {
            return Self::empty(step);
        }

        if max_columns > 0 && cols > max_columns {
            // cols > max_columns implique width / max_columns >= step >= 1
            step = width / max_columns;
            cols = width / step;
            rows = height / step;
            if rows == 0 {
                return Self::empty(step);
            }
        }

        Self { step, cols, rows }
    }

    #[must_use]
    pub fn for_settings(width: u32, height: u32, settings: &ConversionSettings) -> Self {
        Self::new(width, height, settings.step, settings.max_columns)
    }

    fn empty(step: u32) -> Self {
        Self {
            step,
            cols: 0,
            rows: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// Number of glyph cells.
    #[must_use]
    pub fn cells(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Prépare `out` pour cette grille.
    pub fn begin(&self, out: &mut GlyphBuffer, colored: bool) {
        out.begin(self.cols, self.rows, colored);
    }

    /// Visite les cellules en ordre row-major, puis termine chaque rangée.
    pub fn for_each_cell(
        &self,
        out: &mut GlyphBuffer,
        mut visit: impl FnMut(Cell, &mut GlyphBuffer),
    ) {
        for y in 0..self.rows {
            let src_y = y * self.step;
            for x in 0..self.cols {
                visit(
                    Cell {
                        x,
                        y,
                        src_x: x * self.step,
                        src_y,
                    },
                    out,
                );
            }
            out.end_row();
        }
    }
}
