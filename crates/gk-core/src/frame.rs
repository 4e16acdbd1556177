use serde::Serialize;

use crate::bitops;
use crate::error::CoreError;

/// Octets par pixel RGB24.
pub const BYTES_PER_PIXEL: usize = 3;

/// Taille attendue d'un buffer RGB24, `None` en cas de débordement.
///
/// # Example
/// ```
/// use gk_core::frame::rgb_len;
/// assert_eq!(rgb_len(4, 2), Some(24));
/// ```
#[must_use]
pub fn rgb_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

fn check_len(len: usize, width: u32, height: u32) -> Result<(), CoreError> {
    let expected = rgb_len(width, height).ok_or(CoreError::InvalidDimensions { width, height })?;
    if len == expected {
        Ok(())
    } else {
        Err(CoreError::BufferSize {
            expected,
            actual: len,
        })
    }
}

/// Vue en lecture seule sur un buffer RGB24 (R,G,B, row-major, sans padding).
///
/// L'invariant `data.len() == width * height * 3` est vérifié à la
/// construction : les effets peuvent indexer sans contrôle.
///
/// # Example
/// ```
/// use gk_core::frame::PixelView;
/// let data = [255u8, 0, 0, 0, 255, 0];
/// let view = PixelView::new(&data, 2, 1).unwrap();
/// assert_eq!(view.rgb(1, 0), (0, 255, 0));
/// assert!(PixelView::new(&data, 3, 1).is_err());
/// ```
#[derive(Clone, Copy, Debug)]
pub struct PixelView<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> PixelView<'a> {
    /// Wrap a raw RGB24 slice.
    ///
    /// # Errors
    /// Returns [`CoreError::BufferSize`] if the slice length is not
    /// `width * height * 3`.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, CoreError> {
        check_len(data.len(), width, height)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    #[inline(always)]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline(always)]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Accès au pixel (x, y) → (r, g, b).
    #[inline(always)]
    #[must_use]
    pub fn rgb(&self, x: u32, y: u32) -> (u8, u8, u8) {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        (self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }

    /// Luminance entière du pixel (x, y).
    #[inline(always)]
    #[must_use]
    pub fn luminance(&self, x: u32, y: u32) -> u8 {
        let (r, g, b) = self.rgb(x, y);
        bitops::luminance(r, g, b)
    }
}

/// Frame RGB24 possédée (image décodée, frame vidéo extraite ou lue du cache).
///
/// # Example
/// ```
/// use gk_core::frame::RgbFrame;
/// let frame = RgbFrame::filled(4, 4, [10, 20, 30]);
/// assert_eq!(frame.view().rgb(3, 3), (10, 20, 30));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgbFrame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl RgbFrame {
    /// Take ownership of a raw RGB24 buffer.
    ///
    /// # Errors
    /// Returns [`CoreError::BufferSize`] if the buffer length is not
    /// `width * height * 3`.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, CoreError> {
        check_len(data.len(), width, height)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Frame uniforme, pratique pour les tests et les benchs.
    #[must_use]
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let pixels = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixels * BYTES_PER_PIXEL);
        for _ in 0..pixels {
            data.extend_from_slice(&rgb);
        }
        Self {
            data,
            width,
            height,
        }
    }

    #[must_use]
    pub fn view(&self) -> PixelView<'_> {
        PixelView {
            data: &self.data,
            width: self.width,
            height: self.height,
        }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Buffer de sortie réutilisable : glyphes + plan couleur optionnel.
///
/// CONTRAT : `begin()` réserve `cols*rows + rows` glyphes et
/// `cols*rows*3` octets couleur ; en régime établi, un même buffer passé à
/// chaque appel n'alloue plus.
///
/// # Example
/// ```
/// use gk_core::frame::GlyphBuffer;
/// let mut out = GlyphBuffer::new();
/// out.begin(2, 1, true);
/// out.push_glyph('@');
/// out.push_color(1, 2, 3);
/// out.push_glyph(' ');
/// out.push_color(4, 5, 6);
/// out.end_row();
/// assert_eq!(out.text(), "@ \n");
/// assert_eq!(out.colors(), Some(&[1u8, 2, 3, 4, 5, 6][..]));
/// ```
#[derive(Clone, Debug, Default)]
pub struct GlyphBuffer {
    text: String,
    colors: Vec<u8>,
    columns: u32,
    rows: u32,
    colored: bool,
    scratch: Vec<i32>,
}

impl GlyphBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new `columns × rows` grid.
    ///
    /// An empty grid never carries a color plane.
    pub fn begin(&mut self, columns: u32, rows: u32, colored: bool) {
        let (columns, rows) = if columns == 0 || rows == 0 {
            (0, 0)
        } else {
            (columns, rows)
        };
        let cells = columns as usize * rows as usize;
        self.columns = columns;
        self.rows = rows;
        self.colored = colored && cells > 0;
        self.text.clear();
        // glyphes multi-octets (blocs, braille, katakana) : 3 octets UTF-8 max ici
        self.text.reserve((cells + rows as usize) * 3);
        self.colors.clear();
        if self.colored {
            self.colors.reserve(cells * BYTES_PER_PIXEL);
        }
    }

    #[inline(always)]
    pub fn push_glyph(&mut self, ch: char) {
        self.text.push(ch);
    }

    /// Ajoute la couleur de la cellule courante. Ignoré en monochrome.
    #[inline(always)]
    pub fn push_color(&mut self, r: u8, g: u8, b: u8) {
        if self.colored {
            self.colors.extend_from_slice(&[r, g, b]);
        }
    }

    #[inline(always)]
    pub fn end_row(&mut self) {
        self.text.push('\n');
    }

    #[must_use]
    pub fn is_colored(&self) -> bool {
        self.colored
    }

    #[must_use]
    pub fn columns(&self) -> u32 {
        self.columns
    }

    #[must_use]
    pub fn rows(&self) -> u32 {
        self.rows
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn colors(&self) -> Option<&[u8]> {
        self.colored.then_some(self.colors.as_slice())
    }

    /// Emprunte le buffer de travail entier (diffusion d'erreur), remis à zéro
    /// sur `len` éléments. À rendre via [`GlyphBuffer::return_scratch`].
    #[must_use]
    pub fn take_scratch(&mut self, len: usize) -> Vec<i32> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        scratch.resize(len, 0);
        scratch
    }

    pub fn return_scratch(&mut self, scratch: Vec<i32>) {
        self.scratch = scratch;
    }

    /// Copie le contenu courant dans une frame indépendante.
    #[must_use]
    pub fn to_frame(&self) -> GlyphFrame {
        GlyphFrame {
            text: self.text.clone(),
            columns: self.columns,
            rows: self.rows,
            colors: self.colors().map(<[u8]>::to_vec),
            frame_index: 0,
            total_frames: 1,
        }
    }

    /// Consomme le buffer sans copie.
    #[must_use]
    pub fn into_frame(self) -> GlyphFrame {
        GlyphFrame {
            colors: self.colored.then_some(self.colors),
            text: self.text,
            columns: self.columns,
            rows: self.rows,
            frame_index: 0,
            total_frames: 1,
        }
    }
}

/// Résultat d'une conversion : texte + plan couleur optionnel.
///
/// `colors.len() == columns * rows * 3` quand présent ; `text` contient
/// exactement `rows` fins de ligne.
///
/// # Example
/// ```
/// use gk_core::frame::GlyphFrame;
/// let f = GlyphFrame::empty();
/// assert_eq!(f.columns, 0);
/// assert!(f.text.is_empty());
/// assert_eq!(f.total_frames, 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphFrame {
    /// Glyphes, une fin de ligne `\n` par rangée.
    pub text: String,
    /// Largeur en glyphes.
    pub columns: u32,
    /// Hauteur en glyphes.
    pub rows: u32,
    /// RGB par glyphe, row-major. `None` = monochrome.
    pub colors: Option<Vec<u8>>,
    /// Index de frame (0 pour une image).
    pub frame_index: u32,
    /// Nombre total de frames (1 pour une image).
    pub total_frames: u32,
}

impl GlyphFrame {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            columns: 0,
            rows: 0,
            colors: None,
            frame_index: 0,
            total_frames: 1,
        }
    }

    /// Attache la position dans la séquence vidéo.
    #[must_use]
    pub fn with_position(mut self, frame_index: u32, total_frames: u32) -> Self {
        self.frame_index = frame_index;
        self.total_frames = total_frames;
        self
    }

    /// Itère les lignes de glyphes (sans les fins de ligne).
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_view_rejects_short_buffer() {
        let data = vec![0u8; 11];
        let err = PixelView::new(&data, 2, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::BufferSize {
                expected: 12,
                actual: 11
            }
        ));
    }

    #[test]
    fn zero_sized_view_is_valid() {
        let view = PixelView::new(&[], 0, 0).unwrap();
        assert_eq!(view.width(), 0);
        assert!(RgbFrame::new(Vec::new(), 0, 5).is_ok());
    }

    #[test]
    fn empty_grid_has_no_color_plane() {
        let mut out = GlyphBuffer::new();
        out.begin(0, 3, true);
        assert!(!out.is_colored());
        assert_eq!(out.rows(), 0);
        let frame = out.into_frame();
        assert_eq!(frame, GlyphFrame::empty());
    }

    #[test]
    fn buffer_reuse_resets_content() {
        let mut out = GlyphBuffer::new();
        out.begin(1, 1, true);
        out.push_glyph('#');
        out.push_color(9, 9, 9);
        out.end_row();
        out.begin(1, 1, false);
        out.push_glyph('.');
        out.push_color(9, 9, 9);
        out.end_row();
        let frame = out.to_frame();
        assert_eq!(frame.text, ".\n");
        assert!(frame.colors.is_none());
    }

    #[test]
    fn scratch_is_zeroed_on_take() {
        let mut out = GlyphBuffer::new();
        let mut s = out.take_scratch(4);
        s[2] = 77;
        out.return_scratch(s);
        let s = out.take_scratch(4);
        assert_eq!(s, vec![0; 4]);
    }
}
