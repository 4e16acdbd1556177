use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// Pixel buffer length does not match `width * height * 3`.
    #[error("Taille de buffer RGB invalide : attendu {expected} octets, reçu {actual}")]
    BufferSize {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count.
        actual: usize,
    },
}
