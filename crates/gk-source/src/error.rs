use gk_core::CoreError;
use thiserror::Error;

/// Errors originating from image decoding and the video pipeline.
///
/// Unknown sessions are `None`, unknown effects fall back to `classic`:
/// neither is an error.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Encoded image is malformed or in an unsupported format.
    #[error("Décodage image impossible : {0}")]
    Decode(#[from] image::ImageError),

    /// ffprobe failed or returned no usable video stream.
    #[error("Sonde vidéo échouée : {0}")]
    Probe(String),

    /// ffmpeg produced no frame.
    #[error("Extraction de frame échouée : {0}")]
    Extract(String),

    /// Raw stream ended in the middle of a frame.
    #[error("Flux brut tronqué : attendu {expected} octets, reçu {actual}")]
    ShortRead {
        /// Frame size in bytes.
        expected: usize,
        /// Bytes read before end of stream.
        actual: usize,
    },

    /// Filesystem or pipe error.
    #[error("Erreur I/O : {0}")]
    Io(#[from] std::io::Error),

    /// External process could not be started.
    #[error("Impossible de lancer {program} : {source}")]
    Spawn {
        /// Binary name.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Conversion task panicked or was aborted.
    #[error("Tâche de conversion interrompue : {0}")]
    Join(#[from] tokio::task::JoinError),

    /// Frame geometry mismatch.
    #[error(transparent)]
    Core(#[from] CoreError),
}
