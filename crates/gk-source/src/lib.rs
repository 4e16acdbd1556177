//! Image and video sources for glyphkit.
//!
//! [`ImageService`] decodes still images; [`VideoService`] owns video
//! sessions, drives ffmpeg through the [`FrameDecoder`] seam, caches raw
//! frames on disk and streams converted frames with cancellation.

pub mod cache;
pub mod cancel;
pub mod decoder;
pub mod error;
pub mod image_service;
pub mod metrics;
pub mod service;
pub mod session;
pub mod stream;

#[cfg(test)]
mod fake;

pub use cancel::CancelToken;
pub use decoder::{ExtractRequest, Ffmpeg, FrameDecoder, ProbeInfo, RawPipe};
pub use error::SourceError;
pub use image_service::ImageService;
pub use metrics::{MetricsSnapshot, ServiceMetrics};
pub use service::VideoService;
pub use session::{SessionInfo, VideoSession};
pub use stream::FrameStream;
