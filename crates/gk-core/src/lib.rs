//! Primitives, settings, and shared frame types for glyphkit.
//!
//! This crate contains the integer pixel math, the glyph ramps, the
//! conversion settings and the service configuration shared across the
//! glyphkit workspace.

pub mod bitops;
pub mod charset;
pub mod config;
pub mod error;
pub mod frame;
pub mod settings;

pub use charset::GlyphRamp;
pub use config::ServiceConfig;
pub use error::CoreError;
pub use frame::{GlyphBuffer, GlyphFrame, PixelView, RgbFrame};
pub use settings::ConversionSettings;
