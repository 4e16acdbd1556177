//! Glyph effect engine for glyphkit.
//!
//! Ten integer-only transforms from an RGB24 pixel view to a glyph grid,
//! selected by name through an [`EffectRegistry`]. Every effect writes into a
//! caller-owned [`gk_core::GlyphBuffer`] and never fails.

pub mod braille;
pub mod classic;
pub mod dither;
pub mod edge;
pub mod grid;
pub mod halftone;
pub mod invert;
pub mod matrix;
pub mod registry;
pub mod threshold;

pub use registry::{BUILTIN_EFFECTS, Effect, EffectFn, EffectRegistry};
