//! # Formats
//!
//! On-disk and on-wire encodings. Pure transformations, no I/O.

mod draft;

pub use draft::*;
