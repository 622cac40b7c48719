#![warn(clippy::pedantic)]

//! Rune transcoding: UTF-8/single-byte charset conversion, the VT100
//! alternate character set, and the ASCII rune-fallback map
//! (spec.md §4.3).

pub mod acs;
pub mod charset;
mod encoder;
pub mod fallback;

pub use charset::{CharsetError, Transcoder};
pub use encoder::RuneEncoder;
pub use fallback::default_fallback_map;
