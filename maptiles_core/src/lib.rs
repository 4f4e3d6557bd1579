//! Core building blocks for MapTiles containers: byte blobs, byte ranges, a bounded cache,
//! and the big-endian value/data I/O layer used by the container crate.

pub mod io;

pub mod types;
pub use types::*;
