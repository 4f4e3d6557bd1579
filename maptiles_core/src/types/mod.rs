//! Contains the byte containers and helpers shared by readers and writers.

mod blob;
pub use blob::*;

mod byte_range;
pub use byte_range::*;

mod limited_cache;
pub use limited_cache::*;
