//! MapTiles: a binary container for map tiles addressed by quadkey.
//!
//! A container holds a header, a metadata block, a hierarchical index of fixed-size index blocks and the tile
//! blocks themselves. Identical tile payloads are stored once, identified by their MD5 hash. All integers and
//! doubles are big-endian.
//!
//! - [`ContainerWriter`] writes a container in one pass and completes it with [`ContainerWriter::finalize`].
//! - [`ContainerReader`] opens a container and looks up tiles concurrently.
//! - [`schema`] describes the layout of every block, [`codec`] reads and writes single fields.
//!
//! Errors are returned as [`anyhow::Error`]. Violations of the format can be inspected with
//! `err.downcast_ref::<MapTilesError>()`.

pub mod codec;

mod config;
pub use config::*;

mod container;
pub use container::*;

mod error;
pub use error::*;

mod index;
pub use index::*;

mod quadkey;
pub use quadkey::*;

pub mod schema;
