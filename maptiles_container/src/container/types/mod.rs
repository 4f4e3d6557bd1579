mod additional_metadata;
mod block_reader;
mod file_header;
mod index_block;
mod index_entry;
mod metadata_block;
mod tile_block;
mod tile_store;

pub use additional_metadata::*;
pub use block_reader::*;
pub use file_header::*;
pub use index_block::*;
pub use index_entry::*;
pub use metadata_block::*;
pub use tile_block::*;
pub use tile_store::*;
