//! Readers and writers for container bytes.
//!
//! The data readers/writers move whole blocks between memory and a backing store (a file or an
//! in-memory buffer). The value readers/writers encode and decode the fixed-width big-endian
//! fields inside those blocks.
//!
//! ```rust
//! use maptiles_core::io::*;
//!
//! let mut writer = ValueWriterBlob::new_be();
//! writer.write_u32(13).unwrap();
//! let blob = writer.into_blob();
//!
//! let mut reader = ValueReaderSlice::new_be(blob.as_slice());
//! assert_eq!(reader.read_u32().unwrap(), 13);
//! ```

mod data_reader;
mod data_reader_blob;
mod data_reader_file;
mod data_writer;
mod data_writer_blob;
mod data_writer_file;
mod value_reader;
mod value_reader_slice;
mod value_writer;
mod value_writer_blob;

pub use data_reader::*;
pub use data_reader_blob::*;
pub use data_reader_file::*;
pub use data_writer::*;
pub use data_writer_blob::*;
pub use data_writer_file::*;
pub use value_reader::*;
pub use value_reader_slice::*;
pub use value_writer::*;
pub use value_writer_blob::*;
