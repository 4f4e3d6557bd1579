//! The quadkey index: [`IndexTree`] builds it while writing, [`IndexResolver`] walks it while reading.

mod resolver;
mod tree;

pub use resolver::*;
pub use tree::*;
