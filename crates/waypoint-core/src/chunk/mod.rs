//! Bounded I/O helpers: delimiter-aligned chunked reads and near-equal
//! partitioning of in-memory collections.

pub mod partition;
pub mod reader;

pub use partition::chunks_of;
pub use reader::{read_chunk, Chunk, ChunkError};
