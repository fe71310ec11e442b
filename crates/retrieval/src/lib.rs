pub mod builder;
pub mod index;
pub mod models;
pub mod similarity;

pub use builder::IndexBuilder;
pub use index::{Index, IndexOptions, RetrievalError};
pub use models::{IndexedChunk, SearchResult};
