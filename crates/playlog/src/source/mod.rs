//! Raw record sources and the NDJSON reader.
//!
//! A [`RecordSource`] streams whole documents in a stable order. The
//! [`NdjsonReader`] splits documents into lines and validates each line
//! against a declared schema.

mod compression;
mod memory;
mod reader;
mod storage;
mod traits;

pub use compression::CompressionFormat;
pub use memory::InMemorySource;
pub use reader::{DocumentStats, NdjsonReader};
pub use storage::StorageSource;
pub use traits::{DocumentStream, RecordSource, SourceDocument};
