//! Output side of the pipeline: Parquet encoding and Hive-partitioned writes.

mod parquet;
mod partition;
mod traits;
mod writer;

pub use self::parquet::ParquetEncoder;
pub use partition::{
    DEFAULT_PARTITION, PartitionGroup, escape_partition_value, split_by_partition,
};
pub use traits::TableSink;
pub use writer::{PartitionedWriter, TableWriteSummary};
