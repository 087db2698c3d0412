//! 表存储相关：实体模型、分区键/行键、批次划分与超长消息拆分

pub mod entity;
pub mod keys;
pub mod partitioner;
pub mod splitter;

pub use entity::{
    EntityFactory, EntityPayload, EntityProperty, EventColumns, RenderedEvent, StorageEntity,
};
pub use keys::{PartitionKeyType, MAX_TICKS};
pub use partitioner::{partition_chunks, Chunk, MAX_BATCH_SIZE};
pub use splitter::split_message;
