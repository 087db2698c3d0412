use async_trait::async_trait;
use std::collections::HashSet;

use super::StorageError;
use crate::table::{Chunk, MAX_BATCH_SIZE};

/// 表存储统一接口
#[async_trait]
pub trait TableStore: Send + Sync {
    /// 创建表，返回是否新建
    async fn create_table_if_not_exists(&self, table: &str) -> Result<bool, StorageError>;

    /// 批量插入一个批次
    ///
    /// 批次整体成功或整体失败。
    async fn execute_batch(&self, table: &str, chunk: &Chunk) -> Result<(), StorageError>;
}

/// 校验批量写入的约束：非空、不超过上限、单一分区键、行键不重复
pub(crate) fn validate_batch(chunk: &Chunk) -> Result<(), StorageError> {
    if chunk.is_empty() {
        return Err(StorageError::InvalidBatch("batch is empty".to_string()));
    }
    if chunk.len() > MAX_BATCH_SIZE {
        return Err(StorageError::InvalidBatch(format!(
            "batch has {} entities, limit is {}",
            chunk.len(),
            MAX_BATCH_SIZE
        )));
    }

    let mut row_keys = HashSet::with_capacity(chunk.len());
    for entity in &chunk.entities {
        if entity.partition_key != chunk.partition_key {
            return Err(StorageError::InvalidBatch(format!(
                "partition key {} does not match batch partition key {}",
                entity.partition_key, chunk.partition_key
            )));
        }
        if !row_keys.insert(entity.row_key.as_str()) {
            return Err(StorageError::InvalidBatch(format!(
                "duplicate row key {}",
                entity.row_key
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{EntityPayload, RenderedEvent, StorageEntity};
    use chrono::Utc;

    fn entity(partition_key: &str, row_key: &str) -> StorageEntity {
        StorageEntity {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
            payload: EntityPayload::Rendered(RenderedEvent {
                event_time_stamp: Utc::now(),
                message: "m".to_string(),
                sequence_number: 0,
            }),
        }
    }

    fn chunk(entities: Vec<StorageEntity>) -> Chunk {
        Chunk {
            partition_key: "p".to_string(),
            entities,
        }
    }

    #[test]
    fn test_validate_batch() {
        assert!(validate_batch(&chunk(vec![entity("p", "1"), entity("p", "2")])).is_ok());

        assert!(matches!(
            validate_batch(&chunk(vec![])),
            Err(StorageError::InvalidBatch(_))
        ));
        assert!(matches!(
            validate_batch(&chunk(vec![entity("p", "1"), entity("q", "2")])),
            Err(StorageError::InvalidBatch(_))
        ));
        assert!(matches!(
            validate_batch(&chunk(vec![entity("p", "1"), entity("p", "1")])),
            Err(StorageError::InvalidBatch(_))
        ));

        let oversized = (0..101).map(|i| entity("p", &i.to_string())).collect();
        assert!(validate_batch(&chunk(oversized)).is_err());
    }
}
