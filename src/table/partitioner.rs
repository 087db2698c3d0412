//! 批次划分
//!
//! 表存储的批量写入要求同一批次内分区键相同，且不超过 100 个实体。

use std::collections::HashMap;

use super::entity::StorageEntity;

/// 单次批量写入的实体上限
pub const MAX_BATCH_SIZE: usize = 100;

/// 一个批次：共享同一分区键的有序实体
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub partition_key: String,
    pub entities: Vec<StorageEntity>,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// 按分区键分组后切分为不超过 `max_chunk_size` 的批次
///
/// 分区键按首次出现的顺序输出，同一分区键内保持原有顺序。
/// `max_chunk_size` 为 0 时按 1 处理。
pub fn partition_chunks(entities: Vec<StorageEntity>, max_chunk_size: usize) -> Vec<Chunk> {
    let max_chunk_size = max_chunk_size.max(1);

    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<StorageEntity>> = HashMap::new();
    for entity in entities {
        let group = groups.entry(entity.partition_key.clone()).or_insert_with(|| {
            order.push(entity.partition_key.clone());
            Vec::new()
        });
        group.push(entity);
    }

    let mut chunks = Vec::new();
    for partition_key in order {
        let Some(group) = groups.remove(&partition_key) else {
            continue;
        };

        let mut iter = group.into_iter().peekable();
        while iter.peek().is_some() {
            let entities: Vec<StorageEntity> = iter.by_ref().take(max_chunk_size).collect();
            chunks.push(Chunk {
                partition_key: partition_key.clone(),
                entities,
            });
        }
    }
    chunks
}
