//! 内存存储后端
//!
//! 作为开发存储使用，同时方便测试检查写入结果。

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use super::table_store::validate_batch;
use super::{BlobStore, StorageError, TableStore};
use crate::table::{Chunk, EntityProperty};

/// 表中的一行
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub partition_key: String,
    pub row_key: String,
    pub properties: Vec<(String, EntityProperty)>,
}

impl TableRow {
    pub fn get(&self, column: &str) -> Option<&EntityProperty> {
        self.properties
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

type Table = BTreeMap<(String, String), TableRow>;

/// 内存表存储
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    tables: Mutex<HashMap<String, Table>>,
    batches: AtomicUsize,
    pending_failures: AtomicUsize,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来的 `count` 次批量写入返回 `Unavailable`
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// 成功写入的批次数
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// 按分区键、行键升序返回表中所有行
    pub async fn rows(&self, table: &str) -> Vec<TableRow> {
        let tables = self.tables.lock().await;
        tables
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn table_exists(&self, table: &str) -> bool {
        self.tables.lock().await.contains_key(table)
    }

    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn create_table_if_not_exists(&self, table: &str) -> Result<bool, StorageError> {
        let mut tables = self.tables.lock().await;
        if tables.contains_key(table) {
            return Ok(false);
        }
        tables.insert(table.to_string(), Table::new());
        Ok(true)
    }

    async fn execute_batch(&self, table: &str, chunk: &Chunk) -> Result<(), StorageError> {
        if self.take_failure() {
            return Err(StorageError::Unavailable(format!(
                "injected failure writing to table {}",
                table
            )));
        }
        validate_batch(chunk)?;

        let mut tables = self.tables.lock().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StorageError::NotFound(format!("table {}", table)))?;

        for entity in &chunk.entities {
            let key = (entity.partition_key.clone(), entity.row_key.clone());
            if rows.contains_key(&key) {
                return Err(StorageError::Conflict {
                    partition_key: key.0,
                    row_key: key.1,
                });
            }
        }

        for entity in &chunk.entities {
            let key = (entity.partition_key.clone(), entity.row_key.clone());
            rows.insert(
                key,
                TableRow {
                    partition_key: entity.partition_key.clone(),
                    row_key: entity.row_key.clone(),
                    properties: entity.to_properties(),
                },
            );
        }
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 内存 blob 存储
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    containers: Mutex<HashMap<String, BTreeMap<String, Vec<u8>>>>,
    pending_failures: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 让接下来的 `count` 次写入（上传或追加）返回 `Unavailable`
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    /// 容器内的 blob 名称，按字典序
    pub async fn blob_names(&self, container: &str) -> Vec<String> {
        let containers = self.containers.lock().await;
        containers
            .get(container)
            .map(|blobs| blobs.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn blob_text(&self, container: &str, name: &str) -> Option<String> {
        let containers = self.containers.lock().await;
        containers
            .get(container)
            .and_then(|blobs| blobs.get(name))
            .map(|content| String::from_utf8_lossy(content).into_owned())
    }

    fn take_failure(&self) -> bool {
        self.pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn injected(container: &str, name: &str) -> StorageError {
        StorageError::Unavailable(format!("injected failure writing {}/{}", container, name))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
    ) -> Result<bool, StorageError> {
        let mut containers = self.containers.lock().await;
        if containers.contains_key(container) {
            return Ok(false);
        }
        containers.insert(container.to_string(), BTreeMap::new());
        Ok(true)
    }

    async fn upload_text(
        &self,
        container: &str,
        name: &str,
        text: &str,
    ) -> Result<(), StorageError> {
        if self.take_failure() {
            return Err(Self::injected(container, name));
        }
        let mut containers = self.containers.lock().await;
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::NotFound(format!("container {}", container)))?;
        blobs.insert(name.to_string(), text.as_bytes().to_vec());
        Ok(())
    }

    async fn exists(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        let containers = self.containers.lock().await;
        Ok(containers
            .get(container)
            .is_some_and(|blobs| blobs.contains_key(name)))
    }

    async fn create_append_blob(&self, container: &str, name: &str) -> Result<(), StorageError> {
        let mut containers = self.containers.lock().await;
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| StorageError::NotFound(format!("container {}", container)))?;
        blobs.insert(name.to_string(), Vec::new());
        Ok(())
    }

    async fn append_block(
        &self,
        container: &str,
        name: &str,
        block: Bytes,
    ) -> Result<(), StorageError> {
        if self.take_failure() {
            return Err(Self::injected(container, name));
        }
        let mut containers = self.containers.lock().await;
        let blob = containers
            .get_mut(container)
            .and_then(|blobs| blobs.get_mut(name))
            .ok_or_else(|| StorageError::NotFound(format!("blob {}/{}", container, name)))?;
        blob.extend_from_slice(&block);
        Ok(())
    }
}
