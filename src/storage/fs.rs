//! 本地文件系统存储后端
//!
//! 表存储：`{root}/tables/{table}/{partition_key}.jsonl`，每行一个实体。
//! blob 存储：`{root}/blobs/{container}/{name}`。

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::table_store::validate_batch;
use super::{BlobStore, StorageError, TableStore};
use crate::table::Chunk;

/// 文件名中只保留字母数字和 `-_.`，其余替换为 `_`
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn dir_exists(path: &Path) -> Result<bool, StorageError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => Ok(meta.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// 文件系统表存储
///
/// 不检查跨批次的行键冲突。
#[derive(Debug)]
pub struct FsTableStore {
    root: PathBuf,
    // 同一进程内串行写文件，避免两个批次的行交错
    write_lock: Mutex<()>,
}

impl FsTableStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn table_dir(&self, table: &str) -> PathBuf {
        self.root.join("tables").join(sanitize(table))
    }

    /// 分区对应的 JSON lines 文件
    pub fn partition_path(&self, table: &str, partition_key: &str) -> PathBuf {
        self.table_dir(table)
            .join(format!("{}.jsonl", sanitize(partition_key)))
    }
}

#[async_trait]
impl TableStore for FsTableStore {
    async fn create_table_if_not_exists(&self, table: &str) -> Result<bool, StorageError> {
        let dir = self.table_dir(table);
        if dir_exists(&dir).await? {
            return Ok(false);
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(true)
    }

    async fn execute_batch(&self, table: &str, chunk: &Chunk) -> Result<(), StorageError> {
        validate_batch(chunk)?;
        if !dir_exists(&self.table_dir(table)).await? {
            return Err(StorageError::NotFound(format!("table {}", table)));
        }

        let timestamp = Utc::now().to_rfc3339();
        let mut content = String::new();
        for entity in &chunk.entities {
            let mut row = Map::new();
            row.insert("PartitionKey".to_string(), Value::from(entity.partition_key.as_str()));
            row.insert("RowKey".to_string(), Value::from(entity.row_key.as_str()));
            row.insert("Timestamp".to_string(), Value::from(timestamp.as_str()));
            for (name, value) in entity.to_properties() {
                row.insert(name, serde_json::to_value(&value)?);
            }
            content.push_str(&serde_json::to_string(&row)?);
            content.push('\n');
        }

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.partition_path(table, &chunk.partition_key))
            .await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// 文件系统 blob 存储
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join("blobs").join(sanitize(container))
    }

    /// blob 对应的本地路径，`/` 分隔的名称映射为子目录
    pub fn blob_path(&self, container: &str, name: &str) -> PathBuf {
        name.split('/')
            .filter(|segment| !segment.is_empty() && *segment != "..")
            .fold(self.container_dir(container), |path, segment| {
                path.join(sanitize(segment))
            })
    }

    async fn ensure_parent(&self, container: &str, path: &Path) -> Result<(), StorageError> {
        if !dir_exists(&self.container_dir(container)).await? {
            return Err(StorageError::NotFound(format!("container {}", container)));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
    ) -> Result<bool, StorageError> {
        let dir = self.container_dir(container);
        if dir_exists(&dir).await? {
            return Ok(false);
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(true)
    }

    async fn upload_text(
        &self,
        container: &str,
        name: &str,
        text: &str,
    ) -> Result<(), StorageError> {
        let path = self.blob_path(container, name);
        self.ensure_parent(container, &path).await?;
        tokio::fs::write(&path, text).await?;
        Ok(())
    }

    async fn exists(&self, container: &str, name: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.blob_path(container, name)).await?)
    }

    async fn create_append_blob(&self, container: &str, name: &str) -> Result<(), StorageError> {
        let path = self.blob_path(container, name);
        self.ensure_parent(container, &path).await?;
        tokio::fs::File::create(&path).await?;
        Ok(())
    }

    async fn append_block(
        &self,
        container: &str,
        name: &str,
        block: Bytes,
    ) -> Result<(), StorageError> {
        let path = self.blob_path(container, name);
        let mut file = match tokio::fs::OpenOptions::new().append(true).open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(format!("blob {}/{}", container, name)))
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&block).await?;
        file.flush().await?;
        Ok(())
    }
}
