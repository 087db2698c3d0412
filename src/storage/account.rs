//! 连接字符串解析
//!
//! 连接字符串由 `key=value;` 组成，key 不区分大小写：
//!
//! - `UseDevelopmentStorage=true`：进程内共享的内存存储
//! - `LocalPath=/var/log/azlog`：本地文件系统存储

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use super::{BlobStore, FsBlobStore, FsTableStore, MemoryBlobStore, MemoryTableStore, TableStore};
use crate::error::AppenderError;

static DEVELOPMENT_TABLES: Lazy<Arc<MemoryTableStore>> =
    Lazy::new(|| Arc::new(MemoryTableStore::new()));
static DEVELOPMENT_BLOBS: Lazy<Arc<MemoryBlobStore>> =
    Lazy::new(|| Arc::new(MemoryBlobStore::new()));

/// 进程内共享的开发表存储
pub fn development_tables() -> Arc<MemoryTableStore> {
    DEVELOPMENT_TABLES.clone()
}

/// 进程内共享的开发 blob 存储
pub fn development_blobs() -> Arc<MemoryBlobStore> {
    DEVELOPMENT_BLOBS.clone()
}

/// 存储账号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageAccount {
    Development,
    Local(PathBuf),
}

impl StorageAccount {
    pub fn parse(connection_string: &str) -> Result<Self, AppenderError> {
        let mut settings = HashMap::new();
        for pair in connection_string.split(';') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            // 不回显原文，连接字符串里可能带密钥
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                AppenderError::InvalidConnectionString("expected key=value pairs".to_string())
            })?;
            settings.insert(key.trim().to_lowercase(), value.trim().to_string());
        }

        if settings.is_empty() {
            return Err(AppenderError::InvalidConnectionString(
                "connection string is empty".to_string(),
            ));
        }

        if let Some(flag) = settings.get("usedevelopmentstorage") {
            return match flag.to_lowercase().as_str() {
                "true" => Ok(StorageAccount::Development),
                _ => Err(AppenderError::InvalidConnectionString(format!(
                    "UseDevelopmentStorage must be true, got {}",
                    flag
                ))),
            };
        }

        match settings.get("localpath") {
            Some(path) if !path.is_empty() => Ok(StorageAccount::Local(PathBuf::from(path))),
            Some(_) => Err(AppenderError::InvalidConnectionString(
                "LocalPath is empty".to_string(),
            )),
            None => Err(AppenderError::InvalidConnectionString(
                "no supported storage endpoint, expected UseDevelopmentStorage or LocalPath"
                    .to_string(),
            )),
        }
    }

    pub fn table_client(&self) -> Arc<dyn TableStore> {
        match self {
            StorageAccount::Development => development_tables(),
            StorageAccount::Local(root) => Arc::new(FsTableStore::new(root.clone())),
        }
    }

    pub fn blob_client(&self) -> Arc<dyn BlobStore> {
        match self {
            StorageAccount::Development => development_blobs(),
            StorageAccount::Local(root) => Arc::new(FsBlobStore::new(root.clone())),
        }
    }
}
