use async_trait::async_trait;
use bytes::Bytes;

use super::StorageError;

/// blob 存储统一接口
///
/// blob 名称可以带 `/`，表示容器内的虚拟目录。
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 创建容器，返回是否新建
    async fn create_container_if_not_exists(&self, container: &str)
        -> Result<bool, StorageError>;

    /// 上传文本，覆盖同名 blob
    async fn upload_text(&self, container: &str, name: &str, text: &str)
        -> Result<(), StorageError>;

    /// 判断 blob 是否存在
    async fn exists(&self, container: &str, name: &str) -> Result<bool, StorageError>;

    /// 创建空的追加 blob，已存在时替换
    async fn create_append_blob(&self, container: &str, name: &str) -> Result<(), StorageError>;

    /// 向追加 blob 末尾写入一块数据
    ///
    /// blob 不存在时返回 `NotFound`。
    async fn append_block(&self, container: &str, name: &str, block: Bytes)
        -> Result<(), StorageError>;
}
