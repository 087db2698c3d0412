//! 超长消息拆分
//!
//! 消息超过 `max_message_size` 个字符时拆成多个分片。分片行键后缀倒序编号，
//! 按行键降序读取即可还原原始消息。

use super::entity::{EntityFactory, StorageEntity};
use super::keys::fragment_row_key;
use crate::error::AppenderError;
use crate::log::LogRecord;

/// 按字符切分，每段最多 `max_chars` 个字符
pub fn split_message(message: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = message.chars().collect();
    chars
        .chunks(max_chars)
        .map(|part| part.iter().collect())
        .collect()
}

impl EntityFactory {
    /// 记录对应的实体列表：不超长时为单个规范实体，否则为分片
    pub fn entities_for(&self, record: &LogRecord) -> Result<Vec<StorageEntity>, AppenderError> {
        let base = self.canonical_entity(record)?;
        let message = base.message()?;
        if message.chars().count() <= self.max_message_size {
            return Ok(vec![base]);
        }

        let parts = split_message(message, self.max_message_size);
        let total = parts.len();
        let fragments = parts
            .into_iter()
            .enumerate()
            .map(|(index, part)| StorageEntity {
                partition_key: base.partition_key.clone(),
                row_key: fragment_row_key(&base.row_key, index, total),
                payload: self.payload(record, part, index as i64),
            })
            .collect();
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::LogLevel;
    use crate::table::entity::EntityPayload;
    use crate::table::keys::PartitionKeyType;

    fn factory(max_message_size: usize) -> EntityFactory {
        EntityFactory {
            max_message_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_short_message_is_untouched() {
        let record = LogRecord::new(LogLevel::Info, "app", "x".repeat(16000));
        let entities = factory(16000).entities_for(&record).unwrap();

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].message().unwrap().len(), 16000);
        assert_eq!(entities[0].row_key.matches('.').count(), 1);
    }

    #[test]
    fn test_oversized_message_fragments() {
        let message: String = (0..35000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let record = LogRecord::new(LogLevel::Info, "app", message.clone());
        let entities = factory(16000).entities_for(&record).unwrap();

        assert_eq!(entities.len(), 3);
        let suffixes: Vec<&str> = entities
            .iter()
            .map(|e| e.row_key.rsplit('.').next().unwrap())
            .collect();
        assert_eq!(suffixes, vec!["00002", "00001", "00000"]);

        let base = entities[0].row_key.rsplit_once('.').unwrap().0;
        assert!(entities.iter().all(|e| e.row_key.starts_with(base)));
        assert!(entities.iter().all(|e| e.partition_key == "app"));

        // 按行键降序读取即可拼回原消息
        let mut sorted = entities.clone();
        sorted.sort_by(|a, b| b.row_key.cmp(&a.row_key));
        let joined: String = sorted.iter().map(|e| e.message().unwrap()).collect();
        assert_eq!(joined, message);

        let sequence: Vec<i64> = sorted
            .iter()
            .map(|e| match &e.payload {
                EntityPayload::Fixed(c) => c.sequence_number,
                other => panic!("unexpected payload: {:?}", other),
            })
            .collect();
        assert_eq!(sequence, vec![0, 1, 2]);
    }

    #[test]
    fn test_fragments_share_date_partition() {
        let factory = EntityFactory {
            partition_key_type: PartitionKeyType::DateReverse,
            max_message_size: 10,
            ..Default::default()
        };
        let record = LogRecord::new(LogLevel::Info, "app", "0123456789abcdefghij!");
        let entities = factory.entities_for(&record).unwrap();

        assert_eq!(entities.len(), 3);
        let key = &entities[0].partition_key;
        assert_eq!(key.len(), 19);
        assert!(entities.iter().all(|e| &e.partition_key == key));
    }

    #[test]
    fn test_split_counts_chars_not_bytes() {
        let parts = split_message("日志日志日", 2);
        assert_eq!(parts, vec!["日志", "日志", "日"]);
        assert_eq!(split_message("", 5), Vec::<String>::new());
    }
}
