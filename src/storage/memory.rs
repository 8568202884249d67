/// In-process sink used when durable storage is disabled and in tests
use super::record::PowerRecord;
use super::sink::PersistenceSink;
use crate::errors::PersistenceError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

pub struct MemorySink {
    capacity: usize,
    records: Mutex<VecDeque<PowerRecord>>,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// All retained records, oldest first
    pub fn records(&self) -> Vec<PowerRecord> {
        self.records.lock().iter().cloned().collect()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

#[async_trait]
impl PersistenceSink for MemorySink {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn write(&self, record: PowerRecord) -> Result<(), PersistenceError> {
        let mut records = self.records.lock();
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<PowerRecord>, PersistenceError> {
        Ok(self.records.lock().iter().rev().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_memory_sink_is_bounded() {
        let sink = MemorySink::new(3);
        let start = Utc::now();
        for i in 0..5 {
            sink.write(PowerRecord::empty(start + Duration::seconds(i)))
                .await
                .unwrap();
        }
        assert_eq!(sink.len(), 3);
        assert_eq!(sink.records()[0].timestamp, start + Duration::seconds(2));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let sink = MemorySink::default();
        let start = Utc::now();
        for i in 0..4 {
            sink.write(PowerRecord::empty(start + Duration::seconds(i)))
                .await
                .unwrap();
        }
        let recent = sink.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].timestamp, start + Duration::seconds(3));
        assert_eq!(recent[1].timestamp, start + Duration::seconds(2));
    }
}
