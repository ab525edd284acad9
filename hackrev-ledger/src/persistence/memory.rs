//! In-process backend; nothing survives the process

use super::LedgerBackend;
use crate::record::{RecordId, ReviewRecord};
use async_trait::async_trait;
use hackrev_common::{Error, Result};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<Vec<ReviewRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<ReviewRecord>>> {
        self.records
            .lock()
            .map_err(|_| Error::Internal("memory backend lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, record: &ReviewRecord) -> Result<()> {
        let mut records = self.lock()?;
        if let Some(last) = records.last() {
            if record.id <= last.id {
                return Err(Error::InvalidInput(format!(
                    "append of record {} after record {}",
                    record.id, last.id
                )));
            }
        }
        records.push(record.clone());
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<ReviewRecord>> {
        Ok(self.lock()?.clone())
    }

    async fn read(&self, id: RecordId) -> Result<Option<ReviewRecord>> {
        let records = self.lock()?;
        Ok(records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|index| records[index].clone()))
    }
}
