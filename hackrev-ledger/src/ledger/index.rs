//! Published ledger state: primary records plus ByReviewee and ByTag indices
//!
//! Only [`LedgerState::insert`] mutates, and it updates all three structures
//! in one call under the store's write lock.

use crate::record::{RecordId, ReviewRecord, TagKey};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub(crate) struct LedgerState {
    /// `records[i].id == i + 1`
    records: Vec<ReviewRecord>,
    /// Commit order, oldest first
    by_reviewee: HashMap<String, Vec<RecordId>>,
    by_tag: HashMap<TagKey, BTreeSet<RecordId>>,
}

impl LedgerState {
    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Id the next commit must carry, `None` once the id space is exhausted
    pub(crate) fn next_id(&self) -> Option<RecordId> {
        match self.records.last() {
            Some(last) => last.id.next(),
            None => Some(RecordId::FIRST),
        }
    }

    /// Publish one record and its index entries
    ///
    /// Rejects anything but the next gap-free id without touching state.
    pub(crate) fn insert(&mut self, record: ReviewRecord) -> Result<(), String> {
        let expected = self
            .next_id()
            .ok_or_else(|| "record id space exhausted".to_string())?;
        if record.id != expected {
            return Err(format!(
                "out-of-sequence record id {} (expected {})",
                record.id, expected
            ));
        }

        let id = record.id;
        for key in record.tag_keys() {
            self.by_tag.entry(key).or_default().insert(id);
        }
        self.by_reviewee
            .entry(record.reviewee.clone())
            .or_default()
            .push(id);
        self.records.push(record);
        Ok(())
    }

    pub(crate) fn get(&self, id: RecordId) -> Option<&ReviewRecord> {
        let index = usize::try_from(id.get().checked_sub(1)?).ok()?;
        self.records.get(index)
    }

    pub(crate) fn reviews_of(&self, reviewee: &str) -> Vec<ReviewRecord> {
        self.by_reviewee
            .get(reviewee)
            .map(|ids| self.resolve(ids.iter().copied()))
            .unwrap_or_default()
    }

    /// Records carrying `key`, ascending id
    pub(crate) fn tagged(&self, key: &TagKey) -> Vec<ReviewRecord> {
        self.by_tag
            .get(key)
            .map(|ids| self.resolve(ids.iter().copied()))
            .unwrap_or_default()
    }

    pub(crate) fn tag_count(&self) -> usize {
        self.by_tag.len()
    }

    fn resolve(&self, ids: impl Iterator<Item = RecordId>) -> Vec<ReviewRecord> {
        ids.filter_map(|id| self.get(id).cloned()).collect()
    }

    /// Cross-check both indices against the primary records
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        for (tag, ids) in &self.by_tag {
            for id in ids {
                let record = self
                    .get(*id)
                    .ok_or_else(|| format!("ByTag[{}] holds orphaned id {}", tag, id))?;
                if !record.has_tag(tag) {
                    return Err(format!("record {} indexed under foreign tag {}", id, tag));
                }
            }
        }

        let mut indexed_by_reviewee = 0;
        for (reviewee, ids) in &self.by_reviewee {
            if ids.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(format!("ByReviewee[{}] is not in commit order", reviewee));
            }
            for id in ids {
                let record = self
                    .get(*id)
                    .ok_or_else(|| format!("ByReviewee[{}] holds orphaned id {}", reviewee, id))?;
                if &record.reviewee != reviewee {
                    return Err(format!("record {} indexed under reviewee {}", id, reviewee));
                }
            }
            indexed_by_reviewee += ids.len();
        }
        if indexed_by_reviewee != self.records.len() {
            return Err(format!(
                "ByReviewee covers {} of {} records",
                indexed_by_reviewee,
                self.records.len()
            ));
        }

        for record in &self.records {
            for key in record.tag_keys() {
                if !self.by_tag.get(&key).is_some_and(|ids| ids.contains(&record.id)) {
                    return Err(format!("record {} missing from ByTag[{}]", record.id, key));
                }
            }
        }
        Ok(())
    }
}
