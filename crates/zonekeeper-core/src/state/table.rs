// # Record Table
//
// The in-memory shape shared by the memory and file record stores: records
// keyed by id plus a `full_name` index. Every mutation keeps both maps in
// step so a name is held by at most one record or reservation.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::Error;
use crate::record::DnsRecord;

#[derive(Debug, Clone, Default)]
pub(crate) struct RecordTable {
    records: HashMap<String, DnsRecord>,
    /// full_name -> record id
    names: HashMap<String, String>,
}

impl RecordTable {
    /// Build a table from persisted records, rebuilding the name index
    ///
    /// If two persisted records claim the same name, the older one wins and
    /// the other is dropped with an error log.
    pub(crate) fn from_records(records: HashMap<String, DnsRecord>) -> Self {
        let mut ordered: Vec<DnsRecord> = records.into_values().collect();
        ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut table = Self::default();
        for record in ordered {
            if let Some(holder) = table.names.get(&record.full_name) {
                tracing::error!(
                    "Dropping record {} ({}): name already held by record {}",
                    record.id,
                    record.full_name,
                    holder
                );
                continue;
            }
            table
                .names
                .insert(record.full_name.clone(), record.id.clone());
            table.records.insert(record.id.clone(), record);
        }
        table
    }

    pub(crate) fn records(&self) -> &HashMap<String, DnsRecord> {
        &self.records
    }

    pub(crate) fn reserve(&mut self, reservation: &DnsRecord) -> Result<(), Error> {
        if self.names.contains_key(&reservation.full_name) {
            return Err(Error::conflict(format!(
                "name '{}' is already taken",
                reservation.full_name
            )));
        }
        if self.records.contains_key(&reservation.id) {
            return Err(Error::conflict(format!(
                "record id '{}' already exists",
                reservation.id
            )));
        }
        self.names
            .insert(reservation.full_name.clone(), reservation.id.clone());
        self.records
            .insert(reservation.id.clone(), reservation.clone());
        Ok(())
    }

    pub(crate) fn commit(&mut self, id: &str, remote_id: &str) -> Result<DnsRecord, Error> {
        let record = self
            .records
            .get_mut(id)
            .filter(|r| !r.is_committed())
            .ok_or_else(|| Error::not_found(format!("reservation '{}'", id)))?;
        record.remote_id = Some(remote_id.to_string());
        record.updated_at = chrono::Utc::now();
        Ok(record.clone())
    }

    /// Drop a reservation; returns whether anything was removed
    ///
    /// Committed records are never touched.
    pub(crate) fn release(&mut self, id: &str) -> bool {
        match self.records.get(id) {
            Some(record) if !record.is_committed() => {
                self.names.remove(&record.full_name);
                self.records.remove(id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn find_reservation(&self, id: &str) -> Option<&DnsRecord> {
        self.records.get(id).filter(|r| !r.is_committed())
    }

    pub(crate) fn get_committed(&self, id: &str) -> Option<DnsRecord> {
        self.records.get(id).filter(|r| r.is_committed()).cloned()
    }

    pub(crate) fn find_by_name(&self, full_name: &str) -> Option<DnsRecord> {
        self.names
            .get(full_name)
            .and_then(|id| self.records.get(id))
            .cloned()
    }

    pub(crate) fn replace(&mut self, record: &DnsRecord) -> Result<(), Error> {
        let existing = self
            .records
            .get_mut(&record.id)
            .filter(|r| r.is_committed())
            .ok_or_else(|| Error::not_found(format!("record '{}'", record.id)))?;
        if existing.full_name != record.full_name || existing.owner_id != record.owner_id {
            return Err(Error::invalid_input(format!(
                "record '{}' cannot change its name or owner",
                record.id
            )));
        }
        *existing = record.clone();
        Ok(())
    }

    pub(crate) fn remove_committed(&mut self, id: &str) -> Option<DnsRecord> {
        if !self.records.get(id)?.is_committed() {
            return None;
        }
        let record = self.records.remove(id)?;
        self.names.remove(&record.full_name);
        Some(record)
    }

    pub(crate) fn count_committed(&self, owner_id: &str) -> usize {
        self.records
            .values()
            .filter(|r| r.is_committed() && r.owner_id == owner_id)
            .count()
    }

    /// Count committed records and reservations held by `owner_id`
    pub(crate) fn count_held(&self, owner_id: &str) -> usize {
        self.records
            .values()
            .filter(|r| r.owner_id == owner_id)
            .count()
    }

    pub(crate) fn list_committed(&self, owner_id: Option<&str>) -> Vec<DnsRecord> {
        let mut records: Vec<DnsRecord> = self
            .records
            .values()
            .filter(|r| r.is_committed())
            .filter(|r| owner_id.is_none_or(|owner| r.owner_id == owner))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        records
    }

    /// Remove reservations created before `cutoff` and return them
    pub(crate) fn discard_reservations_before(&mut self, cutoff: DateTime<Utc>) -> Vec<DnsRecord> {
        let ids: Vec<String> = self
            .records
            .values()
            .filter(|r| !r.is_committed() && r.created_at < cutoff)
            .map(|r| r.id.clone())
            .collect();

        let mut discarded = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.records.remove(&id) {
                self.names.remove(&record.full_name);
                discarded.push(record);
            }
        }
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{RecordType, Ttl};

    fn reservation(owner: &str, label: &str) -> DnsRecord {
        DnsRecord::reservation(
            owner,
            label,
            format!("{}.example.com", label),
            RecordType::A,
            "203.0.113.5",
            Ttl::Auto,
            false,
        )
    }

    #[test]
    fn test_reserve_claims_name() {
        let mut table = RecordTable::default();
        let first = reservation("alice", "www");
        table.reserve(&first).unwrap();

        let err = table.reserve(&reservation("bob", "www")).unwrap_err();
        assert!(err.is_conflict());

        // Reservations are invisible to get/count/list but hold the name
        assert!(table.get_committed(&first.id).is_none());
        assert_eq!(table.count_committed("alice"), 0);
        assert!(table.list_committed(None).is_empty());
        assert!(table.find_by_name("www.example.com").is_some());
    }

    #[test]
    fn test_commit_and_release() {
        let mut table = RecordTable::default();
        let kept = reservation("alice", "kept");
        let dropped = reservation("alice", "dropped");
        table.reserve(&kept).unwrap();
        table.reserve(&dropped).unwrap();

        let committed = table.commit(&kept.id, "remote-1").unwrap();
        assert_eq!(committed.remote_id.as_deref(), Some("remote-1"));
        assert!(table.commit(&kept.id, "remote-2").is_err());

        assert!(table.release(&dropped.id));
        assert!(!table.release(&kept.id), "committed records are not released");
        assert!(table.find_by_name("dropped.example.com").is_none());
        assert_eq!(table.count_committed("alice"), 1);
    }

    #[test]
    fn test_remove_frees_name() {
        let mut table = RecordTable::default();
        let record = reservation("alice", "www");
        table.reserve(&record).unwrap();
        table.commit(&record.id, "remote-1").unwrap();

        assert!(table.remove_committed(&record.id).is_some());
        assert!(table.remove_committed(&record.id).is_none());
        table.reserve(&reservation("bob", "www")).unwrap();
    }

    #[test]
    fn test_replace_keeps_name() {
        let mut table = RecordTable::default();
        let record = reservation("alice", "www");
        table.reserve(&record).unwrap();
        let mut committed = table.commit(&record.id, "remote-1").unwrap();

        committed.content = "203.0.113.9".into();
        table.replace(&committed).unwrap();
        assert_eq!(
            table.get_committed(&record.id).unwrap().content,
            "203.0.113.9"
        );

        committed.full_name = "other.example.com".into();
        assert!(table.replace(&committed).is_err());
    }

    #[test]
    fn test_discard_stale_reservations() {
        let mut table = RecordTable::default();
        let committed = reservation("alice", "a");
        let mut stale = reservation("alice", "b");
        stale.created_at = Utc::now() - chrono::Duration::minutes(10);
        let fresh = reservation("alice", "c");
        table.reserve(&committed).unwrap();
        table.reserve(&stale).unwrap();
        table.reserve(&fresh).unwrap();
        table.commit(&committed.id, "remote-1").unwrap();
        assert_eq!(table.count_held("alice"), 3);

        let discarded = table.discard_reservations_before(Utc::now() - chrono::Duration::minutes(5));
        assert_eq!(discarded.len(), 1);
        assert_eq!(discarded[0].full_name, "b.example.com");
        assert_eq!(table.records().len(), 2);
        assert!(table.find_by_name("b.example.com").is_none());
        assert!(table.find_by_name("c.example.com").is_some());
        assert_eq!(table.count_held("alice"), 2);
        assert_eq!(table.count_committed("alice"), 1);
    }
}
