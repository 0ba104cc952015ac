//! # redb-backed Repository
//!
//! Disk-backed storage for draft sessions, published events, brands and
//! local draft blobs, all in one redb database file.
//!
//! Records are postcard-encoded. Draft blobs are stored as the JSON text
//! produced by [`crate::formats::DraftSnapshot::to_json`].
//!
//! A redb file can only be opened once per process, so the draft store is
//! obtained from the repository and shares its database handle.

use super::{Brand, DraftSessionRecord, EventRepository, PublishedEvent, normalize_domain};
use crate::draft::DraftStore;
use crate::{SessionId, WizardError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Table for draft sessions: session id -> postcard `DraftSessionRecord`
const DRAFT_SESSIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("draft_sessions");

/// Table for published events: `{published_at_millis:020}:{id}` -> postcard `PublishedEvent`
///
/// The key prefix keeps iteration in publication order.
const PUBLISHED_EVENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("published_events");

/// Table for published session ids: session id -> event key
const PUBLISHED_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("published_sessions");

/// Table for brands: email domain -> postcard `Brand`
const BRANDS: TableDefinition<&str, &[u8]> = TableDefinition::new("brands");

/// Table for local drafts: draft key -> JSON blob
const DRAFTS: TableDefinition<&str, &str> = TableDefinition::new("drafts");

/// Table keyed by string with postcard values.
type RecordTable = TableDefinition<'static, &'static str, &'static [u8]>;

fn io_err(e: impl std::fmt::Display) -> WizardError {
    WizardError::Io(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, WizardError> {
    postcard::to_allocvec(value).map_err(|e| WizardError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WizardError> {
    postcard::from_bytes(bytes).map_err(|e| WizardError::Serialization(e.to_string()))
}

// =============================================================================
// REPOSITORY
// =============================================================================

/// A disk-backed event repository using redb.
pub struct RedbRepository {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbRepository").finish_non_exhaustive()
    }
}

impl RedbRepository {
    /// Open or create a repository database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WizardError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(io_err)?;
            let _ = write_txn.open_table(DRAFT_SESSIONS).map_err(io_err)?;
            let _ = write_txn.open_table(PUBLISHED_EVENTS).map_err(io_err)?;
            let _ = write_txn.open_table(PUBLISHED_SESSIONS).map_err(io_err)?;
            let _ = write_txn.open_table(BRANDS).map_err(io_err)?;
            let _ = write_txn.open_table(DRAFTS).map_err(io_err)?;
            write_txn.commit().map_err(io_err)?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    /// Draft blob store sharing this database.
    #[must_use]
    pub fn draft_store(&self) -> RedbDraftStore {
        RedbDraftStore {
            db: Arc::clone(&self.db),
        }
    }

    fn put(
        &self,
        table: RecordTable,
        key: &str,
        bytes: &[u8],
    ) -> Result<(), WizardError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut t = write_txn.open_table(table).map_err(io_err)?;
            t.insert(key, bytes).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn fetch<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        key: &str,
    ) -> Result<Option<T>, WizardError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let t = read_txn.open_table(table).map_err(io_err)?;
        match t.get(key).map_err(io_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }
}

impl EventRepository for RedbRepository {
    fn insert_or_update_draft_session(
        &mut self,
        record: &DraftSessionRecord,
    ) -> Result<(), WizardError> {
        let bytes = encode(record)?;
        self.put(DRAFT_SESSIONS, record.session_id.as_str(), &bytes)
    }

    fn get_draft_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<DraftSessionRecord>, WizardError> {
        self.fetch(DRAFT_SESSIONS, session_id.as_str())
    }

    fn insert_published_event(&mut self, event: &PublishedEvent) -> Result<(), WizardError> {
        let bytes = encode(event)?;
        let key = format!(
            "{:020}:{}",
            event.published_at.timestamp_millis().max(0),
            event.id
        );

        // Both tables are written in one transaction so a session maps to
        // at most one event.
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut sessions = write_txn.open_table(PUBLISHED_SESSIONS).map_err(io_err)?;
            if sessions
                .get(event.session_id.as_str())
                .map_err(io_err)?
                .is_some()
            {
                return Err(WizardError::AlreadyPublished(event.session_id.clone()));
            }
            sessions
                .insert(event.session_id.as_str(), key.as_str())
                .map_err(io_err)?;
        }
        {
            let mut events = write_txn.open_table(PUBLISHED_EVENTS).map_err(io_err)?;
            events.insert(key.as_str(), bytes.as_slice()).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn list_published_events(&self) -> Result<Vec<PublishedEvent>, WizardError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(PUBLISHED_EVENTS).map_err(io_err)?;
        let mut events = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (_, value) = entry.map_err(io_err)?;
            events.push(decode(value.value())?);
        }
        Ok(events)
    }

    fn query_brand_by_email_domain(&self, domain: &str) -> Result<Option<Brand>, WizardError> {
        self.fetch(BRANDS, &normalize_domain(domain))
    }

    fn upsert_brand(&mut self, brand: &Brand) -> Result<(), WizardError> {
        let bytes = encode(brand)?;
        self.put(BRANDS, &normalize_domain(&brand.email_domain), &bytes)
    }
}

// =============================================================================
// DRAFT STORE
// =============================================================================

/// Disk-backed draft blob store.
pub struct RedbDraftStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for RedbDraftStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbDraftStore").finish_non_exhaustive()
    }
}

impl DraftStore for RedbDraftStore {
    fn get(&self, key: &str) -> Result<Option<String>, WizardError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DRAFTS).map_err(io_err)?;
        let result = table
            .get(key)
            .map_err(io_err)?
            .map(|v| v.value().to_string());
        Ok(result)
    }

    fn set(&mut self, key: &str, blob: &str) -> Result<(), WizardError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(DRAFTS).map_err(io_err)?;
            table.insert(key, blob).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), WizardError> {
        let write_txn = self.db.begin_write().map_err(io_err)?;
        {
            let mut table = write_txn.open_table(DRAFTS).map_err(io_err)?;
            table.remove(key).map_err(io_err)?;
        }
        write_txn.commit().map_err(io_err)?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, WizardError> {
        let read_txn = self.db.begin_read().map_err(io_err)?;
        let table = read_txn.open_table(DRAFTS).map_err(io_err)?;
        let mut keys = Vec::new();
        for entry in table.iter().map_err(io_err)? {
            let (key, _) = entry.map_err(io_err)?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::draft::recover;
    use crate::formats::DraftSnapshot;
    use crate::forms::StageForms;
    use crate::system::Stage;
    use crate::WizardSession;
    use chrono::DateTime;
    use tempfile::tempdir;

    #[test]
    fn brands_persist_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        {
            let mut repo = RedbRepository::open(&db_path).expect("open db");
            repo.upsert_brand(&Brand::new("Maison Rue", "maisonrue.com"))
                .expect("upsert");
        }

        {
            let repo = RedbRepository::open(&db_path).expect("open db");
            let brand = repo
                .query_brand_by_email_domain("MaisonRue.com")
                .expect("query");
            assert_eq!(brand.expect("brand").name, "Maison Rue");
        }
    }

    #[test]
    fn draft_session_record_roundtrip() {
        let temp = tempdir().expect("temp dir");
        let mut repo = RedbRepository::open(temp.path().join("test.redb")).expect("open db");
        let now = DateTime::from_timestamp(1_792_000_000, 0).unwrap();
        let session = WizardSession::new(SessionId::new("s-1"), Some("user_1".into()), now);
        let record = DraftSessionRecord::from_session(&session);

        repo.insert_or_update_draft_session(&record).expect("upsert");
        repo.insert_or_update_draft_session(&record).expect("upsert again");
        let stored = repo
            .get_draft_session(&SessionId::new("s-1"))
            .expect("get")
            .expect("record");
        assert_eq!(stored, record);
        assert!(
            repo.get_draft_session(&SessionId::new("missing"))
                .expect("get")
                .is_none()
        );
    }

    #[test]
    fn draft_blobs_share_database() {
        let temp = tempdir().expect("temp dir");
        let repo = RedbRepository::open(temp.path().join("test.redb")).expect("open db");
        let mut store = repo.draft_store();
        let now = DateTime::from_timestamp(1_792_000_000, 0).unwrap();
        let snapshot = DraftSnapshot::new(
            SessionId::new("s-1"),
            Stage::EventSetup,
            StageForms::default(),
            now,
        );
        store
            .set(&snapshot.key(), &snapshot.to_json().unwrap())
            .expect("set");
        assert_eq!(store.keys().expect("keys"), vec![snapshot.key()]);

        let restored = recover(&mut store, &SessionId::new("s-1")).expect("draft");
        assert_eq!(restored, snapshot);

        store.remove(&snapshot.key()).expect("remove");
        store.remove(&snapshot.key()).expect("remove missing");
        assert!(store.get(&snapshot.key()).expect("get").is_none());
    }
}
