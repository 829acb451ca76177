//! SQLite-based store implementation

use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use sfb_util::PolicyRef;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::{AuditEvent, AuditEventType, Store, StoreError, StoreResult};

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            r#"
            -- Audit log (append-only)
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                policy TEXT,
                event_json TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_log(timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_policy ON audit_log(policy);
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    fn query_audits(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<AuditEvent>> {
        let mut stmt = conn.prepare(sql)?;

        let rows = stmt.query_map(params, |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let event: AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.lock()?;
        let event_json = serde_json::to_string(&event.event)?;
        let policy = event.event.policy().map(|p| p.to_string());

        conn.execute(
            "INSERT INTO audit_log (timestamp, policy, event_json) VALUES (?, ?, ?)",
            params![event.timestamp.to_rfc3339(), policy, event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.lock()?;
        Self::query_audits(
            &conn,
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
            [limit as i64],
        )
    }

    fn get_policy_audits(&self, policy: &PolicyRef, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.lock()?;
        Self::query_audits(
            &conn,
            "SELECT id, timestamp, event_json FROM audit_log WHERE policy = ? ORDER BY id DESC LIMIT ?",
            params![policy.to_string(), limit as i64],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfb_util::{PassId, ResourceName};
    use std::time::Duration;

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get_recent_audits(10).unwrap().is_empty());
    }

    #[test]
    fn test_audit_log() {
        let store = SqliteStore::in_memory().unwrap();

        let event = AuditEvent::new(AuditEventType::DaemonStarted { policy_count: 2 });
        store.append_audit(event).unwrap();

        let events = store.get_recent_audits(10).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, AuditEventType::DaemonStarted { policy_count: 2 }));
    }

    #[test]
    fn test_recent_audits_newest_first() {
        let store = SqliteStore::in_memory().unwrap();

        store.append_audit(AuditEvent::new(AuditEventType::DaemonStarted { policy_count: 0 })).unwrap();
        store.append_audit(AuditEvent::new(AuditEventType::DaemonStopped)).unwrap();

        let events = store.get_recent_audits(1).unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].event, AuditEventType::DaemonStopped));
    }

    #[test]
    fn test_policy_audits() {
        let store = SqliteStore::in_memory().unwrap();
        let cleanup = PolicyRef::named("cleanup");
        let other = PolicyRef::named("other");
        let pass_id = PassId::new();

        store
            .append_audit(AuditEvent::new(AuditEventType::ResourceDeleted {
                pass_id,
                policy: cleanup.clone(),
                resource: ResourceName::new("project-pr-1"),
                age_days: Some(4),
            }))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::PassCompleted {
                pass_id,
                policy: cleanup.clone(),
                deleted: 1,
                requeue_after: Duration::from_secs(60),
            }))
            .unwrap();
        store
            .append_audit(AuditEvent::new(AuditEventType::PassFailed {
                pass_id: PassId::new(),
                policy: other.clone(),
                reason: "boom".into(),
            }))
            .unwrap();

        let events = store.get_policy_audits(&cleanup, 10).unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0].event, AuditEventType::PassCompleted { deleted: 1, .. }));
        assert!(matches!(
            &events[1].event,
            AuditEventType::ResourceDeleted { resource, .. } if resource.as_str() == "project-pr-1"
        ));

        assert_eq!(store.get_policy_audits(&other, 10).unwrap().len(), 1);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sfbd.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.append_audit(AuditEvent::new(AuditEventType::DaemonStopped)).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_recent_audits(10).unwrap().len(), 1);
    }
}
