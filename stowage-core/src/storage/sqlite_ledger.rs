use crate::storage::claim_ledger::{BlobRecord, Claim, ClaimLedger, SweepStats, SweepVisitor};
use crate::{Result, StowageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{
    Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params, params_from_iter,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SWEEP_BATCH_SIZE: usize = 100;
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Claim ledger kept in a SQLite database file.
///
/// Every call opens its own connection on a blocking thread, so concurrent
/// callers are serialized by SQLite's file locking rather than by this type.
/// The database runs in WAL mode and every read-then-write transaction takes
/// the write lock up front, so contending writers wait out the busy timeout
/// instead of failing with `database is locked`.
#[derive(Debug, Clone)]
pub struct SqliteClaimLedger {
    db_path: PathBuf,
    sweep_batch_size: usize,
    busy_timeout: Duration,
}

impl SqliteClaimLedger {
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let ledger = Self {
            db_path: db_path.into(),
            sweep_batch_size: DEFAULT_SWEEP_BATCH_SIZE,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    pub fn with_sweep_batch_size(mut self, batch_size: usize) -> Self {
        self.sweep_batch_size = batch_size.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    fn get_conn(&self) -> Result<Connection> {
        open_conn(&self.db_path, self.busy_timeout)
    }

    fn init_schema(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = self.get_conn()?;

        // Persistent on the file; readers no longer block the single writer
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!("Ledger {} journal mode {}", self.db_path.display(), mode);

        conn.execute(
            "CREATE TABLE IF NOT EXISTS blobs (
                name TEXT PRIMARY KEY,
                filename TEXT,
                path TEXT,
                created_at INTEGER NOT NULL
            )",
            [],
        )?;

        // Sweep candidates are selected by age
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_blobs_created_at ON blobs(created_at)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS claims (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                blob_name TEXT NOT NULL,
                claimant TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (blob_name) REFERENCES blobs(name) ON DELETE CASCADE
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_claims_blob_name ON claims(blob_name)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_claims_claimant ON claims(claimant)",
            [],
        )?;

        Ok(())
    }

    /// Run `f` against a fresh connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db_path = self.db_path.clone();
        let busy_timeout = self.busy_timeout;
        tokio::task::spawn_blocking(move || {
            let mut conn = open_conn(&db_path, busy_timeout)?;
            f(&mut conn)
        })
        .await?
    }

    /// All claims currently held on `name`, oldest first.
    pub async fn claims_for(&self, name: &str) -> Result<Vec<Claim>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT blob_name, claimant, created_at FROM claims
                 WHERE blob_name = ?1 ORDER BY pk",
            )?;

            let rows = stmt.query_map([&name], |row| {
                Ok(Claim {
                    blob_name: row.get(0)?,
                    claimant: row.get(1)?,
                    created_at: millis_to_datetime(row.get(2)?)?,
                })
            })?;

            let mut claims = Vec::new();
            for row in rows {
                claims.push(row?);
            }
            Ok(claims)
        })
        .await
    }

    /// Drop a swept record unless a claim arrived after it was selected.
    async fn delete_unclaimed(&self, name: &str) -> Result<usize> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let removed = conn.execute(
                "DELETE FROM blobs WHERE name = ?1
                   AND NOT EXISTS (SELECT 1 FROM claims WHERE blob_name = ?1)",
                [&name],
            )?;
            Ok(removed)
        })
        .await
    }

    async fn sweep_candidates(&self, cutoff: DateTime<Utc>) -> Result<Vec<BlobRecord>> {
        let cutoff = cutoff.timestamp_millis();
        let limit = self.sweep_batch_size as i64;
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT name, filename, path, created_at FROM blobs b
                 WHERE created_at < ?1
                   AND NOT EXISTS (SELECT 1 FROM claims c WHERE c.blob_name = b.name)
                 ORDER BY created_at
                 LIMIT ?2",
            )?;

            let rows = stmt.query_map(params![cutoff, limit], read_record)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
    }
}

fn open_conn(db_path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(busy_timeout)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(conn)
}

fn millis_to_datetime(millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(0, millis))
}

fn read_record(row: &Row<'_>) -> rusqlite::Result<BlobRecord> {
    Ok(BlobRecord {
        name: row.get(0)?,
        filename: row.get(1)?,
        path: row.get(2)?,
        created_at: millis_to_datetime(row.get(3)?)?,
    })
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn distinct(names: &[String]) -> Vec<String> {
    names
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Delete a record and its claims, returning the number of records removed.
fn delete_record(conn: &mut Connection, name: &str) -> Result<usize> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM claims WHERE blob_name = ?1", [name])?;
    let affected = tx.execute("DELETE FROM blobs WHERE name = ?1", [name])?;
    tx.commit()?;
    Ok(affected)
}

#[async_trait]
impl ClaimLedger for SqliteClaimLedger {
    async fn register(&self, record: &BlobRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let inserted = conn.execute(
                "INSERT INTO blobs (name, filename, path, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.name,
                    record.filename,
                    record.path,
                    record.created_at.timestamp_millis(),
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(error, _))
                    if error.code == ErrorCode::ConstraintViolation =>
                {
                    Err(StowageError::Conflict(record.name))
                }
                Err(error) => Err(error.into()),
            }
        })
        .await
    }

    async fn lookup(&self, names: &[String]) -> Result<Vec<BlobRecord>> {
        let names = distinct(names);
        if names.is_empty() {
            return Ok(Vec::new());
        }

        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT name, filename, path, created_at FROM blobs WHERE name IN ({})",
                placeholders(names.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(names.iter()), read_record)?;

            let mut records = Vec::new();
            for row in rows {
                records.push(row?);
            }
            Ok(records)
        })
        .await
    }

    async fn exists(&self, names: &[String]) -> Result<bool> {
        let names = distinct(names);
        if names.is_empty() {
            return Ok(true);
        }

        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT COUNT(*) FROM blobs WHERE name IN ({})",
                placeholders(names.len())
            );
            let found: i64 =
                conn.query_row(&sql, params_from_iter(names.iter()), |row| row.get(0))?;
            Ok(found as usize == names.len())
        })
        .await
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            if delete_record(conn, &name)? == 0 {
                return Err(StowageError::NotFound(name));
            }
            Ok(())
        })
        .await
    }

    async fn claim(&self, claimant: &str, names: &[String]) -> Result<()> {
        if claimant.is_empty() {
            return Err(StowageError::InvalidArgument(
                "claimant cannot be empty".to_string(),
            ));
        }
        if names.is_empty() {
            return Ok(());
        }

        let claimant = claimant.to_string();
        let names = names.to_vec();
        self.with_conn(move |conn| {
            let now = Utc::now().timestamp_millis();
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            for name in &names {
                let known: Option<i64> = tx
                    .query_row("SELECT 1 FROM blobs WHERE name = ?1", [name], |row| {
                        row.get(0)
                    })
                    .optional()?;
                if known.is_none() {
                    // Dropping the transaction rolls back earlier inserts
                    return Err(StowageError::NotFound(name.clone()));
                }

                tx.execute(
                    "INSERT INTO claims (blob_name, claimant, created_at) VALUES (?1, ?2, ?3)",
                    params![name, claimant, now],
                )?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn is_claimed(&self, name: &str) -> Result<bool> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let claimed: bool = conn.query_row(
                "SELECT EXISTS (SELECT 1 FROM claims WHERE blob_name = ?1)",
                [&name],
                |row| row.get(0),
            )?;
            Ok(claimed)
        })
        .await
    }

    async fn release(&self, claimant: &str, names: &[String]) -> Result<()> {
        let names = distinct(names);
        if claimant.is_empty() && names.is_empty() {
            return Err(StowageError::InvalidArgument(
                "release needs a claimant or at least one name".to_string(),
            ));
        }

        let claimant = claimant.to_string();
        self.with_conn(move |conn| {
            let mut clauses = Vec::new();
            let mut values: Vec<String> = Vec::new();

            if !names.is_empty() {
                clauses.push(format!("blob_name IN ({})", placeholders(names.len())));
                values.extend(names.iter().cloned());
            }
            if !claimant.is_empty() {
                clauses.push("claimant = ?".to_string());
                values.push(claimant);
            }

            let sql = format!("DELETE FROM claims WHERE {}", clauses.join(" AND "));
            let released = conn.execute(&sql, params_from_iter(values.iter()))?;
            tracing::debug!("Released {} claims", released);
            Ok(())
        })
        .await
    }

    async fn sweep(
        &self,
        cutoff: DateTime<Utc>,
        visitor: &dyn SweepVisitor,
    ) -> Result<SweepStats> {
        let mut stats = SweepStats::default();

        loop {
            let batch = self.sweep_candidates(cutoff).await?;
            if batch.is_empty() {
                break;
            }
            stats.batches += 1;

            for record in batch {
                // The batch is a snapshot; claims may have landed since
                if self.is_claimed(&record.name).await? {
                    tracing::debug!("Sweep skips {}, claimed after selection", record.name);
                    continue;
                }

                visitor.visit(&record).await?;

                let removed = self.delete_unclaimed(&record.name).await?;
                if removed == 0 {
                    tracing::warn!(
                        "Blob {} was claimed while its bytes were being removed",
                        record.name
                    );
                }
                stats.removed += removed;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::Mutex;

    fn open_ledger(dir: &tempfile::TempDir) -> SqliteClaimLedger {
        SqliteClaimLedger::new(dir.path().join("ledger.db")).unwrap()
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn aged_record(name: &str, age: ChronoDuration) -> BlobRecord {
        let mut record = BlobRecord::new(name, Some(format!("{}.txt", name)));
        record.created_at = Utc::now() - age;
        record
    }

    #[derive(Default)]
    struct RecordingVisitor {
        visited: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl SweepVisitor for RecordingVisitor {
        async fn visit(&self, record: &BlobRecord) -> Result<()> {
            if self.fail_on.as_deref() == Some(record.name.as_str()) {
                return Err(StowageError::ObjectStore("remove failed".to_string()));
            }
            self.visited.lock().unwrap().push(record.name.clone());
            Ok(())
        }
    }

    /// Claims `target` from inside the sweep, as a concurrent `use` would.
    struct ClaimingVisitor {
        ledger: SqliteClaimLedger,
        target: String,
        visited: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SweepVisitor for ClaimingVisitor {
        async fn visit(&self, record: &BlobRecord) -> Result<()> {
            self.visited.lock().unwrap().push(record.name.clone());
            self.ledger.claim("svc", &[self.target.clone()]).await
        }
    }

    #[tokio::test]
    async fn test_register_lookup_exists() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        ledger.register(&BlobRecord::new("a", Some("a.txt".into()))).await.unwrap();
        ledger.register(&BlobRecord::new("b", None)).await.unwrap();

        assert!(ledger.exists(&names(&["a"])).await.unwrap());
        assert!(ledger.exists(&names(&["a", "b", "a"])).await.unwrap());
        assert!(!ledger.exists(&names(&["a", "no"])).await.unwrap());
        assert!(!ledger.exists(&names(&["no"])).await.unwrap());
        assert!(ledger.exists(&[]).await.unwrap());

        let mut records = ledger.lookup(&names(&["a", "b", "missing"])).await.unwrap();
        records.sort_by(|x, y| x.name.cmp(&y.name));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename.as_deref(), Some("a.txt"));
        assert_eq!(records[1].filename, None);
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        ledger.register(&BlobRecord::new("a", None)).await.unwrap();
        let error = ledger.register(&BlobRecord::new("a", None)).await.unwrap_err();
        assert!(matches!(error, StowageError::Conflict(ref name) if name == "a"));
    }

    #[tokio::test]
    async fn test_claim_release_by_claimant() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);
        let who = "who";

        ledger.register(&BlobRecord::new("a", None)).await.unwrap();
        assert!(!ledger.is_claimed("a").await.unwrap());

        ledger.claim(who, &names(&["a"])).await.unwrap();
        assert!(ledger.is_claimed("a").await.unwrap());
        let claims = ledger.claims_for("a").await.unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claimant, who);

        ledger.release(who, &[]).await.unwrap();
        assert!(!ledger.is_claimed("a").await.unwrap());

        // Second identical release is a no-op
        ledger.release(who, &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_filters() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        for name in ["a", "b"] {
            ledger.register(&BlobRecord::new(name, None)).await.unwrap();
        }
        ledger.claim("svc1", &names(&["a", "b"])).await.unwrap();
        ledger.claim("svc2", &names(&["a", "b"])).await.unwrap();

        // Both given: only the intersection goes
        ledger.release("svc1", &names(&["a"])).await.unwrap();
        let claimants: Vec<String> = ledger
            .claims_for("a")
            .await
            .unwrap()
            .into_iter()
            .map(|claim| claim.claimant)
            .collect();
        assert_eq!(claimants, vec!["svc2".to_string()]);
        assert_eq!(ledger.claims_for("b").await.unwrap().len(), 2);

        // Names only: every claimant on those names
        ledger.release("", &names(&["b"])).await.unwrap();
        assert!(!ledger.is_claimed("b").await.unwrap());
        assert!(ledger.is_claimed("a").await.unwrap());

        let error = ledger.release("", &[]).await.unwrap_err();
        assert!(matches!(error, StowageError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_duplicate_claims_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        ledger.register(&BlobRecord::new("a", None)).await.unwrap();
        ledger.claim("svc", &names(&["a"])).await.unwrap();
        ledger.claim("svc", &names(&["a"])).await.unwrap();
        assert_eq!(ledger.claims_for("a").await.unwrap().len(), 2);

        ledger.release("svc", &names(&["a"])).await.unwrap();
        assert!(!ledger.is_claimed("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_claim_unknown_name_is_all_or_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        ledger.register(&BlobRecord::new("a", None)).await.unwrap();
        let error = ledger.claim("svc", &names(&["a", "ghost"])).await.unwrap_err();
        assert!(matches!(error, StowageError::NotFound(ref name) if name == "ghost"));
        assert!(!ledger.is_claimed("a").await.unwrap());

        let error = ledger.claim("", &names(&["a"])).await.unwrap_err();
        assert!(matches!(error, StowageError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_claims() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        ledger.register(&BlobRecord::new("a", None)).await.unwrap();
        ledger.claim("svc", &names(&["a"])).await.unwrap();
        ledger.delete("a").await.unwrap();

        assert!(!ledger.exists(&names(&["a"])).await.unwrap());
        assert!(ledger.claims_for("a").await.unwrap().is_empty());
        assert!(ledger.delete("a").await.unwrap_err().is_not_found());

        // The name can never come back with stale claims attached
        ledger.register(&BlobRecord::new("a", None)).await.unwrap();
        assert!(!ledger.is_claimed("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_spans_batches_and_skips_claimed() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir).with_sweep_batch_size(2);

        for name in ["a", "b", "c", "d", "e"] {
            ledger
                .register(&aged_record(name, ChronoDuration::hours(2)))
                .await
                .unwrap();
        }
        ledger
            .register(&aged_record("fresh", ChronoDuration::zero()))
            .await
            .unwrap();
        ledger.claim("svc", &names(&["c"])).await.unwrap();

        let visitor = RecordingVisitor::default();
        let cutoff = Utc::now() - ChronoDuration::hours(1);
        let stats = ledger.sweep(cutoff, &visitor).await.unwrap();

        let mut visited = visitor.visited.lock().unwrap().clone();
        visited.sort();
        assert_eq!(visited, names(&["a", "b", "d", "e"]));
        assert_eq!(stats.removed, 4);
        assert_eq!(stats.batches, 2);

        assert!(ledger.exists(&names(&["c", "fresh"])).await.unwrap());
        assert!(!ledger.exists(&names(&["a"])).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_cutoff_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        let record = aged_record("edge", ChronoDuration::minutes(5));
        ledger.register(&record).await.unwrap();

        let stored = ledger.lookup(&names(&["edge"])).await.unwrap();
        let visitor = RecordingVisitor::default();
        let stats = ledger.sweep(stored[0].created_at, &visitor).await.unwrap();
        assert_eq!(stats.removed, 0);
        assert!(ledger.exists(&names(&["edge"])).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_aborts_on_visitor_error() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        // Oldest first: a, b, c
        for (name, hours) in [("a", 3), ("b", 2), ("c", 1)] {
            ledger
                .register(&aged_record(name, ChronoDuration::hours(hours)))
                .await
                .unwrap();
        }

        let visitor = RecordingVisitor {
            fail_on: Some("b".to_string()),
            ..Default::default()
        };
        let error = ledger.sweep(Utc::now(), &visitor).await.unwrap_err();
        assert!(matches!(error, StowageError::ObjectStore(_)));

        assert_eq!(visitor.visited.lock().unwrap().clone(), names(&["a"]));
        assert!(!ledger.exists(&names(&["a"])).await.unwrap());
        assert!(ledger.exists(&names(&["b", "c"])).await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_skips_record_claimed_after_selection() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        ledger
            .register(&aged_record("a", ChronoDuration::hours(2)))
            .await
            .unwrap();
        ledger
            .register(&aged_record("b", ChronoDuration::hours(1)))
            .await
            .unwrap();

        // Both are in the first batch; "b" is claimed while "a" is visited
        let visitor = ClaimingVisitor {
            ledger: ledger.clone(),
            target: "b".to_string(),
            visited: Mutex::new(Vec::new()),
        };
        let stats = ledger.sweep(Utc::now(), &visitor).await.unwrap();

        assert_eq!(stats.removed, 1);
        assert_eq!(visitor.visited.lock().unwrap().clone(), names(&["a"]));
        assert!(!ledger.exists(&names(&["a"])).await.unwrap());
        assert!(ledger.exists(&names(&["b"])).await.unwrap());
        assert_eq!(ledger.claims_for("b").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_keeps_record_claimed_during_visit() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        ledger
            .register(&aged_record("a", ChronoDuration::hours(2)))
            .await
            .unwrap();

        let visitor = ClaimingVisitor {
            ledger: ledger.clone(),
            target: "a".to_string(),
            visited: Mutex::new(Vec::new()),
        };
        let stats = ledger.sweep(Utc::now(), &visitor).await.unwrap();

        assert_eq!(stats.removed, 0);
        assert!(ledger.exists(&names(&["a"])).await.unwrap());
        assert!(ledger.is_claimed("a").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_claims_and_releases_wait_for_the_lock() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = open_ledger(&dir);

        let blobs = names(&["a", "b", "c", "d"]);
        for name in &blobs {
            ledger.register(&BlobRecord::new(name.as_str(), None)).await.unwrap();
        }

        let mut handles = Vec::new();
        for i in 0..64 {
            let ledger = ledger.clone();
            let blobs = blobs.clone();
            handles.push(tokio::spawn(async move {
                let claimant = format!("svc{}", i);
                ledger.claim(&claimant, &blobs).await?;
                ledger.release(&claimant, &blobs).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        for name in ["a", "b", "c", "d"] {
            assert!(!ledger.is_claimed(name).await.unwrap());
        }
    }
}
