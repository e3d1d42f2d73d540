use crate::catalog::{self, CATALOG};
use crate::errors::{AttestError, Result, StorageContext};
use crate::model::{
    Category, Control, ControlStatus, Evidence, EvidenceListing, Identity, NewRisk, Rating, Risk,
    RiskStatus, RiskUpdate, User,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// SQLite-backed store for controls, evidence index rows, risks and users.
///
/// All calls go through one connection behind a mutex. Nothing coordinates
/// two processes writing the same control or risk: the last write wins.
#[derive(Clone)]
pub struct Store {
    pub conn: Arc<Mutex<Connection>>,
}

pub struct StoreStats {
    pub controls: Option<u64>,
    pub assessed: Option<u64>,
    pub evidence: Option<u64>,
    pub risks: Option<u64>,
    pub users: Option<u64>,
    pub version: Option<String>,
}

const CONTROL_COLUMNS: &str = "control_id, title, description, category, status, notes, assessed_by, assessed_at, updated_at";
const EVIDENCE_COLUMNS: &str = "e.id, e.control_id, e.filename, e.original_filename, e.file_path, e.file_size, e.sha256, e.uploaded_by, e.uploaded_at";
const RISK_COLUMNS: &str = "id, title, description, likelihood, impact, mitigation, owner, status, created_by, created_at, updated_at";

/// Columns of a new evidence index row. The content itself already sits in
/// the blob store under `filename`.
pub(crate) struct EvidenceRow<'a> {
    pub control_id: &'a str,
    pub filename: &'a str,
    pub original_filename: &'a str,
    pub file_path: &'a str,
    pub file_size: u64,
    pub sha256: &'a str,
    pub uploaded_by: &'a Identity,
    pub uploaded_at: DateTime<Utc>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).storage("create database directory")?;
        }
        let conn = Connection::open(path).storage("open sqlite db")?;
        conn.busy_timeout(Duration::from_secs(5))
            .storage("set busy timeout")?;
        conn.execute("PRAGMA foreign_keys = ON", [])
            .storage("enable foreign keys")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory().storage("open in-memory sqlite db")?;
        conn.execute("PRAGMA foreign_keys = ON", [])
            .storage("enable foreign keys")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AttestError::storage("lock connection", "sqlite connection mutex poisoned"))
    }

    pub fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(crate::storage::schema::DDL)
            .storage("apply schema")?;

        // Evidence tables created before content digests were recorded.
        migrate_v1(&conn)?;

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .storage("read schema version")?;
        if version < crate::storage::schema::SCHEMA_VERSION {
            conn.execute_batch(&format!(
                "PRAGMA user_version = {}",
                crate::storage::schema::SCHEMA_VERSION
            ))
            .storage("write schema version")?;
        }
        Ok(())
    }

    // --- Users ---

    /// Records an identity the first time it is seen. Existing rows keep their
    /// email unless a new one is supplied.
    pub fn register_user(&self, user: &Identity, email: Option<&str>) -> Result<User> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users(username, email, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(username) DO UPDATE SET email=COALESCE(excluded.email, users.email)",
            params![user.as_str(), email, ts(Utc::now())],
        )
        .storage("register user")?;
        conn.query_row(
            "SELECT id, username, email, created_at FROM users WHERE username = ?1",
            params![user.as_str()],
            user_from_row,
        )
        .storage("read user")
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, username, email, created_at FROM users ORDER BY username")
            .storage("list users")?;
        let rows = stmt
            .query_map([], user_from_row)
            .storage("list users")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage("list users")?;
        Ok(rows)
    }

    // --- Controls ---

    /// Inserts every catalog control that is not present yet and returns how
    /// many rows were added. Existing rows, including their assessment state,
    /// are left untouched.
    pub fn seed_controls(&self) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().storage("begin seed")?;
        let now = ts(Utc::now());
        let mut inserted = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO controls(control_id, title, description, category, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .storage("seed controls")?;
            for c in CATALOG.iter() {
                inserted += stmt
                    .execute(params![
                        c.control_id,
                        c.title,
                        c.description,
                        c.category.as_str(),
                        now
                    ])
                    .storage("seed controls")?;
            }
        }
        tx.commit().storage("commit seed")?;

        tracing::info!(
            event = "attest.catalog.seeded",
            inserted,
            catalog_size = CATALOG.len(),
            "seeded control catalog"
        );
        Ok(inserted)
    }

    /// Controls ordered by identifier, numeric segments compared as numbers
    /// ("A.5.2" before "A.5.10").
    pub fn list_controls(&self, category: Option<Category>) -> Result<Vec<Control>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONTROL_COLUMNS} FROM controls WHERE (?1 IS NULL OR category = ?1)"
            ))
            .storage("list controls")?;
        let mut controls = stmt
            .query_map(params![category.map(|c| c.as_str())], control_from_row)
            .storage("list controls")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage("list controls")?;
        catalog::sort_controls(&mut controls);
        Ok(controls)
    }

    pub fn get_control(&self, control_id: &str) -> Result<Control> {
        let conn = self.lock()?;
        fetch_control(&conn, control_id)?.ok_or_else(|| AttestError::not_found("control", control_id))
    }

    pub fn control_exists(&self, control_id: &str) -> Result<bool> {
        let conn = self.lock()?;
        control_exists(&conn, control_id)
    }

    /// Overwrites status, notes and assessor of one control and stamps both
    /// timestamps. No history is kept.
    pub fn update_control_assessment(
        &self,
        control_id: &str,
        status: ControlStatus,
        notes: &str,
        assessor: &Identity,
    ) -> Result<Control> {
        let conn = self.lock()?;
        let now = ts(Utc::now());
        let changed = conn
            .execute(
                "UPDATE controls
                 SET status = ?1, notes = ?2, assessed_by = ?3, assessed_at = ?4, updated_at = ?4
                 WHERE control_id = ?5",
                params![status.as_str(), notes, assessor.as_str(), now, control_id],
            )
            .storage("update control assessment")?;
        if changed == 0 {
            return Err(AttestError::not_found("control", control_id));
        }

        tracing::info!(
            event = "attest.control.assessed",
            control_id,
            status = %status,
            assessor = %assessor,
        );

        fetch_control(&conn, control_id)?.ok_or_else(|| AttestError::not_found("control", control_id))
    }

    /// Distinct categories present in the store, in catalog order.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT category FROM controls")
            .storage("list categories")?;
        let mut cats = stmt
            .query_map([], |row| {
                let raw: String = row.get(0)?;
                Category::parse(&raw).ok_or_else(|| bad_value(0, "category", &raw))
            })
            .storage("list categories")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage("list categories")?;
        cats.sort();
        Ok(cats)
    }

    /// Most recently assessed controls first.
    pub fn recent_assessments(&self, limit: u32) -> Result<Vec<Control>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CONTROL_COLUMNS} FROM controls
                 WHERE assessed_at IS NOT NULL
                 ORDER BY assessed_at DESC, id DESC
                 LIMIT ?1"
            ))
            .storage("recent assessments")?;
        let rows = stmt
            .query_map(params![limit], control_from_row)
            .storage("recent assessments")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage("recent assessments")?;
        Ok(rows)
    }

    // --- Evidence index ---

    /// Inserts an index row after checking the owning control exists; both
    /// happen under the same lock.
    pub(crate) fn insert_evidence(&self, row: &EvidenceRow<'_>) -> Result<Evidence> {
        let conn = self.lock()?;
        if !control_exists(&conn, row.control_id)? {
            return Err(AttestError::not_found("control", row.control_id));
        }
        conn.execute(
            "INSERT INTO evidence(control_id, filename, original_filename, file_path, file_size, sha256, uploaded_by, uploaded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                row.control_id,
                row.filename,
                row.original_filename,
                row.file_path,
                row.file_size as i64,
                row.sha256,
                row.uploaded_by.as_str(),
                ts(row.uploaded_at)
            ],
        )
        .storage("insert evidence")?;
        let id = conn.last_insert_rowid();
        fetch_evidence(&conn, id)?.ok_or_else(|| AttestError::not_found("evidence", id))
    }

    pub fn get_evidence(&self, id: i64) -> Result<Option<Evidence>> {
        let conn = self.lock()?;
        fetch_evidence(&conn, id)
    }

    /// Evidence rows with the owning control's title, newest upload first.
    pub fn list_evidence(&self) -> Result<Vec<EvidenceListing>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {EVIDENCE_COLUMNS}, c.title
                 FROM evidence e
                 LEFT JOIN controls c ON e.control_id = c.control_id
                 ORDER BY e.uploaded_at DESC, e.id DESC"
            ))
            .storage("list evidence")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(EvidenceListing {
                    evidence: evidence_from_row(row)?,
                    control_title: row.get(9)?,
                })
            })
            .storage("list evidence")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage("list evidence")?;
        Ok(rows)
    }

    pub(crate) fn delete_evidence_row(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let n = conn
            .execute("DELETE FROM evidence WHERE id = ?1", params![id])
            .storage("delete evidence")?;
        Ok(n > 0)
    }

    pub fn evidence_count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM evidence", [], |r| r.get(0))
            .storage("count evidence")?;
        Ok(n as u64)
    }

    pub(crate) fn evidence_keys(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT filename FROM evidence")
            .storage("list evidence keys")?;
        let keys = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .storage("list evidence keys")?
            .collect::<rusqlite::Result<HashSet<_>>>()
            .storage("list evidence keys")?;
        Ok(keys)
    }

    // --- Risk register ---

    pub fn add_risk(&self, input: &NewRisk, creator: &Identity) -> Result<Risk> {
        let title = required(&input.title, "title")?;
        let likelihood = Rating::new(input.likelihood, "likelihood")?;
        let impact = Rating::new(input.impact, "impact")?;

        let conn = self.lock()?;
        let now = ts(Utc::now());
        conn.execute(
            "INSERT INTO risks(title, description, likelihood, impact, mitigation, owner, status, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                title,
                input.description,
                likelihood.get(),
                impact.get(),
                input.mitigation,
                input.owner,
                RiskStatus::Open.as_str(),
                creator.as_str(),
                now
            ],
        )
        .storage("insert risk")?;
        let id = conn.last_insert_rowid();

        tracing::info!(
            event = "attest.risk.added",
            risk_id = id,
            score = likelihood.get() * impact.get(),
            creator = %creator,
        );

        fetch_risk(&conn, id)?.ok_or_else(|| AttestError::not_found("risk", id))
    }

    /// Replaces every editable field of a risk; the score follows the new
    /// ratings.
    pub fn update_risk(&self, id: i64, update: &RiskUpdate, actor: &Identity) -> Result<Risk> {
        let title = required(&update.title, "title")?;
        let likelihood = Rating::new(update.likelihood, "likelihood")?;
        let impact = Rating::new(update.impact, "impact")?;

        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE risks
                 SET title = ?1, description = ?2, likelihood = ?3, impact = ?4,
                     mitigation = ?5, owner = ?6, status = ?7, updated_at = ?8
                 WHERE id = ?9",
                params![
                    title,
                    update.description,
                    likelihood.get(),
                    impact.get(),
                    update.mitigation,
                    update.owner,
                    update.status.as_str(),
                    ts(Utc::now()),
                    id
                ],
            )
            .storage("update risk")?;
        if changed == 0 {
            return Err(AttestError::not_found("risk", id));
        }

        tracing::info!(
            event = "attest.risk.updated",
            risk_id = id,
            score = likelihood.get() * impact.get(),
            status = %update.status,
            actor = %actor,
        );

        fetch_risk(&conn, id)?.ok_or_else(|| AttestError::not_found("risk", id))
    }

    pub fn get_risk(&self, id: i64) -> Result<Risk> {
        let conn = self.lock()?;
        fetch_risk(&conn, id)?.ok_or_else(|| AttestError::not_found("risk", id))
    }

    pub fn delete_risk(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let n = conn
            .execute("DELETE FROM risks WHERE id = ?1", params![id])
            .storage("delete risk")?;
        if n == 0 {
            return Err(AttestError::not_found("risk", id));
        }
        tracing::info!(event = "attest.risk.deleted", risk_id = id);
        Ok(())
    }

    /// Highest score first; equal scores newest first.
    pub fn list_risks(&self) -> Result<Vec<Risk>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RISK_COLUMNS} FROM risks
                 ORDER BY risk_score DESC, created_at DESC, id DESC"
            ))
            .storage("list risks")?;
        let rows = stmt
            .query_map([], risk_from_row)
            .storage("list risks")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .storage("list risks")?;
        Ok(rows)
    }

    pub fn stats_best_effort(&self) -> Result<StoreStats> {
        let conn = self.lock()?;
        let count = |sql: &str| -> Option<u64> {
            conn.query_row(sql, [], |r| r.get::<_, i64>(0).map(|x| x as u64))
                .ok()
        };

        let v_str: Option<String> = conn
            .query_row("PRAGMA user_version", [], |r| r.get(0))
            .ok()
            .map(|v: i64| v.to_string());

        Ok(StoreStats {
            controls: count("SELECT COUNT(*) FROM controls"),
            assessed: count("SELECT COUNT(*) FROM controls WHERE assessed_at IS NOT NULL"),
            evidence: count("SELECT COUNT(*) FROM evidence"),
            risks: count("SELECT COUNT(*) FROM risks"),
            users: count("SELECT COUNT(*) FROM users"),
            version: v_str,
        })
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AttestError::invalid(format!("{} is required", field)));
    }
    Ok(trimmed)
}

fn control_exists(conn: &Connection, control_id: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM controls WHERE control_id = ?1",
        params![control_id],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .storage("look up control")
}

fn fetch_control(conn: &Connection, control_id: &str) -> Result<Option<Control>> {
    conn.query_row(
        &format!("SELECT {CONTROL_COLUMNS} FROM controls WHERE control_id = ?1"),
        params![control_id],
        control_from_row,
    )
    .optional()
    .storage("read control")
}

fn fetch_evidence(conn: &Connection, id: i64) -> Result<Option<Evidence>> {
    conn.query_row(
        &format!("SELECT {EVIDENCE_COLUMNS} FROM evidence e WHERE e.id = ?1"),
        params![id],
        evidence_from_row,
    )
    .optional()
    .storage("read evidence")
}

fn fetch_risk(conn: &Connection, id: i64) -> Result<Option<Risk>> {
    conn.query_row(
        &format!("SELECT {RISK_COLUMNS} FROM risks WHERE id = ?1"),
        params![id],
        risk_from_row,
    )
    .optional()
    .storage("read risk")
}

fn control_from_row(row: &Row<'_>) -> rusqlite::Result<Control> {
    let category: String = row.get(3)?;
    let status: String = row.get(4)?;
    Ok(Control {
        control_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: Category::parse(&category).ok_or_else(|| bad_value(3, "category", &category))?,
        status: ControlStatus::parse(&status).ok_or_else(|| bad_value(4, "status", &status))?,
        notes: row.get(5)?,
        assessed_by: row.get(6)?,
        assessed_at: opt_ts(row, 7)?,
        updated_at: req_ts(row, 8)?,
    })
}

fn evidence_from_row(row: &Row<'_>) -> rusqlite::Result<Evidence> {
    Ok(Evidence {
        id: row.get(0)?,
        control_id: row.get(1)?,
        filename: row.get(2)?,
        original_filename: row.get(3)?,
        file_path: row.get(4)?,
        file_size: row.get::<_, i64>(5)?.max(0) as u64,
        sha256: row.get(6)?,
        uploaded_by: row.get(7)?,
        uploaded_at: req_ts(row, 8)?,
    })
}

fn risk_from_row(row: &Row<'_>) -> rusqlite::Result<Risk> {
    let status: String = row.get(7)?;
    Ok(Risk {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        likelihood: rating(row, 3, "likelihood")?,
        impact: rating(row, 4, "impact")?,
        mitigation: row.get(5)?,
        owner: row.get(6)?,
        status: RiskStatus::parse(&status).ok_or_else(|| bad_value(7, "risk status", &status))?,
        created_by: row.get(8)?,
        created_at: req_ts(row, 9)?,
        updated_at: req_ts(row, 10)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        created_at: req_ts(row, 3)?,
    })
}

fn rating(row: &Row<'_>, idx: usize, field: &str) -> rusqlite::Result<Rating> {
    let raw: i64 = row.get(idx)?;
    Rating::new(raw, field)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn bad_value(idx: usize, what: &str, raw: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unexpected {} value '{}'", what, raw).into(),
    )
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
/// ordering in SQL matches time ordering.
pub(crate) fn ts(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn req_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(idx, &raw)
}

fn opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| parse_ts(idx, &s)).transpose()
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    let cols = get_columns(conn, "evidence")?;
    add_column_if_missing(conn, &cols, "evidence", "sha256", "TEXT NOT NULL DEFAULT ''")?;
    Ok(())
}

fn get_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({})", table))
        .storage("read table info")?;
    let cols = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .storage("read table info")?
        .collect::<rusqlite::Result<HashSet<_>>>()
        .storage("read table info")?;
    Ok(cols)
}

fn add_column_if_missing(
    conn: &Connection,
    cols: &HashSet<String>,
    table: &str,
    col: &str,
    ty: &str,
) -> Result<()> {
    if !cols.contains(col) {
        let sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, col, ty);
        conn.execute(&sql, []).storage("migrate schema")?;
    }
    Ok(())
}
