use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, ToSql};

use crate::workflows::claims::domain::{
    CategoryStatistic, Claim, ClaimId, ClaimScoreUpdate, FraudAssessment, FraudBand, NewClaim,
    ProviderStatistic,
};
use crate::workflows::claims::metrics::{ClaimMetrics, ScoreTally};
use crate::workflows::claims::repository::{
    ClaimPage, ClaimQuery, ClaimStore, ClaimTransaction, ClaimView, RepositoryError,
};
use crate::workflows::claims::scoring::BandThresholds;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS claims (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      claim_id TEXT NOT NULL UNIQUE,
      patient_id TEXT,
      age INTEGER,
      gender TEXT,
      date_admitted TEXT,
      date_discharged TEXT,
      service_date TEXT,
      diagnosis TEXT,
      treatment TEXT,
      procedure_code TEXT,
      provider_id TEXT,
      provider_type TEXT,
      fraud_type TEXT,
      claim_charge REAL NOT NULL,
      fraud_score INTEGER NOT NULL DEFAULT 0,
      fraud_category TEXT CHECK (fraud_category IN ('Low', 'Medium', 'High')),
      fraud_reasons TEXT,
      created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS claims_listing_idx
      ON claims (fraud_score DESC, claim_charge DESC);
    CREATE INDEX IF NOT EXISTS claims_procedure_idx ON claims (procedure_code);
    CREATE TABLE IF NOT EXISTS procedures (
      procedure_code TEXT PRIMARY KEY,
      avg_charge REAL NOT NULL,
      std_dev REAL NOT NULL,
      total_claims INTEGER NOT NULL,
      last_updated TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS providers (
      provider_id TEXT NOT NULL,
      provider_type TEXT,
      total_claims INTEGER NOT NULL,
      avg_claim_charge REAL NOT NULL
    );
";

const CLAIM_COLUMNS: &str = "id, claim_id, patient_id, age, gender, date_admitted, \
     date_discharged, service_date, diagnosis, treatment, procedure_code, provider_id, \
     provider_type, fraud_type, claim_charge, fraud_score, fraud_category, fraud_reasons, \
     created_at";

const SEARCH_CLAUSE: &str = "(claim_id LIKE :search ESCAPE '\\' \
     OR patient_id LIKE :search ESCAPE '\\' \
     OR provider_id LIKE :search ESCAPE '\\' \
     OR procedure_code LIKE :search ESCAPE '\\' \
     OR diagnosis LIKE :search ESCAPE '\\' \
     OR treatment LIKE :search ESCAPE '\\')";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed claim store. Each ingestion run is one SQLite transaction;
/// dropping it without commit rolls every write back.
///
/// File databases run in WAL mode with a dedicated read connection, so
/// listings and metrics see the last committed snapshot while a run is in
/// flight. In-memory databases share one connection.
pub struct SqliteClaimStore {
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
}

impl SqliteClaimStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                RepositoryError::Unavailable(format!(
                    "cannot create database directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let writer = Connection::open(path)?;
        writer.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!(%mode, path = %path.display(), "sqlite WAL mode unavailable");
        }
        writer.execute_batch(SCHEMA)?;

        let reader = Connection::open(path)?;
        reader.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Some(Mutex::new(reader)),
        })
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            writer: Mutex::new(conn),
            reader: None,
        })
    }

    fn write_lock(&self) -> MutexGuard<'_, Connection> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_lock(&self) -> MutexGuard<'_, Connection> {
        self.reader
            .as_ref()
            .unwrap_or(&self.writer)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClaimStore for SqliteClaimStore {
    fn transaction<T, F>(&self, work: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut dyn ClaimTransaction) -> Result<T, RepositoryError>,
    {
        let mut conn = self.write_lock();
        let tx = conn.transaction()?;
        let value = {
            let mut handle = SqliteTransaction { conn: &tx };
            let handle: &mut dyn ClaimTransaction = &mut handle;
            work(handle)?
        };
        tx.commit()?;
        Ok(value)
    }

    fn query_claims(&self, query: &ClaimQuery) -> Result<ClaimPage, RepositoryError> {
        let conn = self.read_lock();

        let search = query
            .search
            .as_deref()
            .map(|needle| format!("%{}%", escape_like(needle)));
        let mut clauses = Vec::new();
        let mut filters: Vec<(&str, &dyn ToSql)> = Vec::new();
        if let Some(pattern) = &search {
            clauses.push(SEARCH_CLAUSE);
            filters.push((":search", pattern as &dyn ToSql));
        }
        if let Some(provider_type) = &query.provider_type {
            clauses.push("lower(provider_type) = lower(:provider_type)");
            filters.push((":provider_type", provider_type as &dyn ToSql));
        }
        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM claims {where_clause}"),
            filters.as_slice(),
            |row| row.get(0),
        )?;

        let limit = i64::from(query.page_size);
        let offset = query.offset() as i64;
        let mut paged = filters.clone();
        paged.push((":limit", &limit as &dyn ToSql));
        paged.push((":offset", &offset as &dyn ToSql));

        let mut stmt = conn.prepare(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims {where_clause} \
             ORDER BY fraud_score DESC, claim_charge DESC, claim_id ASC \
             LIMIT :limit OFFSET :offset"
        ))?;
        let items = stmt
            .query_map(paged.as_slice(), StoredClaimRow::read)?
            .map(|row| {
                let claim = row?.into_claim()?;
                Ok(ClaimView::from(&claim))
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(ClaimPage {
            page: query.page,
            page_size: query.page_size,
            total: total as u64,
            items,
        })
    }

    fn metrics(&self, bands: &BandThresholds) -> Result<ClaimMetrics, RepositoryError> {
        let conn = self.read_lock();
        let tally = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(claim_charge), 0.0),
                    COALESCE(SUM(CASE WHEN fraud_score >= ?1 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN fraud_category = 'Low' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN fraud_category = 'Medium' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN fraud_category = 'High' THEN 1 ELSE 0 END), 0)
             FROM claims",
            params![i64::from(bands.high_min)],
            |row| {
                Ok(ScoreTally {
                    total_claims: row.get::<_, i64>(0)? as u64,
                    total_charge: row.get(1)?,
                    flagged: row.get::<_, i64>(2)? as u64,
                    low: row.get::<_, i64>(3)? as u64,
                    medium: row.get::<_, i64>(4)? as u64,
                    high: row.get::<_, i64>(5)? as u64,
                })
            },
        )?;
        Ok(tally.summarize())
    }

    fn category_stats(&self) -> Result<Vec<CategoryStatistic>, RepositoryError> {
        let conn = self.read_lock();
        let mut stmt = conn.prepare(
            "SELECT procedure_code, avg_charge, std_dev, total_claims, last_updated
             FROM procedures ORDER BY procedure_code",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CategoryStatistic {
                category: row.get(0)?,
                mean_charge: row.get(1)?,
                std_dev: row.get(2)?,
                claim_count: row.get::<_, i64>(3)? as u64,
                last_updated: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn provider_stats(&self) -> Result<Vec<ProviderStatistic>, RepositoryError> {
        let conn = self.read_lock();
        let mut stmt = conn.prepare(
            "SELECT provider_id, provider_type, total_claims, avg_claim_charge
             FROM providers ORDER BY provider_id, provider_type",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ProviderStatistic {
                provider_id: row.get(0)?,
                provider_type: row.get(1)?,
                claim_count: row.get::<_, i64>(2)? as u64,
                average_charge: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn reset(&self) -> Result<(), RepositoryError> {
        let mut conn = self.write_lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM claims;
             DELETE FROM procedures;
             DELETE FROM providers;",
        )?;
        tx.commit()?;
        Ok(())
    }

    fn drop_schema(&self) -> Result<(), RepositoryError> {
        let mut conn = self.write_lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS claims;
             DROP TABLE IF EXISTS procedures;
             DROP TABLE IF EXISTS providers;",
        )?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        Ok(())
    }
}

struct SqliteTransaction<'t> {
    conn: &'t Connection,
}

impl ClaimTransaction for SqliteTransaction<'_> {
    fn insert_claims(&mut self, claims: &[NewClaim]) -> Result<usize, RepositoryError> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR IGNORE INTO claims (
               claim_id, patient_id, age, gender, date_admitted, date_discharged, service_date,
               diagnosis, treatment, procedure_code, provider_id, provider_type, fraud_type,
               claim_charge, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;

        let created_at = Utc::now();
        let mut inserted = 0;
        for claim in claims {
            inserted += stmt.execute(params![
                claim.claim_id.0,
                claim.patient_id,
                claim.age,
                claim.gender,
                claim.date_admitted,
                claim.date_discharged,
                claim.service_date,
                claim.diagnosis,
                claim.treatment,
                claim.procedure_code,
                claim.provider_id,
                claim.provider_type,
                claim.fraud_type,
                claim.claim_charge,
                created_at,
            ])?;
        }
        Ok(inserted)
    }

    fn claims(&self) -> Result<Vec<Claim>, RepositoryError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CLAIM_COLUMNS} FROM claims ORDER BY id"))?;
        let claims = stmt
            .query_map([], StoredClaimRow::read)?
            .map(|row| row?.into_claim())
            .collect::<Result<Vec<_>, RepositoryError>>()?;
        Ok(claims)
    }

    fn replace_category_stats(
        &mut self,
        stats: &[CategoryStatistic],
    ) -> Result<(), RepositoryError> {
        self.conn.execute("DELETE FROM procedures", [])?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO procedures (procedure_code, avg_charge, std_dev, total_claims, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for stat in stats {
            stmt.execute(params![
                stat.category,
                stat.mean_charge,
                stat.std_dev,
                stat.claim_count as i64,
                stat.last_updated,
            ])?;
        }
        Ok(())
    }

    fn apply_scores(&mut self, updates: &[ClaimScoreUpdate]) -> Result<(), RepositoryError> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE claims SET fraud_score = ?1, fraud_category = ?2, fraud_reasons = ?3
             WHERE claim_id = ?4",
        )?;
        for update in updates {
            let reasons = serde_json::to_string(&update.assessment.reasons)?;
            let changed = stmt.execute(params![
                i64::from(update.assessment.score),
                update.assessment.band.label(),
                reasons,
                update.claim_id.0,
            ])?;
            if changed == 0 {
                return Err(RepositoryError::Corrupt(format!(
                    "claim {} is not stored",
                    update.claim_id.0
                )));
            }
        }
        Ok(())
    }

    fn replace_provider_stats(
        &mut self,
        stats: &[ProviderStatistic],
    ) -> Result<(), RepositoryError> {
        self.conn.execute("DELETE FROM providers", [])?;
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO providers (provider_id, provider_type, total_claims, avg_claim_charge)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for stat in stats {
            stmt.execute(params![
                stat.provider_id,
                stat.provider_type,
                stat.claim_count as i64,
                stat.average_charge,
            ])?;
        }
        Ok(())
    }

    fn count_claims(&self) -> Result<u64, RepositoryError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM claims", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

/// Column values of one `claims` row before derived fields are decoded.
struct StoredClaimRow {
    id: i64,
    record: NewClaim,
    fraud_score: i64,
    fraud_category: Option<String>,
    fraud_reasons: Option<String>,
    created_at: DateTime<Utc>,
}

impl StoredClaimRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            record: NewClaim {
                claim_id: ClaimId(row.get(1)?),
                patient_id: row.get(2)?,
                age: row.get(3)?,
                gender: row.get(4)?,
                date_admitted: row.get(5)?,
                date_discharged: row.get(6)?,
                service_date: row.get(7)?,
                diagnosis: row.get(8)?,
                treatment: row.get(9)?,
                procedure_code: row.get(10)?,
                provider_id: row.get(11)?,
                provider_type: row.get(12)?,
                fraud_type: row.get(13)?,
                claim_charge: row.get(14)?,
            },
            fraud_score: row.get(15)?,
            fraud_category: row.get(16)?,
            fraud_reasons: row.get(17)?,
            created_at: row.get(18)?,
        })
    }

    fn into_claim(self) -> Result<Claim, RepositoryError> {
        let assessment = match self.fraud_category {
            None => None,
            Some(label) => {
                let band = FraudBand::from_label(&label).ok_or_else(|| {
                    RepositoryError::Corrupt(format!("unknown fraud category '{label}'"))
                })?;
                let reasons = match self.fraud_reasons.as_deref() {
                    Some(raw) if !raw.trim().is_empty() => serde_json::from_str(raw)?,
                    _ => Vec::new(),
                };
                Some(FraudAssessment {
                    score: self.fraud_score.clamp(0, 100) as u8,
                    band,
                    reasons,
                })
            }
        };

        Ok(Claim {
            id: self.id as u64,
            record: self.record,
            created_at: self.created_at,
            assessment,
        })
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
