//! SQLite-backed record store.
//!
//! This module is feature-gated behind `sqlite-persistence`.

#![cfg(feature = "sqlite-persistence")]

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use uniform_kernel::{
    ModificationPolicy, PendingRequestRow, PolicyMessage, PortalError, RequestStatus, RowId,
    SizeLabel, SizeRequest, StudentProfile, StudentRecord, UniformSizes,
};

use super::{status_conflict, RecordStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS students (
    row INTEGER PRIMARY KEY AUTOINCREMENT,
    student_id TEXT NOT NULL UNIQUE,
    english_name TEXT NOT NULL DEFAULT '',
    arabic_name TEXT NOT NULL DEFAULT '',
    grade TEXT NOT NULL DEFAULT '',
    class_name TEXT NOT NULL DEFAULT '',
    shirt TEXT NOT NULL DEFAULT '',
    trousers TEXT NOT NULL DEFAULT '',
    jacket TEXT NOT NULL DEFAULT '',
    notes TEXT NOT NULL DEFAULT '',
    request_status TEXT NOT NULL DEFAULT '',
    updated_at_ms INTEGER NULL
);
CREATE INDEX IF NOT EXISTS idx_students_request_status ON students(request_status);
CREATE TABLE IF NOT EXISTS portal_policy (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    english TEXT NOT NULL,
    arabic TEXT NOT NULL,
    modification TEXT NOT NULL
);
";

const SELECT_RECORD: &str = "SELECT row, student_id, english_name, arabic_name, grade, class_name,
        shirt, trousers, jacket, notes, request_status, updated_at_ms
 FROM students";

fn map_driver_err(prefix: &str, e: impl std::fmt::Display) -> PortalError {
    PortalError::store(prefix, e)
}

fn dt_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn ms_to_dt(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or_else(Utc::now)
}

fn parse_status(value: &str) -> Result<RequestStatus, PortalError> {
    RequestStatus::parse(value).map_err(|e| map_driver_err("stored request status", e))
}

fn parse_size(value: &str) -> Result<Option<SizeLabel>, PortalError> {
    SizeLabel::parse_optional(value).map_err(|e| map_driver_err("stored size", e))
}

fn size_str(size: Option<SizeLabel>) -> &'static str {
    match size {
        Some(size) => size.into(),
        None => "",
    }
}

/// Row exactly as stored, before label parsing.
struct RawRecord {
    row: i64,
    student_id: String,
    english_name: String,
    arabic_name: String,
    grade: String,
    class_name: String,
    shirt: String,
    trousers: String,
    jacket: String,
    notes: String,
    request_status: String,
    updated_at_ms: Option<i64>,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            row: row.get(0)?,
            student_id: row.get(1)?,
            english_name: row.get(2)?,
            arabic_name: row.get(3)?,
            grade: row.get(4)?,
            class_name: row.get(5)?,
            shirt: row.get(6)?,
            trousers: row.get(7)?,
            jacket: row.get(8)?,
            notes: row.get(9)?,
            request_status: row.get(10)?,
            updated_at_ms: row.get(11)?,
        })
    }

    fn into_record(self) -> Result<(RowId, StudentRecord), PortalError> {
        let record = StudentRecord {
            student_id: self.student_id,
            profile: StudentProfile {
                english_name: self.english_name,
                arabic_name: self.arabic_name,
                grade: self.grade,
                class_name: self.class_name,
            },
            sizes: UniformSizes::new(
                parse_size(&self.shirt)?,
                parse_size(&self.trousers)?,
                parse_size(&self.jacket)?,
            ),
            notes: self.notes,
            status: parse_status(&self.request_status)?,
            updated_at: self.updated_at_ms.map(ms_to_dt),
        };
        Ok((self.row as RowId, record))
    }
}

pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Opens (or creates) the database at `path`; `":memory:"` keeps it in RAM.
    pub fn new(path: &str) -> Result<Self, PortalError> {
        let conn = Connection::open(path).map_err(|e| map_driver_err("open sqlite", e))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| map_driver_err("schema bootstrap", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, PortalError> {
        self.conn
            .lock()
            .map_err(|e| map_driver_err("sqlite connection lock poisoned", e))
    }

    fn select_where(
        conn: &Connection,
        filter: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<(RowId, StudentRecord)>, PortalError> {
        let sql = format!("{SELECT_RECORD} {filter} ORDER BY row ASC");
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| map_driver_err("prepare select records", e))?;
        let raws = stmt
            .query_map(args, RawRecord::from_row)
            .map_err(|e| map_driver_err("select records", e))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| map_driver_err("read record row", e))?;
        raws.into_iter().map(RawRecord::into_record).collect()
    }

    fn one(
        tx: &Transaction<'_>,
        filter: &str,
        arg: &dyn rusqlite::ToSql,
    ) -> Result<Option<(RowId, StudentRecord)>, PortalError> {
        let sql = format!("{SELECT_RECORD} {filter}");
        let raw = tx
            .query_row(&sql, [arg], RawRecord::from_row)
            .optional()
            .map_err(|e| map_driver_err("select record", e))?;
        raw.map(RawRecord::into_record).transpose()
    }

    /// Runs `mutate` inside an immediate transaction after checking the
    /// current status against `expected`.
    fn compare_and_set<F>(
        &self,
        what: String,
        filter: &str,
        key: &dyn rusqlite::ToSql,
        expected: &[RequestStatus],
        mutate: F,
    ) -> Result<StudentRecord, PortalError>
    where
        F: FnOnce(&Transaction<'_>, RowId) -> Result<(), PortalError>,
    {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| map_driver_err("begin transition tx", e))?;

        let (row, current) =
            Self::one(&tx, filter, key)?.ok_or_else(|| PortalError::NotFound(what.clone()))?;
        if !expected.contains(&current.status) {
            return Err(status_conflict(what, current.status, expected));
        }
        mutate(&tx, row)?;

        let (_, updated) = Self::one(&tx, "WHERE row = ?1", &(row as i64))?
            .ok_or_else(|| map_driver_err("reread after transition", &what))?;
        tx.commit()
            .map_err(|e| map_driver_err("commit transition tx", e))?;
        Ok(updated)
    }
}

fn set_status(
    tx: &Transaction<'_>,
    row: RowId,
    next: RequestStatus,
    at: DateTime<Utc>,
) -> Result<(), PortalError> {
    tx.execute(
        "UPDATE students SET request_status = ?2, updated_at_ms = ?3 WHERE row = ?1",
        params![row as i64, next.as_ref(), dt_to_ms(at)],
    )
    .map_err(|e| map_driver_err("update request status", e))?;
    Ok(())
}

impl RecordStore for SqliteRecordStore {
    fn enroll(&self, student_id: &str, profile: &StudentProfile) -> Result<RowId, PortalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO students (student_id, english_name, arabic_name, grade, class_name)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(student_id) DO UPDATE SET
                english_name = excluded.english_name,
                arabic_name = excluded.arabic_name,
                grade = excluded.grade,
                class_name = excluded.class_name",
            params![
                student_id,
                profile.english_name,
                profile.arabic_name,
                profile.grade,
                profile.class_name
            ],
        )
        .map_err(|e| map_driver_err("enroll student", e))?;
        let row: i64 = conn
            .query_row(
                "SELECT row FROM students WHERE student_id = ?1",
                [student_id],
                |r| r.get(0),
            )
            .map_err(|e| map_driver_err("read enrolled row", e))?;
        Ok(row as RowId)
    }

    fn find_student(&self, student_id: &str) -> Result<Option<StudentRecord>, PortalError> {
        let conn = self.conn()?;
        let found = Self::select_where(&conn, "WHERE student_id = ?1", [student_id])?;
        Ok(found.into_iter().next().map(|(_, record)| record))
    }

    fn list_queued(&self) -> Result<Vec<PendingRequestRow>, PortalError> {
        let conn = self.conn()?;
        let rows = Self::select_where(
            &conn,
            "WHERE request_status IN (?1, ?2)",
            [
                RequestStatus::Pending.as_ref(),
                RequestStatus::ModificationRequested.as_ref(),
            ],
        )?;
        Ok(rows
            .into_iter()
            .map(|(row, record)| PendingRequestRow { row, record })
            .collect())
    }

    fn list_records(&self) -> Result<Vec<StudentRecord>, PortalError> {
        let conn = self.conn()?;
        let rows = Self::select_where(&conn, "", [])?;
        Ok(rows.into_iter().map(|(_, record)| record).collect())
    }

    fn transition_row(
        &self,
        row: RowId,
        expected: RequestStatus,
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError> {
        let key = i64::try_from(row).map_err(|_| PortalError::NotFound(format!("row {row}")))?;
        self.compare_and_set(
            format!("row {row}"),
            "WHERE row = ?1",
            &key,
            &[expected],
            |tx, row| set_status(tx, row, next, at),
        )
    }

    fn transition_student(
        &self,
        student_id: &str,
        expected: &[RequestStatus],
        next: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError> {
        self.compare_and_set(
            format!("student {student_id}"),
            "WHERE student_id = ?1",
            &student_id,
            expected,
            |tx, row| set_status(tx, row, next, at),
        )
    }

    fn write_submission(
        &self,
        student_id: &str,
        expected: &[RequestStatus],
        request: &SizeRequest,
        at: DateTime<Utc>,
    ) -> Result<StudentRecord, PortalError> {
        self.compare_and_set(
            format!("student {student_id}"),
            "WHERE student_id = ?1",
            &student_id,
            expected,
            |tx, row| {
                tx.execute(
                    "UPDATE students
                     SET shirt = ?2, trousers = ?3, jacket = ?4, notes = ?5,
                         request_status = ?6, updated_at_ms = ?7
                     WHERE row = ?1",
                    params![
                        row as i64,
                        size_str(request.sizes.shirt),
                        size_str(request.sizes.trousers),
                        size_str(request.sizes.jacket),
                        request.notes,
                        RequestStatus::Pending.as_ref(),
                        dt_to_ms(at)
                    ],
                )
                .map_err(|e| map_driver_err("write submission", e))?;
                Ok(())
            },
        )
    }

    fn load_policy(&self) -> Result<PolicyMessage, PortalError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT english, arabic, modification FROM portal_policy WHERE id = 1",
                [],
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| map_driver_err("load policy", e))?;

        let Some((english, arabic, modification)) = row else {
            return Ok(PolicyMessage::default());
        };
        let modification = modification
            .parse::<ModificationPolicy>()
            .map_err(|e| map_driver_err("stored modification policy", e))?;
        Ok(PolicyMessage {
            english,
            arabic,
            modification,
        })
    }

    fn save_policy(&self, message: &PolicyMessage) -> Result<(), PortalError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO portal_policy (id, english, arabic, modification)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                english = excluded.english,
                arabic = excluded.arabic,
                modification = excluded.modification",
            params![
                message.english,
                message.arabic,
                message.modification.as_ref()
            ],
        )
        .map_err(|e| map_driver_err("save policy", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::contract::{assert_record_store_contract, profile};

    #[test]
    fn record_store_contract_sqlite() {
        let store = SqliteRecordStore::new(":memory:").expect("sqlite store");
        assert_record_store_contract(&store, "sqlite");
    }

    #[test]
    fn corrupted_status_surfaces_as_store_error() {
        let store = SqliteRecordStore::new(":memory:").expect("sqlite store");
        store.enroll("x", &profile("X")).expect("enroll");
        store
            .conn()
            .unwrap()
            .execute(
                "UPDATE students SET request_status = 'Archived' WHERE student_id = 'x'",
                [],
            )
            .unwrap();
        assert!(matches!(store.find_student("x"), Err(PortalError::Store(_))));
    }

    #[test]
    fn timestamps_survive_a_round_trip() {
        let store = SqliteRecordStore::new(":memory:").expect("sqlite store");
        store.enroll("t", &profile("T")).expect("enroll");
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).single().unwrap();
        let updated = store
            .write_submission(
                "t",
                &[RequestStatus::Unset],
                &SizeRequest::new(UniformSizes::new(Some(SizeLabel::XXL), None, None), "long arms"),
                at,
            )
            .expect("submit");
        assert_eq!(updated.updated_at, Some(at));
        assert_eq!(updated.sizes.shirt, Some(SizeLabel::XXL));
        assert_eq!(updated.notes, "long arms");
    }
}
