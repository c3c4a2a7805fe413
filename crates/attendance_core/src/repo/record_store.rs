//! Record store contract and SQLite implementation.
//!
//! # Responsibility
//! - Resolve users by email and persist the enrollment flag.
//! - Append attendance events and query them by half-open time range.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate before SQL mutations.
//! - The stored `biometric_enrolled` flag never reverts to `0`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::attendance::{AttendanceEvent, AttendanceKind, TimeRange};
use crate::model::geo::Coordinate;
use crate::model::user::{normalize_email, User, UserId, UserValidationError};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    uuid,
    email,
    display_name,
    credential,
    biometric_enrolled
FROM users";

const EVENT_SELECT_SQL: &str = "SELECT
    uuid,
    user_uuid,
    kind,
    recorded_at,
    latitude,
    longitude
FROM attendance_events";

pub type RepoResult<T> = Result<T, RepoError>;

/// Record store error for user and attendance persistence.
#[derive(Debug)]
pub enum RepoError {
    Validation(UserValidationError),
    Db(DbError),
    /// A uniqueness or foreign-key constraint rejected the write.
    Conflict(String),
    InvalidEvent(String),
    InvalidData(String),
    /// A previous holder of the connection panicked.
    Poisoned,
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Conflict(message) => write!(f, "record conflict: {message}"),
            Self::InvalidEvent(message) => write!(f, "invalid attendance event: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record data: {message}"),
            Self::Poisoned => write!(f, "record store connection is poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match &value {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(
                    message
                        .clone()
                        .unwrap_or_else(|| "constraint violation".to_string()),
                )
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Durable store consulted by the attendance workflow.
///
/// Every call may fail; callers must not treat a failed read as "no rows".
pub trait RecordStore: Send + Sync {
    /// Looks up one user by email (normalized before matching).
    fn find_user(&self, email: &str) -> RepoResult<Option<User>>;
    /// Returns one user's events inside `range`, oldest first.
    fn find_events(&self, user_uuid: UserId, range: TimeRange) -> RepoResult<Vec<AttendanceEvent>>;
    /// Inserts or updates a user record.
    fn save_user(&self, user: &User) -> RepoResult<()>;
    /// Appends one immutable attendance event.
    fn append_event(&self, event: &AttendanceEvent) -> RepoResult<()>;
}

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Wraps a connection that already has migrations applied.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    fn conn(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::Poisoned)
    }
}

impl RecordStore for SqliteRecordStore {
    fn find_user(&self, email: &str) -> RepoResult<Option<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{USER_SELECT_SQL} WHERE email = ?1;"))?;
        let mut rows = stmt.query([normalize_email(email)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_user_row(row)?));
        }
        Ok(None)
    }

    fn find_events(&self, user_uuid: UserId, range: TimeRange) -> RepoResult<Vec<AttendanceEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE user_uuid = ?1
               AND recorded_at >= ?2
               AND recorded_at < ?3
             ORDER BY recorded_at ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            user_uuid.to_string(),
            range.start_ms,
            range.end_ms
        ])?;

        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }

    fn save_user(&self, user: &User) -> RepoResult<()> {
        user.validate()?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (
                uuid,
                email,
                display_name,
                credential,
                biometric_enrolled
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(uuid) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                credential = excluded.credential,
                biometric_enrolled = MAX(users.biometric_enrolled, excluded.biometric_enrolled),
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                user.uuid.to_string(),
                normalize_email(&user.email),
                user.display_name.trim(),
                user.credential.as_deref(),
                bool_to_int(user.biometric_enrolled),
            ],
        )?;
        Ok(())
    }

    fn append_event(&self, event: &AttendanceEvent) -> RepoResult<()> {
        if !event.location.is_valid() {
            return Err(RepoError::InvalidEvent(format!(
                "location {} is out of range",
                event.location
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO attendance_events (
                uuid,
                user_uuid,
                kind,
                recorded_at,
                latitude,
                longitude
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                event.uuid.to_string(),
                event.user_uuid.to_string(),
                event.kind.as_str(),
                event.recorded_at_ms,
                event.location.latitude,
                event.location.longitude,
            ],
        )?;
        Ok(())
    }
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let uuid = parse_uuid(row, "uuid", "users.uuid")?;
    let biometric_enrolled = parse_bool(
        row.get::<_, i64>("biometric_enrolled")?,
        "users.biometric_enrolled",
    )?;

    let user = User {
        uuid,
        email: row.get("email")?,
        display_name: row.get("display_name")?,
        credential: row.get("credential")?,
        biometric_enrolled,
    };
    user.validate()?;
    Ok(user)
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<AttendanceEvent> {
    let uuid = parse_uuid(row, "uuid", "attendance_events.uuid")?;
    let user_uuid = parse_uuid(row, "user_uuid", "attendance_events.user_uuid")?;

    let kind_text: String = row.get("kind")?;
    let kind = AttendanceKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid kind `{kind_text}` in attendance_events.kind"
        ))
    })?;

    Ok(AttendanceEvent {
        uuid,
        user_uuid,
        kind,
        recorded_at_ms: row.get("recorded_at")?,
        location: Coordinate::new(row.get("latitude")?, row.get("longitude")?),
    })
}

fn parse_uuid(row: &Row<'_>, column: &str, qualified: &str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{text}` in {qualified}")))
}

fn parse_bool(value: i64, qualified: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {qualified}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
