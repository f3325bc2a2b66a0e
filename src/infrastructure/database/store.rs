//! Scoped Transactions
//!
//! The store's transaction primitive: a caller passes a closure, the store
//! begins a transaction, installs its handle into a [`DbSession`], runs the
//! closure, commits on success and rolls back on error. Nested calls reuse
//! the outer transaction. Repositories receive the session and execute on
//! its handle when one is present, otherwise on the pool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnection, PgPool, Postgres};
use sqlx::Transaction;
use tokio::sync::{Mutex, MutexGuard};

/// Errors surfaced by the storage layer, mapped from SQLSTATE where a domain
/// meaning exists.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,

    #[error("booking interval conflicts with an existing active booking")]
    BookingTimeConflict,

    #[error("user with this email already exists")]
    UserAlreadyExists,

    #[error("referenced place does not exist")]
    PlaceNotFound,

    #[error("booking start time must precede end time")]
    InvalidBookingTime,

    #[error("booking duration out of allowed bounds")]
    InvalidDuration,

    #[error("transaction already finalized")]
    TransactionClosed,

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

/// Translate a SQLSTATE code plus constraint name to a domain-meaningful
/// store error, if one applies.
fn map_violation(code: &str, constraint: Option<&str>) -> Option<StoreError> {
    match code {
        // exclusion_violation: the bookings non-overlap constraint
        "23P01" => Some(StoreError::BookingTimeConflict),
        // unique_violation
        "23505" => match constraint {
            Some("users_email_key") => Some(StoreError::UserAlreadyExists),
            _ => None,
        },
        // foreign_key_violation
        "23503" => match constraint {
            Some("bookings_place_id_fkey") => Some(StoreError::PlaceNotFound),
            _ => None,
        },
        // check_violation
        "23514" => match constraint {
            Some("chk_time_order") => Some(StoreError::InvalidBookingTime),
            Some("chk_duration_hours") => Some(StoreError::InvalidDuration),
            _ => None,
        },
        _ => None,
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = err {
            return StoreError::NotFound;
        }
        if let Some(db_err) = err.as_database_error() {
            if let Some(code) = db_err.code() {
                if let Some(mapped) = map_violation(code.as_ref(), db_err.constraint()) {
                    return mapped;
                }
            }
        }
        StoreError::Database(err)
    }
}

type TxSlot = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// Per-operation database session carrying the active transaction handle,
/// if any. Cloning shares the same handle.
#[derive(Clone, Default)]
pub struct DbSession {
    tx: Option<TxSlot>,
}

impl DbSession {
    /// A session with no transaction; statements auto-commit on the pool.
    pub fn root() -> Self {
        Self::default()
    }

    fn scoped(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Some(Arc::new(Mutex::new(Some(tx)))),
        }
    }

    /// Whether this session runs inside a transaction.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    /// Resolve the connection to execute on: the transaction handle when
    /// present, otherwise a fresh pool connection.
    pub async fn conn<'a>(&'a self, pool: &PgPool) -> Result<DbConn<'a>, StoreError> {
        match &self.tx {
            Some(slot) => {
                let guard = slot.lock().await;
                if guard.is_none() {
                    return Err(StoreError::TransactionClosed);
                }
                Ok(DbConn::Scoped(guard))
            }
            None => Ok(DbConn::Pooled(pool.acquire().await.map_err(StoreError::Database)?)),
        }
    }

    async fn take_tx(&self) -> Option<Transaction<'static, Postgres>> {
        match &self.tx {
            Some(slot) => slot.lock().await.take(),
            None => None,
        }
    }
}

/// A leased connection: either pooled (auto-commit) or the scoped
/// transaction of the enclosing [`Store::in_tx`] call.
pub enum DbConn<'a> {
    Pooled(PoolConnection<Postgres>),
    Scoped(MutexGuard<'a, Option<Transaction<'static, Postgres>>>),
}

impl DbConn<'_> {
    /// The executor for sqlx query calls.
    pub fn as_exec(&mut self) -> &mut PgConnection {
        match self {
            DbConn::Pooled(conn) => &mut **conn,
            DbConn::Scoped(guard) => match guard.as_mut() {
                Some(tx) => &mut **tx,
                // the slot is only emptied by `in_tx` after the scoped
                // closure has returned, which requires taking this lock
                None => unreachable!("transaction slot emptied while leased"),
            },
        }
    }
}

/// Scoped-transaction seam. Services are generic over this so tests can run
/// their transactional flows without a database.
pub trait Transactor: Send + Sync {
    /// Run `f` within a transaction bound to the session handed to it.
    /// Commits when `f` returns `Ok`, rolls back otherwise. When `db` is
    /// already transactional, `f` joins the outer transaction.
    fn in_tx<'a, T, E, F, Fut>(
        &'a self,
        db: &'a DbSession,
        f: F,
    ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>
    where
        T: Send + 'a,
        E: From<StoreError> + Send + 'a,
        F: FnOnce(DbSession) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a;
}

/// Durable transactional storage entry point. Owns the connection pool and
/// implements the scoped-transaction primitive on top of it.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Transactor for Store {
    fn in_tx<'a, T, E, F, Fut>(
        &'a self,
        db: &'a DbSession,
        f: F,
    ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>
    where
        T: Send + 'a,
        E: From<StoreError> + Send + 'a,
        F: FnOnce(DbSession) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
    {
        Box::pin(async move {
            if db.in_transaction() {
                return f(db.clone()).await;
            }

            let tx = self
                .pool
                .begin()
                .await
                .map_err(|e| E::from(StoreError::Database(e)))?;
            let scoped = DbSession::scoped(tx);

            match f(scoped.clone()).await {
                Ok(value) => match scoped.take_tx().await {
                    Some(tx) => {
                        tx.commit()
                            .await
                            .map_err(|e| E::from(StoreError::Database(e)))?;
                        Ok(value)
                    }
                    None => Err(E::from(StoreError::TransactionClosed)),
                },
                Err(err) => {
                    if let Some(tx) = scoped.take_tx().await {
                        if let Err(rollback_err) = tx.rollback().await {
                            tracing::warn!(error = %rollback_err, "transaction rollback failed");
                        }
                    }
                    Err(err)
                }
            }
        })
    }
}

/// Transactor that runs the closure directly, with no database behind it.
/// Lets service tests exercise transactional flows against mocked
/// repositories.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct PassthroughTransactor;

#[cfg(test)]
impl Transactor for PassthroughTransactor {
    fn in_tx<'a, T, E, F, Fut>(
        &'a self,
        db: &'a DbSession,
        f: F,
    ) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>
    where
        T: Send + 'a,
        E: From<StoreError> + Send + 'a,
        F: FnOnce(DbSession) -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
    {
        Box::pin(f(db.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_exclusion_violation_to_time_conflict() {
        assert!(matches!(
            map_violation("23P01", Some("bookings_no_overlap")),
            Some(StoreError::BookingTimeConflict)
        ));
    }

    #[test]
    fn maps_email_unique_violation() {
        assert!(matches!(
            map_violation("23505", Some("users_email_key")),
            Some(StoreError::UserAlreadyExists)
        ));
    }

    #[test]
    fn maps_place_fk_violation() {
        assert!(matches!(
            map_violation("23503", Some("bookings_place_id_fkey")),
            Some(StoreError::PlaceNotFound)
        ));
    }

    #[test]
    fn maps_check_violations() {
        assert!(matches!(
            map_violation("23514", Some("chk_time_order")),
            Some(StoreError::InvalidBookingTime)
        ));
        assert!(matches!(
            map_violation("23514", Some("chk_duration_hours")),
            Some(StoreError::InvalidDuration)
        ));
    }

    #[test]
    fn unknown_violations_fall_through() {
        assert!(map_violation("23505", Some("some_other_key")).is_none());
        assert!(map_violation("42P01", None).is_none());
    }

    #[test]
    fn root_session_is_not_transactional() {
        assert!(!DbSession::root().in_transaction());
    }
}
