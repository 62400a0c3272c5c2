//! Transaction helper for multi-statement writes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diesel_async::scoped_futures::ScopedFutureExt;
//! use almanac_db::db::transaction::with_transaction;
//!
//! with_transaction(conn, |tx| async move {
//!     let mut store = PgStore::new(tx);
//!     let event = store.insert_event(new_event).await?;
//!     store.insert_occurrence(new_occurrence(event.id)).await?;
//!     Ok(event)
//! }.scope_boxed()).await?;
//! ```

use diesel_async::{AsyncConnection, AsyncPgConnection, scoped_futures::ScopedBoxFuture};

/// ## Summary
/// Runs `callback` inside a database transaction and returns its result.
///
/// The transaction commits when the callback returns `Ok` and rolls back otherwise.
///
/// ## Errors
/// Returns any error produced by the closure, or errors raised while starting
/// or committing the transaction.
pub async fn with_transaction<'conn, T, E, F>(
    conn: &'conn mut AsyncPgConnection,
    callback: F,
) -> Result<T, E>
where
    F: for<'r> FnOnce(&'r mut AsyncPgConnection) -> ScopedBoxFuture<'conn, 'r, Result<T, E>>
        + Send
        + 'conn,
    T: Send + 'conn,
    E: From<diesel::result::Error> + Send + 'conn,
{
    conn.transaction(callback).await
}
