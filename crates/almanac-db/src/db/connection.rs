//! Pooled connections to the calendar database.

use std::time::Duration;

use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::db::DbProvider;
use crate::error::DbResult;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection<'pool> = PooledConnection<'pool, AsyncPgConnection>;

/// How long a request waits for a free connection before failing.
const CHECKOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// ## Summary
/// Creates the connection pool for the calendar database.
///
/// One idle connection is kept open; checkouts give up after five seconds so a
/// stalled database surfaces as an unavailable service instead of hung requests.
///
/// ## Errors
/// Returns an error if the pool cannot be created with the provided database URL.
#[tracing::instrument(skip(database_url), fields(pool_size = size))]
pub async fn create_pool(database_url: &str, size: u32) -> anyhow::Result<DbPool> {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

    let pool = Pool::builder()
        .max_size(size)
        .min_idle(Some(1))
        .connection_timeout(CHECKOUT_TIMEOUT)
        .build(manager)
        .await?;

    let state = pool.state();
    tracing::debug!(
        connections = state.connections,
        idle = state.idle_connections,
        "Calendar database pool ready"
    );
    Ok(pool)
}

/// ## Summary
/// Runs a trivial statement to confirm the connection is usable.
///
/// ## Errors
/// Returns the database error if the statement fails.
pub async fn ping(conn: &mut AsyncPgConnection) -> DbResult<()> {
    diesel::sql_query("SELECT 1").execute(conn).await?;
    Ok(())
}

impl DbProvider for DbPool {
    fn get_connection<'a>(
        &'a self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = DbResult<DbConnection<'a>>> + Send + 'a>>
    {
        Box::pin(async move {
            self.get().await.map_err(|e| {
                let state = self.state();
                tracing::warn!(
                    error = %e,
                    connections = state.connections,
                    idle = state.idle_connections,
                    "No database connection available"
                );
                e.into()
            })
        })
    }
}
